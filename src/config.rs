use std::env;

use chrono::FixedOffset;

use crate::export::{is_valid_date_format, ReportLocale, DEFAULT_BASE_NAME};

/// Which media host receives product photos.
#[derive(Clone, Debug, PartialEq)]
pub enum MediaConfig {
    Cloudinary {
        cloud_name: String,
        upload_preset: String,
        api_key: Option<String>,
        api_secret: Option<String>,
    },
    R2 {
        bucket: String,
        account_id: String,
        access_key: String,
        secret_key: String,
        public_url: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub media: Option<MediaConfig>,
    pub export_base_name: String,
    pub report_locale: ReportLocale,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenvy::dotenv().ok();

        let media = match env::var("MEDIA_BACKEND").ok().as_deref() {
            Some("cloudinary") => Some(MediaConfig::Cloudinary {
                cloud_name: env::var("CLOUDINARY_CLOUD_NAME")?,
                upload_preset: env::var("CLOUDINARY_UPLOAD_PRESET")
                    .unwrap_or_else(|_| "ml_default".to_string()),
                api_key: env::var("CLOUDINARY_API_KEY").ok(),
                api_secret: env::var("CLOUDINARY_API_SECRET").ok(),
            }),
            Some("r2") => Some(MediaConfig::R2 {
                bucket: env::var("R2_BUCKET")?,
                account_id: env::var("R2_ACCOUNT_ID")?,
                access_key: env::var("R2_ACCESS_KEY")?,
                secret_key: env::var("R2_SECRET_KEY")?,
                public_url: env::var("R2_PUBLIC_URL")?,
            }),
            Some(other) => {
                tracing::warn!("Unknown MEDIA_BACKEND '{}', image uploads disabled", other);
                None
            }
            None => None,
        };

        let defaults = ReportLocale::default();
        let offset = env::var("EXPORT_UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
            .unwrap_or(defaults.offset);

        Ok(Config {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "50051".to_string())
                .parse()
                .unwrap_or(50051),
            media,
            export_base_name: env::var("EXPORT_BASE_NAME")
                .unwrap_or_else(|_| DEFAULT_BASE_NAME.to_string()),
            report_locale: ReportLocale {
                offset,
                date_format: date_format_or(env::var("EXPORT_DATE_FORMAT").ok(), defaults.date_format),
                datetime_format: defaults.datetime_format,
            },
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Keeps `value` only when chrono can render it.
fn date_format_or(value: Option<String>, default: String) -> String {
    match value {
        Some(format) if is_valid_date_format(&format) => format,
        Some(format) => {
            tracing::warn!(
                "Invalid EXPORT_DATE_FORMAT '{}', using '{}'",
                format,
                default
            );
            default
        }
        None => default,
    }
}
