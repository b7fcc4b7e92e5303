use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::ImageRef;

use super::{ImageUpload, MediaHost, MEDIA_FOLDER};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary image host. Uploads go through an unsigned upload preset;
/// deletion needs the API key and secret to sign the request.
pub struct CloudinaryHost {
    http_client: reqwest::Client,
    api_base: String,
    cloud_name: String,
    upload_preset: String,
    api_key: Option<String>,
    api_secret: Option<String>,
}

impl CloudinaryHost {
    pub fn new(
        cloud_name: String,
        upload_preset: String,
        api_key: Option<String>,
        api_secret: Option<String>,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
            cloud_name,
            upload_preset,
            api_key,
            api_secret,
        }
    }

    /// Points the client at another API root (e.g. a local mock).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.api_base, self.cloud_name, action)
    }

    /// Cloudinary signature: SHA-1 over the sorted parameters followed by the secret, hex encoded
    fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
        let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let digest = ring::digest::digest(
            &ring::digest::SHA1_FOR_LEGACY_USE_ONLY,
            format!("{}{}", to_sign, api_secret).as_bytes(),
        );
        digest.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn unix_timestamp() -> AppResult<String> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().to_string())
            .map_err(|e| AppError::Internal(format!("System clock before epoch: {}", e)))
    }
}

#[tonic::async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, image: &ImageUpload) -> AppResult<ImageRef> {
        let part = Part::bytes(image.data().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.content_type())
            .map_err(|e| AppError::Storage(format!("Invalid content type: {}", e)))?;

        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", MEDIA_FOLDER);

        let response = self
            .http_client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Cloudinary upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "Cloudinary upload rejected: status={}, body={}",
                status, body
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Cloudinary upload response: {}", e)))?;

        tracing::info!(
            "Cloudinary upload: cloud={}, public_id={}, size={}",
            self.cloud_name,
            uploaded.public_id,
            image.len()
        );
        Ok(ImageRef::new(uploaded.secure_url, uploaded.public_id))
    }

    async fn delete(&self, public_id: &str) -> AppResult<()> {
        let (Some(api_key), Some(api_secret)) = (&self.api_key, &self.api_secret) else {
            return Err(AppError::Storage(
                "Cloudinary API credentials are not configured".to_string(),
            ));
        };

        let timestamp = Self::unix_timestamp()?;
        let signature = Self::sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            api_secret,
        );

        let response = self
            .http_client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Cloudinary destroy failed: {}", e)))?;

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Cloudinary destroy response: {}", e)))?;

        if destroyed.result != "ok" {
            return Err(AppError::Storage(format!(
                "Cloudinary destroy for {} returned '{}'",
                public_id, destroyed.result
            )));
        }

        tracing::info!("Cloudinary delete: cloud={}, public_id={}", self.cloud_name, public_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "cloudinary"
    }
}
