use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Image cleanup failed: {0}")]
    MediaCleanup(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Persistence(format!("Database error: {}", err))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Persistence(format!("Migration failed: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Persistence(format!("Malformed document: {}", err))
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Export(format!("Spreadsheet error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Export(format!("I/O error: {}", err))
    }
}

/// Client-facing statuses never carry store or storage details; callers log
/// the full error before converting.
impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => Status::invalid_argument(msg),
            AppError::NotFound(_) => Status::not_found("Item not found"),
            AppError::Persistence(_) => Status::unavailable("Inventory store is unavailable"),
            AppError::MediaCleanup(_) | AppError::Storage(_) => {
                Status::internal("Image storage error")
            }
            AppError::Export(_) => Status::internal("Report generation failed"),
            AppError::Internal(_) => Status::internal("Internal error"),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
