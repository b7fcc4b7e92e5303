// Media host abstraction for product photos (Cloudinary / R2)

pub mod cloudinary;
pub mod r2;

pub use cloudinary::CloudinaryHost;
pub use r2::R2Host;

use crate::error::{AppError, AppResult};
use crate::models::ImageRef;

/// Accepted photo formats, matched against the file extension
pub const ALLOWED_IMAGE_FORMATS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Largest accepted photo, in bytes
pub const MAX_IMAGE_BYTES: usize = 5_000_000;

/// Folder / key prefix for uploaded photos
pub const MEDIA_FOLDER: &str = "inventory";

/// A validated photo ready to be sent to a media host.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    file_name: String,
    extension: &'static str,
    content_type: String,
    data: Vec<u8>,
}

impl ImageUpload {
    /// Checks format and size. The content type is inferred from the
    /// extension when `content_type` is empty.
    pub fn new(file_name: &str, content_type: &str, data: Vec<u8>) -> AppResult<Self> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .and_then(|ext| ALLOWED_IMAGE_FORMATS.iter().copied().find(|allowed| *allowed == ext))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "image must be one of {}, got '{}'",
                    ALLOWED_IMAGE_FORMATS.join(", "),
                    file_name
                ))
            })?;

        if data.is_empty() {
            return Err(AppError::Validation("image file is empty".to_string()));
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation(format!(
                "image is {} bytes, the limit is {} bytes",
                data.len(),
                MAX_IMAGE_BYTES
            )));
        }

        let content_type = if content_type.is_empty() {
            Self::content_type_for(extension).to_string()
        } else {
            content_type.to_string()
        };

        Ok(Self {
            file_name: file_name.to_string(),
            extension,
            content_type,
            data,
        })
    }

    fn content_type_for(extension: &str) -> &'static str {
        match extension {
            "png" => "image/png",
            "webp" => "image/webp",
            _ => "image/jpeg",
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn extension(&self) -> &str {
        self.extension
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Media host abstraction shared by the Cloudinary and R2 backends
#[tonic::async_trait]
pub trait MediaHost: Send + Sync {
    /// Stores a photo and returns its public URL together with the deletion handle
    async fn upload(&self, image: &ImageUpload) -> AppResult<ImageRef>;

    /// Deletes a photo by the handle returned from `upload`
    async fn delete(&self, public_id: &str) -> AppResult<()>;

    fn name(&self) -> &str;
}
