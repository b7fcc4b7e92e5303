use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::ImageRef;

use super::{ImageUpload, MediaHost, MEDIA_FOLDER};

/// Cloudflare R2 bucket served through a public URL. The object key doubles
/// as the deletion handle.
pub struct R2Host {
    bucket: Box<Bucket>,
    bucket_name: String,
    public_url: String,
}

impl R2Host {
    pub fn new(
        bucket_name: String,
        account_id: String,
        access_key: String,
        secret_key: String,
        public_url: String,
    ) -> AppResult<Self> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: format!("https://{}.r2.cloudflarestorage.com", account_id),
        };

        let credentials = Credentials::new(
            Some(&access_key),
            Some(&secret_key),
            None, // security token
            None, // session token
            None, // profile
        )
        .map_err(|e| AppError::Storage(format!("R2 credentials error: {}", e)))?;

        let bucket = Bucket::new(&bucket_name, region, credentials)
            .map_err(|e| AppError::Storage(format!("R2 bucket error: {}", e)))?;

        Ok(Self {
            bucket,
            bucket_name,
            public_url,
        })
    }

    fn object_key(extension: &str) -> String {
        format!("{}/{}.{}", MEDIA_FOLDER, Uuid::new_v4(), extension)
    }

    fn public_url_for(base: &str, key: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), key)
    }
}

#[tonic::async_trait]
impl MediaHost for R2Host {
    async fn upload(&self, image: &ImageUpload) -> AppResult<ImageRef> {
        let key = Self::object_key(image.extension());

        let response = self
            .bucket
            .put_object_with_content_type(&key, image.data(), image.content_type())
            .await
            .map_err(|e| AppError::Storage(format!("R2 upload failed: {}", e)))?;

        if response.status_code() >= 300 {
            return Err(AppError::Storage(format!(
                "R2 upload rejected: key={}, status={}",
                key,
                response.status_code()
            )));
        }

        tracing::info!(
            "R2 upload: bucket={}, key={}, size={}",
            self.bucket_name,
            key,
            image.len()
        );
        Ok(ImageRef::new(Self::public_url_for(&self.public_url, &key), key))
    }

    async fn delete(&self, public_id: &str) -> AppResult<()> {
        self.bucket
            .delete_object(public_id)
            .await
            .map_err(|e| AppError::Storage(format!("R2 delete failed: {}", e)))?;

        tracing::info!("R2 delete: bucket={}, key={}", self.bucket_name, public_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "r2"
    }
}
