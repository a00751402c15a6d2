use async_trait::async_trait;

use super::{UploadError, UploadFile};

/// Image host that turns an uploaded file into a permanent URL
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload one file and return its public HTTPS URL
    async fn upload(&self, file: UploadFile) -> Result<String, UploadError>;

    /// Get the name of the image host
    fn host_name(&self) -> &'static str;
}
