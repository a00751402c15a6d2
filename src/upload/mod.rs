pub mod cloudinary;
pub mod traits;

pub use cloudinary::CloudinaryUploader;
pub use traits::MediaUploader;

use std::path::Path;

use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image host rejected the file: {0}")]
    Rejected(String),
}

/// One local image waiting to be uploaded
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

/// Result of uploading one file from a batch
#[derive(Debug)]
pub struct UploadOutcome {
    pub file_name: String,
    pub result: Result<String, UploadError>,
}

/// Upload files one after another. A failed file doesn't stop the rest.
pub async fn upload_batch<U>(uploader: &U, files: Vec<UploadFile>) -> Vec<UploadOutcome>
where
    U: MediaUploader + ?Sized,
{
    let mut outcomes = Vec::with_capacity(files.len());
    for file in files {
        let file_name = file.file_name.clone();
        let result = uploader.upload(file).await;
        if let Err(e) = &result {
            warn!("❌ Upload of {} failed: {}", file_name, e);
        }
        outcomes.push(UploadOutcome { file_name, result });
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Rejects any file whose name starts with "bad"
    struct PickyUploader {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MediaUploader for PickyUploader {
        async fn upload(&self, file: UploadFile) -> Result<String, UploadError> {
            self.seen.lock().unwrap().push(file.file_name.clone());
            if file.file_name.starts_with("bad") {
                Err(UploadError::Rejected("unsupported format".into()))
            } else {
                Ok(format!("https://img.example/{}", file.file_name))
            }
        }

        fn host_name(&self) -> &'static str {
            "picky"
        }
    }

    #[tokio::test]
    async fn test_batch_continues_after_rejection() {
        let uploader = PickyUploader {
            seen: Mutex::new(Vec::new()),
        };
        let files = vec![
            UploadFile::new("a.jpg", vec![1]),
            UploadFile::new("bad.tiff", vec![2]),
            UploadFile::new("c.jpg", vec![3]),
        ];

        let outcomes = upload_batch(&uploader, files).await;
        assert_eq!(*uploader.seen.lock().unwrap(), vec!["a.jpg", "bad.tiff", "c.jpg"]);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[1].result.is_err());
        assert_eq!(
            outcomes[2].result.as_ref().unwrap(),
            "https://img.example/c.jpg"
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_a_read_error() {
        let err = UploadFile::from_path("/definitely/not/here.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
    }
}
