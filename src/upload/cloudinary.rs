use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::CloudinaryConfig;

use super::{MediaUploader, UploadError, UploadFile};

/// Unsigned uploads to a Cloudinary account via an upload preset
pub struct CloudinaryUploader {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryUploader {
    pub fn new(config: CloudinaryConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: CloudinaryConfig) -> Self {
        Self { client, config }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.config.api_base, self.config.cloud_name
        )
    }
}

/// Pull the hosted URL out of an upload response; anything else is a rejection
fn secure_url(body: &Value) -> Result<String, UploadError> {
    if let Some(url) = body["secure_url"].as_str().filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }
    let reason = body["error"]["message"]
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| format!("unexpected response {}", body));
    Err(UploadError::Rejected(reason))
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, file: UploadFile) -> Result<String, UploadError> {
        info!("Uploading {} to Cloudinary...", file.file_name);
        let size = file.bytes.len();

        let form = Form::new()
            .part("file", Part::bytes(file.bytes).file_name(file.file_name.clone()))
            .text("upload_preset", self.config.upload_preset.clone())
            .text("cloud_name", self.config.cloud_name.clone());

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("Cloudinary answered {} ({} bytes sent)", status, size);

        let body: Value = serde_json::from_str(&text)
            .map_err(|_| UploadError::Rejected(format!("{}: {}", status, text)))?;
        let url = secure_url(&body)?;

        info!("✅ Uploaded {} -> {}", file.file_name, url);
        Ok(url)
    }

    fn host_name(&self) -> &'static str {
        "Cloudinary"
    }
}
