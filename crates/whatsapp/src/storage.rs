//! Object storage for media the agent should look at itself

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use relay_core::agent::TokenSource;

use crate::error::{ChannelError, Result};
use crate::media::DownloadedMedia;

/// Objects are uploaded under this prefix
pub const MEDIA_PREFIX: &str = "temp_media";

const GCS_BASE_URL: &str = "https://storage.googleapis.com";

/// Blob store the agent can read from
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a media file and return its `gs://` URI
    async fn upload(&self, media: &DownloadedMedia) -> Result<String>;
}

/// Google Cloud Storage through the JSON upload API
pub struct GcsObjectStore {
    client: Client,
    bucket: Option<String>,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
}

impl GcsObjectStore {
    pub fn new(bucket: Option<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client: Client::new(),
            bucket,
            tokens,
            base_url: GCS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn upload(&self, media: &DownloadedMedia) -> Result<String> {
        let bucket = self
            .bucket
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured("GCS bucket name".into()))?;
        let object_name = format!("{}/{}", MEDIA_PREFIX, media.file_name());

        let bytes = media.read_bytes().await?;
        let token = self.tokens.token().await?;

        let resp = self
            .client
            .post(format!(
                "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
                self.base_url,
                urlencoding::encode(bucket),
                urlencoding::encode(&object_name)
            ))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, media.mime_type())
            .body(bytes)
            .send()
            .await
            .map_err(|e| ChannelError::request("Failed to upload file to GCS", e))?;

        if !resp.status().is_success() {
            return Err(ChannelError::from_response("Failed to upload file to GCS", resp).await);
        }

        let uri = format!("gs://{}/{}", bucket, object_name);
        info!("File {} uploaded to {}", media.path().display(), uri);
        Ok(uri)
    }
}
