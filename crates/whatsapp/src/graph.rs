//! WhatsApp Cloud API (Meta Graph) client

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use relay_core::config::WhatsAppSettings;

use crate::error::{ChannelError, Result};
use crate::media::DownloadedMedia;

/// Graph API connection settings
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub base_url: String,
    pub api_version: String,
    pub access_token: Option<String>,
}

impl From<&WhatsAppSettings> for GraphConfig {
    fn from(settings: &WhatsAppSettings) -> Self {
        Self {
            base_url: settings.graph_url.trim_end_matches('/').to_string(),
            api_version: settings.api_version.clone(),
            access_token: settings.access_token.clone(),
        }
    }
}

/// Operations the webhook needs from the messaging provider
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Fetch a media object into a temporary file
    async fn download_media(&self, media_id: &str) -> Result<DownloadedMedia>;

    /// Send a plain text message
    async fn send_text(&self, to: &str, body: &str, phone_number_id: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct MediaInfo {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Serialize)]
struct OutboundText<'a> {
    messaging_product: &'static str,
    to: &'a str,
    text: OutboundTextBody<'a>,
}

#[derive(Serialize)]
struct OutboundTextBody<'a> {
    body: &'a str,
}

pub struct GraphClient {
    client: Client,
    config: GraphConfig,
}

impl GraphClient {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn access_token(&self) -> Result<&str> {
        self.config
            .access_token
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured("WhatsApp access token".into()))
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url, self.config.api_version, path
        )
    }
}

#[async_trait]
impl MessagingApi for GraphClient {
    async fn download_media(&self, media_id: &str) -> Result<DownloadedMedia> {
        let token = self.access_token()?;

        // 1. Resolve the short-lived download URL
        let resp = self
            .client
            .get(self.url(&format!("{}/", media_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ChannelError::request("Failed to get media URL", e))?;
        if !resp.status().is_success() {
            return Err(ChannelError::from_response("Failed to get media URL", resp).await);
        }
        let info: MediaInfo = resp
            .json()
            .await
            .map_err(|e| ChannelError::request("Invalid media metadata", e))?;
        let media_url = info
            .url
            .ok_or_else(|| ChannelError::Media(format!("No URL returned for media {}", media_id)))?;

        // 2. Stream the bytes into a temporary file
        let resp = self
            .client
            .get(&media_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ChannelError::request("Failed to download media", e))?;
        if !resp.status().is_success() {
            return Err(ChannelError::from_response("Failed to download media", resp).await);
        }

        let chunks = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChannelError::request("Media download interrupted", e)));
        let media = DownloadedMedia::from_stream(chunks).await?;
        debug!(
            "Downloaded media {} to {} ({})",
            media_id,
            media.path().display(),
            media.mime_type()
        );
        Ok(media)
    }

    async fn send_text(&self, to: &str, body: &str, phone_number_id: &str) -> Result<()> {
        let token = self.access_token()?;
        if phone_number_id.is_empty() {
            return Err(ChannelError::NotConfigured("WhatsApp phone number ID".into()));
        }

        let resp = self
            .client
            .post(self.url(&format!("{}/messages", phone_number_id)))
            .bearer_auth(token)
            .json(&OutboundText {
                messaging_product: "whatsapp",
                to,
                text: OutboundTextBody { body },
            })
            .send()
            .await
            .map_err(|e| ChannelError::request(format!("Failed to send message to {}", to), e))?;

        if !resp.status().is_success() {
            return Err(
                ChannelError::from_response(format!("Failed to send message to {}", to), resp)
                    .await,
            );
        }

        info!("Message sent to {}", to);
        Ok(())
    }
}
