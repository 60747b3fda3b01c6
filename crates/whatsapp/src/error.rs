//! Error types for the WhatsApp channel

use thiserror::Error;

/// Result type alias for channel operations
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors raised while talking to WhatsApp or handling its media
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Required setting is missing
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Webhook body did not match the expected shape
    #[error("Invalid webhook payload: {0}")]
    Payload(String),

    /// Request could not be sent
    #[error("{context}: {source}")]
    Request {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// Remote API answered with an error status
    #[error("{context}: HTTP {status}: {body}")]
    Api {
        context: String,
        status: u16,
        body: String,
    },

    /// Media could not be fetched or inspected
    #[error("Media error: {0}")]
    Media(String),

    /// Speech-to-text failed
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Google credentials could not be obtained
    #[error(transparent)]
    Credentials(#[from] relay_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChannelError {
    /// Create a Request error
    pub fn request(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Request {
            context: context.into(),
            source,
        }
    }

    /// Build an Api error from a failed response
    pub async fn from_response(context: impl Into<String>, resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Self::Api {
            context: context.into(),
            status,
            body,
        }
    }
}
