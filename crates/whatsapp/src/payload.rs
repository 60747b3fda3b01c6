//! WhatsApp Cloud API webhook payload
//!
//! Only the fields the relay reads are modelled; everything else in the
//! notification is ignored.

use serde::Deserialize;

use crate::error::{ChannelError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Absent for status updates (sent, delivered, read)
    #[serde(default)]
    pub messages: Option<Vec<RawMessage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub from: String,
    #[serde(flatten)]
    pub content: MessageContent,
}

/// Type-specific part of an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: TextBody },
    Image { image: MediaRef },
    Audio { audio: MediaRef },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaRef {
    pub id: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// The one message the relay acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub sender_id: String,
    pub phone_number_id: String,
    pub content: MessageContent,
}

impl WebhookPayload {
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| ChannelError::Payload(e.to_string()))
    }

    /// First message of the first change.
    ///
    /// Returns `Ok(None)` for notifications without messages.
    pub fn first_message(&self) -> Result<Option<IncomingMessage>> {
        let value = &self
            .entry
            .first()
            .ok_or_else(|| ChannelError::Payload("missing entry".into()))?
            .changes
            .first()
            .ok_or_else(|| ChannelError::Payload("missing changes".into()))?
            .value;

        let Some(message) = value.messages.as_ref().and_then(|messages| messages.first()) else {
            return Ok(None);
        };

        let phone_number_id = value
            .metadata
            .as_ref()
            .map(|metadata| metadata.phone_number_id.clone())
            .ok_or_else(|| ChannelError::Payload("missing metadata.phone_number_id".into()))?;

        Ok(Some(IncomingMessage {
            sender_id: message.from.clone(),
            phone_number_id,
            content: message.content.clone(),
        }))
    }
}
