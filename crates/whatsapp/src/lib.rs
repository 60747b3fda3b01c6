//! WhatsApp channel for the agent relay
//!
//! This crate provides the pieces the webhook needs to turn a WhatsApp
//! notification into an agent prompt and to reply:
//! - Webhook payload model
//! - Graph API client (media download, outbound text)
//! - Object storage upload and speech-to-text for media

mod error;
mod graph;
mod media;
mod payload;
pub mod prompt;
mod speech;
mod storage;

pub use error::{ChannelError, Result};
pub use graph::{GraphClient, GraphConfig, MessagingApi};
pub use media::{sniff_mime, DownloadedMedia, FALLBACK_MIME};
pub use payload::{IncomingMessage, MediaRef, MessageContent, TextBody, WebhookPayload};
pub use speech::{AudioEncoding, SpeechConfig, SpeechToText, Transcriber};
pub use storage::{GcsObjectStore, ObjectStore, MEDIA_PREFIX};
