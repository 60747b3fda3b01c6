//! Session store trait
//!
//! Maps a messaging sender to the Agent Engine session that carries their
//! conversation.

use async_trait::async_trait;

use crate::Result;

/// Storage interface for sender to session mappings
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get the session for a sender
    async fn get(&self, sender_id: &str) -> Result<Option<String>>;

    /// Remember the session for a sender, replacing any previous one
    async fn insert(&self, sender_id: &str, session_id: &str) -> Result<()>;

    /// Number of senders with a session
    async fn len(&self) -> Result<usize>;
}
