//! Session module
//!
//! Sender to session bookkeeping for channels that do not carry a session
//! id of their own.

mod memory_store;
mod store;

pub use memory_store::InMemorySessionStore;
pub use store::SessionStore;

use tracing::info;

use crate::agent::AgentEngine;
use crate::Result;

/// Return the sender's session, creating one on first contact.
///
/// A stored session is reused for as long as the store keeps it.
pub async fn resolve_session(
    store: &dyn SessionStore,
    engine: &dyn AgentEngine,
    sender_id: &str,
) -> Result<String> {
    if let Some(session_id) = store.get(sender_id).await? {
        info!("Using existing session {} for {}", session_id, sender_id);
        return Ok(session_id);
    }

    info!("No active session for {}, creating a new one", sender_id);
    let session_id = engine.create_session(sender_id).await?;
    store.insert(sender_id, &session_id).await?;
    info!("New session {} created for {}", session_id, sender_id);

    Ok(session_id)
}
