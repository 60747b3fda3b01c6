use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::SessionStore;
use crate::Result;

/// Process-local session store.
///
/// Entries never expire and are lost when the process exits.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, sender_id: &str) -> Result<Option<String>> {
        Ok(self.sessions.read().await.get(sender_id).cloned())
    }

    async fn insert(&self, sender_id: &str, session_id: &str) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(sender_id.to_string(), session_id.to_string());
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.sessions.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_get() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get("34600000000").await.unwrap(), None);

        store.insert("34600000000", "sess-1").await.unwrap();
        assert_eq!(
            store.get("34600000000").await.unwrap().as_deref(),
            Some("sess-1")
        );
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn insert_replaces_previous_session() {
        let store = InMemorySessionStore::new();
        store.insert("a", "old").await.unwrap();
        store.insert("a", "new").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("new"));
        assert_eq!(store.len().await.unwrap(), 1);
    }
}
