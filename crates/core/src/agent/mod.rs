//! Agent module
//!
//! Integration with the remotely hosted Agent Engine: the [`AgentEngine`]
//! seam, its REST client, credentials, and event decoding.

mod credentials;
mod engine_client;
mod event;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::{error, info};

use crate::config::RelayConfig;
use crate::Result;

pub use credentials::{
    token_source, MetadataServerToken, StaticToken, TokenSource, METADATA_TOKEN_URL,
};
pub use engine_client::{AgentEngineClient, AgentEngineConfig};
pub use event::{AgentEvent, TextShape};

/// Live sequence of decoded events for one query
pub type EventStream = BoxStream<'static, Result<AgentEvent>>;

/// A conversational agent reachable over the network
#[async_trait]
pub trait AgentEngine: Send + Sync {
    /// Display name of the remote resource
    fn name(&self) -> &str;

    /// Open a new conversation session for a user
    async fn create_session(&self, user_id: &str) -> Result<String>;

    /// Send a message within a session and stream the agent's events back
    async fn stream_query(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream>;
}

/// Connect to the configured Agent Engine.
///
/// Returns `None` when the project, location or resource name is missing,
/// or when the resource cannot be looked up. Callers treat `None` as
/// "service unavailable".
pub async fn connect_engine(
    config: &RelayConfig,
    tokens: Arc<dyn TokenSource>,
) -> Option<Arc<dyn AgentEngine>> {
    let Some(engine_config) = AgentEngineConfig::from_relay(config) else {
        error!(
            "PROJECT_ID, LOCATION, and AGENT_ENGINE_RESOURCE_NAME environment variables are required for Agent Engine setup."
        );
        return None;
    };

    info!(
        "Connecting to Agent Engine {} in {}",
        engine_config.resource_name(),
        engine_config.location()
    );

    match AgentEngineClient::connect(engine_config, tokens).await {
        Ok(client) => {
            info!("Agent Engine obtained: {}", client.name());
            Some(Arc::new(client))
        }
        Err(err) => {
            error!("Error getting Agent Engine: {}", err);
            None
        }
    }
}
