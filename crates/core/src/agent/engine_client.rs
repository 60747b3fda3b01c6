//! Agent Engine REST client
//!
//! Talks to a Vertex AI reasoning engine through its `:query` and
//! `:streamQuery` methods.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use super::credentials::TokenSource;
use super::event::AgentEvent;
use super::{AgentEngine, EventStream};
use crate::config::RelayConfig;
use crate::error::Error;
use crate::Result;

/// Events buffered between the HTTP reader and the consumer
const EVENT_BUFFER: usize = 64;

/// Where the Agent Engine lives
#[derive(Debug, Clone)]
pub struct AgentEngineConfig {
    location: String,
    resource_name: String,
    api_base: String,
}

impl AgentEngineConfig {
    /// Build from project, location and a resource name or bare engine id
    pub fn new(project_id: &str, location: &str, resource: &str) -> Self {
        let resource_name = if resource.starts_with("projects/") {
            resource.trim_end_matches('/').to_string()
        } else {
            format!(
                "projects/{}/locations/{}/reasoningEngines/{}",
                project_id, location, resource
            )
        };

        Self {
            location: location.to_string(),
            resource_name,
            api_base: format!("https://{}-aiplatform.googleapis.com", location),
        }
    }

    /// `None` unless project, location and resource name are all set
    pub fn from_relay(config: &RelayConfig) -> Option<Self> {
        let project = config.project_id.as_deref()?;
        let location = config.location.as_deref()?;
        let resource = config.agent_engine_resource_name.as_deref()?;
        Some(Self::new(project, location, resource))
    }

    /// Point the client at a different API host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/{}", self.api_base, self.resource_name)
    }
}

/// Agent Engine client over the Vertex AI REST API
pub struct AgentEngineClient {
    client: Client,
    config: AgentEngineConfig,
    tokens: Arc<dyn TokenSource>,
    display_name: String,
}

impl AgentEngineClient {
    /// Create a client without checking that the resource exists
    pub fn new(config: AgentEngineConfig, tokens: Arc<dyn TokenSource>) -> Self {
        let display_name = config.resource_name.clone();
        Self {
            client: Client::new(),
            config,
            tokens,
            display_name,
        }
    }

    /// Create a client and look the resource up
    pub async fn connect(config: AgentEngineConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let mut engine = Self::new(config, tokens);
        let token = engine.tokens.token().await?;

        let resp = engine
            .client
            .get(engine.config.endpoint())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("Failed to get Agent Engine: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "Failed to get Agent Engine: HTTP {} {}",
                status, text
            )));
        }

        let data: Value = resp.json().await?;
        if let Some(name) = data.get("displayName").and_then(Value::as_str) {
            engine.display_name = name.to_string();
        }

        Ok(engine)
    }

    async fn post(&self, method: &str, body: Value) -> Result<reqwest::Response> {
        let token = self.tokens.token().await?;
        let resp = self
            .client
            .post(format!("{}{}", self.config.endpoint(), method))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("Failed to call {}: {}", method, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "{} returned HTTP {}: {}",
                method, status, text
            )));
        }

        Ok(resp)
    }
}

#[async_trait]
impl AgentEngine for AgentEngineClient {
    fn name(&self) -> &str {
        &self.display_name
    }

    async fn create_session(&self, user_id: &str) -> Result<String> {
        let resp = self
            .post(
                ":query",
                json!({
                    "class_method": "create_session",
                    "input": {"user_id": user_id}
                }),
            )
            .await?;

        let data: Value = resp
            .json()
            .await
            .map_err(|e| Error::Agent(format!("Failed to parse session response: {}", e)))?;

        let output = data.get("output").unwrap_or(&data);
        output
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Agent("Session ID not found in response".into()))
    }

    async fn stream_query(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream> {
        let resp = self
            .post(
                ":streamQuery?alt=sse",
                json!({
                    "class_method": "stream_query",
                    "input": {
                        "user_id": user_id,
                        "session_id": session_id,
                        "message": message,
                    }
                }),
            )
            .await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            forward_events(resp.bytes_stream(), tx).await;
            debug!("Agent Engine stream reader finished for session {}", session_id);
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}

/// Split a streamed body into lines and forward each decoded event.
///
/// Stops early when the receiver is dropped. A transport error is
/// forwarded once and ends the stream.
async fn forward_events<S, E>(stream: S, tx: mpsc::Sender<Result<AgentEvent>>)
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
{
    tokio::pin!(stream);
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Agent Engine stream error: {}", e);
                let _ = tx
                    .send(Err(Error::Agent(format!("Stream error: {}", e))))
                    .await;
                return;
            }
        };
        buffer.extend_from_slice(&bytes);

        while let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = AgentEvent::from_line(&line) {
                if tx.send(Ok(event)).await.is_err() {
                    info!("Agent event receiver closed");
                    return;
                }
            }
        }
    }

    if !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer);
        if let Some(event) = AgentEvent::from_line(&line) {
            let _ = tx.send(Ok(event)).await;
        }
    }
}
