//! Server-Sent Events framing for agent replies

use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::{stream, Stream, StreamExt};
use serde::Serialize;
use tracing::{error, info, warn};

use relay_core::agent::{AgentEvent, EventStream};

pub const AGENT_ERROR_MESSAGE: &str = "Error processing your request with the agent.";

/// One JSON frame of the chat stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    TextEvent { message: TextMessage },
    UnknownEvent { data_str: String },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMessage {
    pub content: TextContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPart {
    pub text: String,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextEvent {
            message: TextMessage {
                content: TextContent {
                    parts: vec![TextPart { text: text.into() }],
                },
            },
        }
    }

    pub fn agent_error() -> Self {
        Self::Error {
            message: AGENT_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<&AgentEvent> for StreamChunk {
    fn from(event: &AgentEvent) -> Self {
        match event {
            AgentEvent::Text { text, shape } => {
                info!("Processing {:?} event with text: {}", shape, text);
                StreamChunk::text(text.clone())
            }
            AgentEvent::Unknown { .. } => {
                let data_str = event.raw_string();
                warn!("Unknown event structure: {}", data_str);
                StreamChunk::UnknownEvent { data_str }
            }
        }
    }
}

/// Map agent events to frames.
///
/// The first error becomes a terminal error frame; nothing after it is
/// forwarded.
pub fn chunk_stream(events: EventStream, session_id: String) -> impl Stream<Item = StreamChunk> {
    stream::unfold(Some(events), move |state| {
        let session_id = session_id.clone();
        async move {
            let mut events = state?;
            match events.next().await {
                Some(Ok(event)) => Some((StreamChunk::from(&event), Some(events))),
                Some(Err(err)) => {
                    error!("Error during agent stream for session {}: {}", session_id, err);
                    Some((StreamChunk::agent_error(), None))
                }
                None => {
                    info!("Stream ended for session {}", session_id);
                    None
                }
            }
        }
    })
}

/// `text/event-stream` response carrying the chat frames
pub fn relay_response(events: EventStream, session_id: String) -> Response {
    let frames = chunk_stream(events, session_id).map(|chunk| Event::default().json_data(chunk));
    Sse::new(frames).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::Error;
    use serde_json::json;

    #[test]
    fn frames_serialize_to_wire_shape() {
        assert_eq!(
            serde_json::to_value(StreamChunk::text("hola")).unwrap(),
            json!({"type": "text_event", "message": {"content": {"parts": [{"text": "hola"}]}}})
        );
        assert_eq!(
            serde_json::to_value(StreamChunk::UnknownEvent {
                data_str: "{}".into()
            })
            .unwrap(),
            json!({"type": "unknown_event", "data_str": "{}"})
        );
        assert_eq!(
            serde_json::to_value(StreamChunk::agent_error()).unwrap(),
            json!({"type": "error", "message": AGENT_ERROR_MESSAGE})
        );
    }

    #[tokio::test]
    async fn error_ends_the_stream() {
        let events: EventStream = stream::iter(vec![
            Ok(AgentEvent::from_value(json!({"text": "first"}))),
            Err(Error::Agent("lost connection".into())),
            Ok(AgentEvent::from_value(json!({"text": "never sent"}))),
        ])
        .boxed();

        let chunks: Vec<StreamChunk> = chunk_stream(events, "s-1".into()).collect().await;
        assert_eq!(chunks, vec![StreamChunk::text("first"), StreamChunk::agent_error()]);
    }

    #[tokio::test]
    async fn unknown_events_carry_raw_json() {
        let events: EventStream =
            stream::iter(vec![Ok(AgentEvent::from_value(json!({"id": 1})))]).boxed();

        let chunks: Vec<StreamChunk> = chunk_stream(events, "s-1".into()).collect().await;
        assert_eq!(
            chunks,
            vec![StreamChunk::UnknownEvent {
                data_str: r#"{"id":1}"#.into()
            }]
        );
    }
}
