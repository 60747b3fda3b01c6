//! Streaming chat endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::{stream, StreamExt};
use serde::Deserialize;
use tracing::{error, info};

use relay_core::agent::EventStream;

use crate::error::{engine_unavailable, error_response, json_body, required, RouteError};
use crate::sse::relay_response;
use crate::state::AppState;

const FIELDS_REQUIRED: &str = "user_id, session_id, and message are required";

#[derive(Debug, Deserialize)]
struct AgentRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn chat(
    State(state): State<AppState>,
    body: Result<Json<AgentRequest>, JsonRejection>,
) -> Result<Response, RouteError> {
    let engine = state.agent_engine().ok_or_else(engine_unavailable)?;

    let req = json_body(body, FIELDS_REQUIRED)?;
    let (Some(user_id), Some(session_id), Some(message)) = (
        required(req.user_id),
        required(req.session_id),
        required(req.message),
    ) else {
        return Err(error_response(StatusCode::BAD_REQUEST, FIELDS_REQUIRED));
    };

    info!("Query for session {} from user {}", session_id, user_id);

    // A failed query still answers 200; the client sees a single error frame.
    let events: EventStream = match engine.stream_query(&user_id, &session_id, &message).await {
        Ok(events) => events,
        Err(err) => {
            error!("Could not start agent query for session {}: {}", session_id, err);
            stream::once(async move { Err(err) }).boxed()
        }
    };

    Ok(relay_response(events, session_id).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/agent", post(chat))
}
