use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{engine_unavailable, error_response, json_body, required, RouteError};
use crate::state::AppState;

const USER_ID_REQUIRED: &str = "user_id is required";

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
    session_id: String,
}

async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<CreateSessionResponse>, RouteError> {
    let engine = state.agent_engine().ok_or_else(engine_unavailable)?;

    let req = json_body(body, USER_ID_REQUIRED)?;
    let user_id = required(req.user_id)
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, USER_ID_REQUIRED))?;

    match engine.create_session(&user_id).await {
        Ok(session_id) => {
            info!("Session {} created for user {}", session_id, user_id);
            Ok(Json(CreateSessionResponse { session_id }))
        }
        Err(err) => {
            error!("Error creating session for user {}: {}", user_id, err);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
            ))
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/create-session", post(create_session))
}
