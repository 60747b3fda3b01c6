//! WhatsApp Cloud API webhook

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::state::AppState;
use crate::whatsapp::handle_notification;

#[derive(Debug, Deserialize)]
struct VerifyQuery {
    #[serde(rename = "hub.mode", default)]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token", default)]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge", default)]
    challenge: Option<String>,
}

async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> impl IntoResponse {
    let expected = state.whatsapp().and_then(|w| w.verify_token.as_deref());

    match (expected, query.verify_token.as_deref()) {
        (Some(expected), Some(given)) if expected == given => {
            info!("Webhook verified (mode {:?})", query.mode);
            (StatusCode::OK, query.challenge.unwrap_or_default())
        }
        _ => {
            warn!("Webhook verification failed");
            (
                StatusCode::FORBIDDEN,
                "Invalid verification token".to_string(),
            )
        }
    }
}

/// Always acknowledged; failures are logged so the platform does not retry.
async fn receive_notification(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    handle_notification(&state, &body).await;
    (StatusCode::OK, "OK")
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/whatsapp/webhook",
        get(verify_webhook).post(receive_notification),
    )
}
