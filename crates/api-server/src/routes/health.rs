//! Liveness and health endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    version: String,
    agent_engine: Option<String>,
    whatsapp: bool,
    transcription: bool,
    cached_sessions: usize,
}

async fn index() -> &'static str {
    "Backend is running."
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cached_sessions = state.sessions().len().await.unwrap_or_else(|err| {
        warn!("Could not count cached sessions: {}", err);
        0
    });
    let features = state.features();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        agent_engine: state.agent_engine().map(|engine| engine.name().to_string()),
        whatsapp: features.whatsapp,
        transcription: features.transcription && state.whatsapp().is_some_and(|w| w.transcriber.is_some()),
        cached_sessions,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::test_support::{state_with, FakeEngine};

    #[tokio::test]
    async fn index_reports_running() {
        let app = router().with_state(state_with(None));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Backend is running.");
    }

    #[tokio::test]
    async fn health_reports_engine_and_sessions() {
        let engine = FakeEngine::new();
        let state = state_with(Some(engine.clone()));
        state.sessions().insert("alice", "s-1").await.unwrap();

        let app = router().with_state(state);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["agentEngine"], "fake-engine");
        assert_eq!(payload["cachedSessions"], 1);
        assert_eq!(payload["whatsapp"], true);
    }

    #[tokio::test]
    async fn health_without_engine() {
        let app = router().with_state(state_with(None));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert!(payload["agentEngine"].is_null());
    }
}
