//! Route handlers

pub mod agent;
pub mod health;
pub mod session;
pub mod whatsapp;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(health::router())
        .merge(session::router())
        .merge(agent::router());

    if state.features().whatsapp {
        router = router.merge(whatsapp::router());
    }

    router
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
