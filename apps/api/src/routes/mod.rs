pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/cold-emails", post(handlers::handle_generate))
        .route("/api/v1/cold-emails/send", post(handlers::handle_send))
        .with_state(state)
}
