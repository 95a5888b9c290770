//! Route modules for Depot Server

pub mod files;
pub mod health;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Assemble the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/v1/files", files::router())
        .with_state(state)
}
