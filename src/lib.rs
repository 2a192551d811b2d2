//! Grocademy Library
//!
//! Course catalog, purchases and progress tracking. Re-exports modules
//! for the binary and the integration tests.

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod pagination;
pub mod projection;
pub mod storage;

use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use api::AppState;
pub use config::Config;
pub use domain::{Balance, Credit, DomainError, OperationContext, Price};
pub use error::{AppError, AppResult};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Layers run outermost first: logging -> auth -> handler
    let protected_routes = api::create_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::middleware::auth_middleware,
        ))
        .layer(middleware::from_fn(api::middleware::logging_middleware));

    Router::new()
        // Health check (no auth)
        .route("/health", axum::routing::get(health_check))
        .nest("/api", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
