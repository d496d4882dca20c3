//! Role-aware edge gateway for the edugate dashboard.
//!
//! The gateway sits in front of the dashboard pages. It gates page paths by role
//! using the shared policy table, brokers login/registration/profile/dashboard calls
//! to the remote identity service, and reports whether that service is reachable.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use adapters::IdentityAdapter;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;

use crate::services::status::StatusHandle;

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityAdapter>,
    pub status: StatusHandle,
}

impl AppState {
    pub fn new(identity: Arc<dyn IdentityAdapter>, status: StatusHandle) -> Self {
        Self { identity, status }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", auth::auth_router())
        .merge(api::user::routes::user_router())
        .merge(api::dashboard::routes::dashboard_router())
        .merge(api::status::status_router())
        .merge(api::pages::routes::pages_router())
        .layer(axum::middleware::from_fn(auth::route_gate))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(CatchPanicLayer::custom(middleware::panic_response))
        .with_state(state)
}
