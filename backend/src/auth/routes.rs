//! Defines the HTTP routes specifically for authentication.
//!
//! These routes are nested under `/api/auth`, which the edge gate treats as public.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{login, logout, register, session};
use crate::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/session", get(session))
}
