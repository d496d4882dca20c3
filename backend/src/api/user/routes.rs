//! Defines the HTTP routes for the profile API.

use axum::routing::{get, put};
use axum::Router;

use super::handlers::{change_password, get_profile, update_profile};
use crate::AppState;

pub fn user_router() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/profile/password", put(change_password))
}
