//! Defines the page routes. Every path not claimed by the API falls through here.

use axum::routing::get;
use axum::Router;

use super::handlers::{page, unauthorized};
use crate::AppState;

pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/unauthorized", get(unauthorized))
        .fallback(page)
}
