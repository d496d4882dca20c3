//! Handler functions for user profile API endpoints.
//!
//! These functions forward the caller's token to the identity service and relay
//! its answer. Failures keep the service's status code and reason.

use adapters::{PasswordChange, ProfileFields, ProfileResponse};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::handlers::require_token;
use crate::errors::AppError;
use crate::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, AppError> {
    let token = require_token(&headers)?;
    Ok(Json(state.identity.profile(&token).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(fields): Json<ProfileFields>,
) -> Result<Json<ProfileResponse>, AppError> {
    let token = require_token(&headers)?;
    Ok(Json(state.identity.update_profile(&token, &fields).await?))
}

pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PasswordChange>,
) -> Result<Json<Value>, AppError> {
    let token = require_token(&headers)?;
    let result = state.identity.change_password(&token, &body).await?;
    Ok(Json(json!({ "success": result.success, "message": result.message })))
}
