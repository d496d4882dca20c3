//! Handler functions for authentication-related API endpoints.
//!
//! These functions process incoming HTTP requests for login, registration, logout
//! and session inspection. Each request gets its own [`AuthSession`] seeded from the
//! request's credentials; the auth cookie is the only state carried between requests.

use adapters::RegisterRequest;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use super::errors::AuthError;
use super::models::{AuthSuccess, LoginBody, RedirectQuery, RegisterBody, SessionReport, User};
use super::policy::{nav_for_role, permissions_for};
use super::service::AuthSession;
use super::store::{auth_cookie, cookie_value, expired_auth_cookie, CredentialStore, MemoryStore, AUTH_COOKIE};
use crate::errors::AppError;
use crate::AppState;

/// Token presented by the caller: a bearer header wins over the auth cookie.
pub fn request_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|raw| cookie_value(raw, AUTH_COOKIE))
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Token presented by the caller, or [`AuthError::NoToken`].
pub fn require_token(headers: &HeaderMap) -> Result<String, AuthError> {
    request_token(headers).ok_or(AuthError::NoToken)
}

fn request_session(state: &AppState, headers: &HeaderMap) -> AuthSession {
    let cookies = match request_token(headers) {
        Some(token) => MemoryStore::with_entry(AUTH_COOKIE, token),
        None => MemoryStore::new(),
    };
    let store = CredentialStore::new(Arc::new(cookies), Arc::new(MemoryStore::new()));
    AuthSession::new(state.identity.clone(), store)
}

/// Accepts only same-site absolute paths as post-login destinations.
fn safe_redirect(target: Option<String>) -> Option<String> {
    target.filter(|t| t.starts_with('/') && !t.starts_with("//") && !t.contains('\\'))
}

fn established(
    session: &AuthSession,
    user: User,
    redirect: Option<String>,
) -> Result<Response, AppError> {
    let token = session.store().token().ok_or(AuthError::NoToken)?;
    let redirect = safe_redirect(redirect).unwrap_or_else(|| user.role.dashboard_url().to_string());

    Ok((
        [(header::SET_COOKIE, auth_cookie(&token))],
        Json(AuthSuccess {
            success: true,
            user,
            redirect,
        }),
    )
        .into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<RedirectQuery>,
    Json(body): Json<LoginBody>,
) -> Result<Response, AppError> {
    let session = AuthSession::new(state.identity.clone(), CredentialStore::in_memory());
    let user = session.login(body.email.trim(), &body.password).await?;
    established(&session, user, query.redirect)
}

pub async fn register(
    State(state): State<AppState>,
    Query(query): Query<RedirectQuery>,
    Json(body): Json<RegisterBody>,
) -> Result<Response, AppError> {
    let session = AuthSession::new(state.identity.clone(), CredentialStore::in_memory());
    let request = RegisterRequest {
        name: body.name,
        email: body.email.trim().to_string(),
        password: body.password,
        role: body.role.map(|r| r.as_str().to_string()),
    };
    let user = session.register(&request).await?;
    established(&session, user, query.redirect)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = request_session(&state, &headers);
    session.logout().await;
    (
        [(header::SET_COOKIE, expired_auth_cookie())],
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    )
        .into_response()
}

/// Resolves the caller's session the same way a client does at startup.
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = request_session(&state, &headers);
    let had_token = session.store().token().is_some();
    let user = session.resolve().await.user().cloned();

    let report = SessionReport {
        authenticated: user.is_some(),
        permissions: user
            .as_ref()
            .map(|u| permissions_for(u.role).to_vec())
            .unwrap_or_default(),
        nav: user.as_ref().map(|u| nav_for_role(u.role)).unwrap_or_default(),
        user,
    };

    let mut response = Json(report).into_response();
    if had_token && session.store().token().is_none() {
        if let Ok(value) = HeaderValue::from_str(&expired_auth_cookie()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}
