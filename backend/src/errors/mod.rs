//! Global application error types and handlers.
//!
//! This module defines the error type returned by every handler and converts it
//! into the `{ "success": false, "message": ... }` body the front end expects.

use std::net::SocketAddr;

use adapters::AdapterError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Identity(#[from] AdapterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
                AuthError::NoToken | AuthError::Rejected(_) => StatusCode::UNAUTHORIZED,
                AuthError::Superseded => StatusCode::CONFLICT,
                AuthError::Unreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
                AuthError::UnknownRole(_) | AuthError::Malformed(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Identity(err) => match err {
                AdapterError::Rejected { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                AdapterError::Unreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
                AdapterError::Decode(_) | AdapterError::Setup(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Config(_) | Self::Bind { .. } | Self::Serve(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "request failed");
        }
        (
            status,
            Json(json!({ "success": false, "message": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::from(AuthError::NoToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::MissingCredentials).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AdapterError::Rejected {
                status: 404,
                message: "User not found".into()
            })
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(AdapterError::Unreachable("down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn rejected_reason_is_surfaced_verbatim() {
        let err = AppError::from(AuthError::Rejected("Invalid email or password".into()));
        assert_eq!(err.to_string(), "Invalid email or password");
    }
}
