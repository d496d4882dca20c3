//! Custom error types specific to authentication failures.
//!
//! Login and registration failures surface to the caller as the raw reason string
//! the identity service gave; no structured error codes are defined.

use adapters::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("No authentication token found")]
    NoToken,

    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// The identity service could not be reached.
    #[error("Backend server is not accessible. Please ensure the server is running. ({0})")]
    Unreachable(String),

    /// The identity service refused the request; carries its reason verbatim.
    #[error("{0}")]
    Rejected(String),

    /// The session changed (e.g. logout) while the request was in flight.
    #[error("session changed while the request was in flight")]
    Superseded,

    /// The identity service answered with something we could not use.
    #[error("unexpected identity service response: {0}")]
    Malformed(String),
}

impl AuthError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<AdapterError> for AuthError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Unreachable(reason) => Self::Unreachable(reason),
            AdapterError::Rejected { message, .. } => Self::Rejected(message),
            AdapterError::Decode(reason) | AdapterError::Setup(reason) => Self::Malformed(reason),
        }
    }
}
