//! Custom error types specific to the `adapters` crate.
//!
//! The identity service can fail in two ways that callers must tell apart: it can
//! be unreachable (connection refused, DNS failure, timeout), or it can answer and
//! refuse the request. The auth resolver degrades to local data only in the first case.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The service could not be reached at all.
    #[error("identity service unreachable: {0}")]
    Unreachable(String),

    /// The service answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The service answered 2xx but the body did not match the expected shape.
    #[error("malformed response from identity service: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build identity client: {0}")]
    Setup(String),
}

impl AdapterError {
    /// Returns `true` when the failure means "service down" rather than "service said no".
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        if err.is_builder() {
            return Self::Setup(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::Rejected {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        // connect, timeout, request and body errors all mean we never got an answer
        Self::Unreachable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_is_classified() {
        let err = AdapterError::Unreachable("connection refused".into());
        assert!(err.is_unreachable());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn rejected_displays_raw_reason() {
        let err = AdapterError::Rejected {
            status: 401,
            message: "Invalid email or password".into(),
        };
        assert!(!err.is_unreachable());
        assert!(matches!(err, AdapterError::Rejected { status: 401, .. }));
        assert_eq!(err.to_string(), "Invalid email or password");
    }
}
