//! Core `adapters` crate for abstracting the remote identity service.
//!
//! This crate defines the [`IdentityAdapter`] trait, which outlines the calls the
//! gateway makes against the identity/profile/dashboard service, and provides the
//! concrete HTTP implementation used in production. The service itself is an external
//! collaborator: every response is JSON with a `success` flag and either a `message`
//! or a payload, and every authenticated call carries a bearer token.

pub mod errors;
pub mod http;
pub mod models;
pub mod testing;

use async_trait::async_trait;

pub use errors::AdapterError;
pub use http::{HealthCheck, HttpIdentityAdapter};
pub use models::*;

/// Calls made against the remote identity service.
///
/// Implementations must classify transport failures as
/// [`AdapterError::Unreachable`] and non-2xx answers as [`AdapterError::Rejected`];
/// the auth resolver's offline fallback depends on that distinction.
#[async_trait]
pub trait IdentityAdapter: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AdapterError>;

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AdapterError>;

    /// Invalidates the token server-side. Callers treat failures as non-fatal.
    async fn logout(&self, token: &str) -> Result<(), AdapterError>;

    /// Fetches the canonical profile for the bearer of `token`.
    async fn profile(&self, token: &str) -> Result<ProfileResponse, AdapterError>;

    async fn update_profile(
        &self,
        token: &str,
        fields: &ProfileFields,
    ) -> Result<ProfileResponse, AdapterError>;

    async fn change_password(
        &self,
        token: &str,
        request: &PasswordChange,
    ) -> Result<ApiMessage, AdapterError>;

    async fn dashboard(
        &self,
        token: &str,
        kind: DashboardKind,
    ) -> Result<DashboardResponse, AdapterError>;

    async fn log_activity(
        &self,
        token: &str,
        request: &ActivityRequest,
    ) -> Result<ApiMessage, AdapterError>;
}
