//! HTTP adapter implementation for the remote identity service.
//!
//! This file contains the concrete implementation of [`IdentityAdapter`] over
//! `reqwest`, including URL construction, bearer authentication, error
//! classification and response decoding. [`HealthCheck`] probes the service's
//! health endpoint for the status indicator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::errors::AdapterError;
use crate::models::*;
use crate::IdentityAdapter;

pub struct HttpIdentityAdapter {
    client: Client,
    base_url: String,
}

impl HttpIdentityAdapter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AdapterError::Setup(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Sends the request and decodes a 2xx JSON body into `T`.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T, AdapterError> {
        let body = self.send_raw(request, action).await?;
        serde_json::from_str(&body).map_err(|err| AdapterError::Decode(err.to_string()))
    }

    async fn send_raw(&self, request: RequestBuilder, action: &str) -> Result<String, AdapterError> {
        let response = request.send().await.map_err(|err| {
            warn!(action, error = %err, "identity service request failed");
            AdapterError::from(err)
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!(action, status = status.as_u16(), "identity service responded");

        if !status.is_success() {
            return Err(AdapterError::Rejected {
                status: status.as_u16(),
                message: rejection_message(status.as_u16(), &body, action),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl IdentityAdapter for HttpIdentityAdapter {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AdapterError> {
        let req = self.client.post(self.url("auth/register")).json(request);
        self.send(req, "Registration").await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AdapterError> {
        let req = self
            .client
            .post(self.url("auth/login"))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request);
        self.send(req, "Login").await
    }

    async fn logout(&self, token: &str) -> Result<(), AdapterError> {
        let req = self.client.post(self.url("logout")).bearer_auth(token);
        self.send_raw(req, "Logout").await.map(|_| ())
    }

    async fn profile(&self, token: &str) -> Result<ProfileResponse, AdapterError> {
        let req = self.client.get(self.url("profile")).bearer_auth(token);
        self.send(req, "Profile fetch").await
    }

    async fn update_profile(
        &self,
        token: &str,
        fields: &ProfileFields,
    ) -> Result<ProfileResponse, AdapterError> {
        let req = self
            .client
            .put(self.url("profile"))
            .bearer_auth(token)
            .json(fields);
        self.send(req, "Profile update").await
    }

    async fn change_password(
        &self,
        token: &str,
        request: &PasswordChange,
    ) -> Result<ApiMessage, AdapterError> {
        let req = self
            .client
            .put(self.url("profile/password"))
            .bearer_auth(token)
            .json(request);
        self.send(req, "Password change").await
    }

    async fn dashboard(
        &self,
        token: &str,
        kind: DashboardKind,
    ) -> Result<DashboardResponse, AdapterError> {
        let req = self.client.get(self.url(kind.path())).bearer_auth(token);
        self.send(req, "Dashboard fetch").await
    }

    async fn log_activity(
        &self,
        token: &str,
        request: &ActivityRequest,
    ) -> Result<ApiMessage, AdapterError> {
        let req = self
            .client
            .post(self.url("dashboard/activity"))
            .bearer_auth(token)
            .json(request);
        self.send(req, "Activity logging").await
    }
}

/// Probes a health endpoint with a hard timeout.
#[derive(Clone)]
pub struct HealthCheck {
    client: Client,
    url: String,
}

impl HealthCheck {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AdapterError::Setup(err.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// `true` when the endpoint answers 2xx before the timeout.
    pub async fn probe(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(url = %self.url, error = %err, "health probe failed");
                false
            }
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Picks the reason string surfaced to users for a rejected call.
fn rejection_message(status: u16, body: &str, action: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("{action} failed (HTTP {status})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalises_slashes() {
        assert_eq!(
            join_url("https://idp.example/api/", "/auth/login"),
            "https://idp.example/api/auth/login"
        );
        assert_eq!(
            join_url("https://idp.example/api", "profile"),
            "https://idp.example/api/profile"
        );
    }

    #[test]
    fn rejection_message_prefers_service_reason() {
        let msg = rejection_message(401, r#"{"success":false,"message":"Token expired"}"#, "Login");
        assert_eq!(msg, "Token expired");
    }

    #[test]
    fn rejection_message_falls_back_on_garbage() {
        assert_eq!(
            rejection_message(502, "<html>bad gateway</html>", "Profile fetch"),
            "Profile fetch failed (HTTP 502)"
        );
        assert_eq!(
            rejection_message(400, r#"{"message":""}"#, "Login"),
            "Login failed (HTTP 400)"
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_classified_as_unreachable() {
        // port 9 (discard) on loopback is never served in test environments
        let adapter =
            HttpIdentityAdapter::new("http://127.0.0.1:9/api", Duration::from_millis(500)).unwrap();
        let err = adapter.profile("tok").await.unwrap_err();
        assert!(err.is_unreachable(), "got: {err:?}");
    }

    #[tokio::test]
    async fn health_probe_reports_offline() {
        let check = HealthCheck::new("http://127.0.0.1:9/health", Duration::from_millis(500)).unwrap();
        assert!(!check.probe().await);
    }
}
