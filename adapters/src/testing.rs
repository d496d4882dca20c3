//! In-process identity service for tests.
//!
//! [`ScriptedIdentity`] implements [`IdentityAdapter`] over a small in-memory account
//! table. It can be switched offline (every call fails as unreachable), made to
//! reject every call, and can hold a profile fetch open so tests can interleave
//! other operations with an in-flight resolution.
//!
//! ```
//! use adapters::testing::ScriptedIdentity;
//!
//! let identity = ScriptedIdentity::new();
//! identity.add_account("t@school.io", "pw", "teacher", "tok-t");
//! identity.set_offline(true);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::Notify;

use crate::errors::AdapterError;
use crate::models::*;
use crate::IdentityAdapter;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    token: String,
    user: RemoteUser,
}

/// Handles for a paused profile fetch.
#[derive(Debug, Clone)]
pub struct ProfilePause {
    /// Notified once the fetch has started and is waiting.
    pub entered: Arc<Notify>,
    /// Notify to let the fetch complete.
    pub release: Arc<Notify>,
}

#[derive(Debug, Default)]
pub struct ScriptedIdentity {
    accounts: Mutex<Vec<Account>>,
    offline: AtomicBool,
    rejection: Mutex<Option<(u16, String)>>,
    pause: Mutex<Option<ProfilePause>>,
    calls: Mutex<Vec<String>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, email: &str, password: &str, role: &str, token: &str) {
        let user = RemoteUser {
            id: Some(format!("id-{email}")),
            object_id: None,
            email: email.to_string(),
            role: role.to_string(),
            name: Some(email.split('@').next().unwrap_or(email).to_string()),
            extra: Map::new(),
        };
        lock(&self.accounts).push(Account {
            password: password.to_string(),
            token: token.to_string(),
            user,
        });
    }

    /// Every call fails as [`AdapterError::Unreachable`] while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every call fails as [`AdapterError::Rejected`] with this status and reason.
    pub fn reject_all(&self, status: u16, message: &str) {
        *lock(&self.rejection) = Some((status, message.to_string()));
    }

    /// Makes the next profile fetch wait until released.
    pub fn pause_profile(&self) -> ProfilePause {
        let pause = ProfilePause {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        *lock(&self.pause) = Some(pause.clone());
        pause
    }

    /// Names of the calls received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn enter(&self, call: &str) -> Result<(), AdapterError> {
        lock(&self.calls).push(call.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(AdapterError::Unreachable(
                "error sending request: connection refused".into(),
            ));
        }
        if let Some((status, message)) = lock(&self.rejection).clone() {
            return Err(AdapterError::Rejected { status, message });
        }
        Ok(())
    }

    fn by_token(&self, token: &str) -> Result<Account, AdapterError> {
        lock(&self.accounts)
            .iter()
            .find(|a| a.token == token)
            .cloned()
            .ok_or_else(|| AdapterError::Rejected {
                status: 401,
                message: "Invalid or expired token".into(),
            })
    }
}

#[async_trait]
impl IdentityAdapter for ScriptedIdentity {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AdapterError> {
        self.enter("register")?;
        if lock(&self.accounts).iter().any(|a| a.user.email == request.email) {
            return Err(AdapterError::Rejected {
                status: 409,
                message: "User already exists".into(),
            });
        }
        let role = request.role.clone().unwrap_or_else(|| "student".into());
        let token = format!("issued-{}", request.email);
        self.add_account(&request.email, &request.password, &role, &token);
        let account = self.by_token(&token)?;
        let mut user = account.user;
        user.name = Some(request.name.clone());
        Ok(AuthResponse {
            success: true,
            message: Some("User registered successfully".into()),
            user: Some(user),
            token: Some(token),
        })
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AdapterError> {
        self.enter("login")?;
        let account = lock(&self.accounts)
            .iter()
            .find(|a| a.user.email == request.email && a.password == request.password)
            .cloned()
            .ok_or_else(|| AdapterError::Rejected {
                status: 401,
                message: "Invalid email or password".into(),
            })?;
        Ok(AuthResponse {
            success: true,
            message: Some("Login successful".into()),
            user: Some(account.user),
            token: Some(account.token),
        })
    }

    async fn logout(&self, _token: &str) -> Result<(), AdapterError> {
        self.enter("logout")
    }

    async fn profile(&self, token: &str) -> Result<ProfileResponse, AdapterError> {
        let pause = lock(&self.pause).take();
        if let Some(pause) = pause {
            pause.entered.notify_one();
            pause.release.notified().await;
        }
        self.enter("profile")?;
        let account = self.by_token(token)?;
        Ok(ProfileResponse {
            success: true,
            message: None,
            user: Some(account.user),
        })
    }

    async fn update_profile(
        &self,
        token: &str,
        fields: &ProfileFields,
    ) -> Result<ProfileResponse, AdapterError> {
        self.enter("update_profile")?;
        let mut accounts = lock(&self.accounts);
        let account = accounts
            .iter_mut()
            .find(|a| a.token == token)
            .ok_or_else(|| AdapterError::Rejected {
                status: 401,
                message: "Invalid or expired token".into(),
            })?;
        for (key, value) in fields {
            match (key.as_str(), value) {
                ("name", Value::String(name)) => account.user.name = Some(name.clone()),
                ("email" | "role" | "id" | "_id", _) => {}
                _ => {
                    account.user.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(ProfileResponse {
            success: true,
            message: Some("Profile updated successfully".into()),
            user: Some(account.user.clone()),
        })
    }

    async fn change_password(
        &self,
        token: &str,
        request: &PasswordChange,
    ) -> Result<ApiMessage, AdapterError> {
        self.enter("change_password")?;
        let mut accounts = lock(&self.accounts);
        let account = accounts
            .iter_mut()
            .find(|a| a.token == token)
            .ok_or_else(|| AdapterError::Rejected {
                status: 401,
                message: "Invalid or expired token".into(),
            })?;
        if account.password != request.current_password {
            return Err(AdapterError::Rejected {
                status: 400,
                message: "Current password is incorrect".into(),
            });
        }
        account.password = request.new_password.clone();
        Ok(ApiMessage {
            success: true,
            message: "Password changed successfully".into(),
        })
    }

    async fn dashboard(
        &self,
        token: &str,
        kind: DashboardKind,
    ) -> Result<DashboardResponse, AdapterError> {
        self.enter("dashboard")?;
        let account = self.by_token(token)?;
        Ok(DashboardResponse {
            success: true,
            data: json!({ "feed": kind.path(), "role": account.user.role }),
        })
    }

    async fn log_activity(
        &self,
        token: &str,
        request: &ActivityRequest,
    ) -> Result<ApiMessage, AdapterError> {
        self.enter("log_activity")?;
        self.by_token(token)?;
        Ok(ApiMessage {
            success: true,
            message: format!("Activity '{}' logged", request.action),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn login_checks_password() {
        let identity = ScriptedIdentity::new();
        identity.add_account("a@school.io", "pw", "admin", "tok-a");

        let ok = identity
            .login(&LoginRequest {
                email: "a@school.io".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();
        assert_eq!(ok.token.as_deref(), Some("tok-a"));

        let err = identity
            .login(&LoginRequest {
                email: "a@school.io".into(),
                password: "nope".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Rejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn offline_and_rejecting_modes() {
        let identity = ScriptedIdentity::new();
        identity.add_account("a@school.io", "pw", "admin", "tok-a");

        identity.set_offline(true);
        assert!(identity.profile("tok-a").await.unwrap_err().is_unreachable());

        identity.set_offline(false);
        identity.reject_all(503, "maintenance");
        let err = identity.profile("tok-a").await.unwrap_err();
        assert_eq!(err.to_string(), "maintenance");
        assert_eq!(identity.calls(), ["profile", "profile"]);
    }
}
