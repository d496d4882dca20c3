//! Core business logic for the authentication system.
//!
//! [`AuthSession`] is the session object a client holds for its lifetime. It owns the
//! resolved identity and moves it only through the transitions below:
//!
//! ```text
//!            resolve()                   profile ok
//! Unknown ──────────────▶ Resolving ─────────────────────▶ Authenticated(user)
//!    │ no token               │ unreachable: fresh token claims / cached user ─┘
//!    ▼                        │ unreachable, nothing recoverable: drop token
//! Anonymous ◀─────────────────┘ rejected: drop token
//!    ▲
//!    └──── logout() (always, even when the remote call fails)
//! ```
//!
//! Every operation takes a new session generation before it awaits the network and
//! applies its result only if that generation is still current, so a logout issued
//! while a resolution is in flight cannot be undone by the late result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use adapters::{IdentityAdapter, LoginRequest, RegisterRequest};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::errors::AuthError;
use super::models::{Role, User};
use super::policy;
use super::store::CredentialStore;
use super::token::decode_claims;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unknown,
    Resolving,
    Authenticated(User),
    Anonymous,
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Authenticated(_) | Self::Anonymous)
    }
}

/// Where a resolved identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Profile,
    TokenClaims,
    CachedUser,
}

pub struct AuthSession {
    identity: Arc<dyn IdentityAdapter>,
    store: CredentialStore,
    state: RwLock<AuthState>,
    generation: AtomicU64,
    clock: fn() -> i64,
}

fn unix_now() -> i64 {
    Utc::now().timestamp()
}

impl AuthSession {
    pub fn new(identity: Arc<dyn IdentityAdapter>, store: CredentialStore) -> Self {
        Self {
            identity,
            store,
            state: RwLock::new(AuthState::Unknown),
            generation: AtomicU64::new(0),
            clock: unix_now,
        }
    }

    /// Replaces the wall clock used for token expiry checks.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn state(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().user().cloned()
    }

    pub fn is_loading(&self) -> bool {
        !self.state().is_settled()
    }

    pub fn has_permission(&self, capability: &str) -> bool {
        policy::has_permission(self.current_user().as_ref(), capability)
    }

    pub fn is_role(&self, role: Role) -> bool {
        policy::is_role(self.current_user().as_ref(), role)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a new generation and returns it.
    fn begin(&self, interim: Option<AuthState>) -> u64 {
        let mut state = self.write_state();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(interim) = interim {
            *state = interim;
        }
        generation
    }

    /// Applies `next` and its storage `effect` only if `generation` is still current.
    fn commit(
        &self,
        generation: u64,
        next: AuthState,
        effect: impl FnOnce(&CredentialStore),
    ) -> bool {
        let mut state = self.write_state();
        let current = self.generation.load(Ordering::SeqCst);
        if current != generation {
            debug!(generation, current, "discarding superseded auth result");
            return false;
        }
        effect(&self.store);
        *state = next;
        true
    }

    /// Resolves the session from stored credentials. Runs once at startup.
    pub async fn resolve(&self) -> AuthState {
        let Some(token) = self.store.token() else {
            let generation = self.begin(None);
            self.commit(generation, AuthState::Anonymous, |_| {});
            debug!("no stored token, session is anonymous");
            return self.state();
        };

        let generation = self.begin(Some(AuthState::Resolving));
        let outcome = self.resolve_token(&token).await;

        match outcome {
            Ok((user, source)) => {
                info!(user = %user.email, role = %user.role, ?source, "session resolved");
                let cache = source == IdentitySource::Profile;
                self.commit(generation, AuthState::Authenticated(user.clone()), |store| {
                    if cache {
                        store.cache_user(&user);
                    }
                });
            }
            Err(err) => {
                warn!(error = %err, "session could not be resolved, discarding token");
                self.commit(generation, AuthState::Anonymous, CredentialStore::remove_token);
            }
        }

        self.state()
    }

    async fn resolve_token(&self, token: &str) -> Result<(User, IdentitySource), AuthError> {
        let err = match self.identity.profile(token).await {
            Ok(response) if response.success => {
                let remote = response
                    .user
                    .ok_or_else(|| AuthError::Malformed("profile response carried no user".into()))?;
                return User::try_from(&remote).map(|u| (u, IdentitySource::Profile));
            }
            Ok(response) => {
                return Err(AuthError::Rejected(
                    response
                        .message
                        .unwrap_or_else(|| "Failed to get profile".to_string()),
                ))
            }
            Err(err) => AuthError::from(err),
        };

        if !err.is_unreachable() {
            return Err(err);
        }

        warn!("identity service unreachable, falling back to local identity");
        match decode_claims(token) {
            Some(claims) if claims.role().is_some() => {
                if !claims.is_fresh_at((self.clock)()) {
                    debug!(exp = ?claims.exp, "token payload is expired or has no expiry");
                    return Err(err);
                }
                claims
                    .to_user()
                    .map(|u| (u, IdentitySource::TokenClaims))
                    .ok_or(err)
            }
            _ => self
                .store
                .cached_user()
                .map(|u| (u, IdentitySource::CachedUser))
                .ok_or(err),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let generation = self.begin(None);
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.identity.login(&request).await.map_err(|err| {
            warn!(email, error = %err, "login failed");
            AuthError::from(err)
        })?;

        self.establish(generation, response)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AuthError> {
        if request.email.is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let generation = self.begin(None);
        let response = self.identity.register(request).await.map_err(|err| {
            warn!(email = %request.email, error = %err, "registration failed");
            AuthError::from(err)
        })?;

        self.establish(generation, response)
    }

    fn establish(
        &self,
        generation: u64,
        response: adapters::AuthResponse,
    ) -> Result<User, AuthError> {
        if !response.success {
            return Err(AuthError::Rejected(
                response.message.unwrap_or_else(|| "Login failed".to_string()),
            ));
        }
        let (Some(remote), Some(token)) = (response.user, response.token) else {
            return Err(AuthError::Malformed(
                "auth response carried no user or token".into(),
            ));
        };
        let user = User::try_from(&remote)?;

        let applied = self.commit(generation, AuthState::Authenticated(user.clone()), |store| {
            store.set_token(&token);
            store.cache_user(&user);
        });
        if !applied {
            return Err(AuthError::Superseded);
        }

        info!(user = %user.email, role = %user.role, "session established");
        Ok(user)
    }

    /// Sets the session identity directly, e.g. after a profile edit.
    pub fn set_user(&self, user: User) {
        let generation = self.begin(None);
        self.commit(generation, AuthState::Authenticated(user.clone()), |store| {
            store.cache_user(&user)
        });
    }

    /// Ends the session. The remote call is best effort; local state is always cleared.
    pub async fn logout(&self) {
        self.begin(None);

        if let Some(token) = self.store.token() {
            if let Err(err) = self.identity.logout(&token).await {
                warn!(error = %err, "remote logout failed, clearing local session anyway");
            }
        }

        let mut state = self.write_state();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store.clear_all();
        *state = AuthState::Anonymous;
        info!("session cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::policy::{MANAGE_USERS, VIEW_DASHBOARD};
    use crate::auth::store::{KeyValueStore, MemoryStore, AUTH_COOKIE, TOKEN_KEY, USER_KEY};
    use crate::auth::token::unsigned_token;
    use adapters::testing::ScriptedIdentity;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        identity: Arc<ScriptedIdentity>,
        cookies: Arc<MemoryStore>,
        local: Arc<MemoryStore>,
        session: Arc<AuthSession>,
    }

    fn fixture() -> Fixture {
        let identity = Arc::new(ScriptedIdentity::new());
        let cookies = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryStore::new());
        let store = CredentialStore::new(cookies.clone(), local.clone());
        let session = AuthSession::new(identity.clone(), store).with_clock(|| NOW);
        Fixture {
            identity,
            cookies,
            local,
            session: Arc::new(session),
        }
    }

    fn teacher_token(exp: i64) -> String {
        unsigned_token(&json!({
            "id": "t-1",
            "email": "tess@school.io",
            "role": "teacher",
            "name": "Tess",
            "exp": exp
        }))
    }

    #[tokio::test]
    async fn no_token_resolves_anonymous_without_network() {
        let f = fixture();
        assert_eq!(f.session.state(), AuthState::Unknown);
        assert!(f.session.is_loading());

        assert_eq!(f.session.resolve().await, AuthState::Anonymous);
        assert!(f.identity.calls().is_empty());
        assert!(!f.session.is_loading());
    }

    #[tokio::test]
    async fn canonical_profile_wins() {
        let f = fixture();
        f.identity
            .add_account("amy@school.io", "pw", "admin", "tok-amy");
        f.cookies.set(AUTH_COOKIE, "tok-amy".into());

        let state = f.session.resolve().await;
        let user = state.user().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.email, "amy@school.io");
        assert!(f.local.get(USER_KEY).is_some());
        assert!(f.session.has_permission(MANAGE_USERS));
        assert!(f.session.is_role(Role::Admin));
    }

    #[tokio::test]
    async fn rejected_token_is_discarded() {
        let f = fixture();
        f.session.store().set_token("stale-token");

        assert_eq!(f.session.resolve().await, AuthState::Anonymous);
        assert_eq!(f.session.store().token(), None);
    }

    #[tokio::test]
    async fn offline_falls_back_to_fresh_token_claims() {
        let f = fixture();
        f.identity.set_offline(true);
        let token = teacher_token(NOW + 3_600);
        f.session.store().set_token(&token);

        let state = f.session.resolve().await;
        let user = state.user().unwrap();
        assert_eq!(user.id, "t-1");
        assert_eq!(user.role, Role::Teacher);
        assert_eq!(f.session.store().token(), Some(token));
    }

    #[tokio::test]
    async fn offline_with_expired_token_goes_anonymous() {
        let f = fixture();
        f.identity.set_offline(true);
        f.session.store().set_token(&teacher_token(NOW - 1));

        assert_eq!(f.session.resolve().await, AuthState::Anonymous);
        assert_eq!(f.session.store().token(), None);
    }

    #[tokio::test]
    async fn offline_with_opaque_token_uses_cached_user() {
        let f = fixture();
        f.identity.set_offline(true);
        f.local.set(TOKEN_KEY, "opaque-session-id".into());
        f.local.set(
            USER_KEY,
            json!({"id": "s-4", "email": "sam@school.io", "role": "student"}).to_string(),
        );

        let state = f.session.resolve().await;
        assert_eq!(state.user().unwrap().id, "s-4");
        assert_eq!(f.session.store().token().as_deref(), Some("opaque-session-id"));
    }

    #[tokio::test]
    async fn offline_with_nothing_recoverable_goes_anonymous() {
        let f = fixture();
        f.identity.set_offline(true);
        f.session.store().set_token("opaque-session-id");

        assert_eq!(f.session.resolve().await, AuthState::Anonymous);
        assert_eq!(f.session.store().token(), None);
    }

    #[tokio::test]
    async fn login_stores_token_and_user() {
        let f = fixture();
        f.identity
            .add_account("sam@school.io", "pw", "student", "tok-sam");

        let user = f.session.login("sam@school.io", "pw").await.unwrap();
        assert_eq!(user.role, Role::Student);
        assert_eq!(f.cookies.get(AUTH_COOKIE).as_deref(), Some("tok-sam"));
        assert_eq!(f.local.get(TOKEN_KEY).as_deref(), Some("tok-sam"));
        assert_eq!(f.session.store().cached_user(), Some(user.clone()));
        assert_eq!(f.session.current_user(), Some(user));
        assert!(f.session.has_permission(VIEW_DASHBOARD));
        assert!(!f.session.has_permission(MANAGE_USERS));
    }

    #[tokio::test]
    async fn login_failure_surfaces_reason_and_stays_anonymous() {
        let f = fixture();
        f.session.resolve().await;
        f.identity
            .add_account("sam@school.io", "pw", "student", "tok-sam");

        let err = f.session.login("sam@school.io", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert_eq!(f.session.state(), AuthState::Anonymous);
        assert_eq!(f.session.store().token(), None);

        assert!(matches!(
            f.session.login("", "pw").await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn refusal_body_surfaces_raw_reason() {
        let f = fixture();
        let generation = f.session.begin(None);
        let refusal = adapters::AuthResponse {
            success: false,
            message: Some("Invalid credentials".into()),
            user: None,
            token: None,
        };

        let err = f.session.establish(generation, refusal).unwrap_err();
        assert!(matches!(&err, AuthError::Rejected(reason) if reason == "Invalid credentials"));
        assert_eq!(f.session.store().token(), None);
        assert_eq!(f.session.current_user(), None);
    }

    #[tokio::test]
    async fn register_authenticates_new_account() {
        let f = fixture();
        let user = f
            .session
            .register(&RegisterRequest {
                name: "Newt".into(),
                email: "newt@school.io".into(),
                password: "pw".into(),
                role: Some("teacher".into()),
            })
            .await
            .unwrap();
        assert_eq!(user.role, Role::Teacher);
        assert_eq!(user.name.as_deref(), Some("Newt"));
        assert!(f.session.store().token().is_some());
    }

    #[tokio::test]
    async fn logout_clears_everything_even_when_remote_fails() {
        let f = fixture();
        f.identity
            .add_account("amy@school.io", "pw", "admin", "tok-amy");
        f.session.login("amy@school.io", "pw").await.unwrap();
        f.local.set("draft", "x".into());

        f.identity.set_offline(true);
        f.session.logout().await;

        assert_eq!(f.session.state(), AuthState::Anonymous);
        assert!(f.cookies.is_empty());
        assert!(f.local.is_empty());
        assert_eq!(f.identity.calls().last().map(String::as_str), Some("logout"));
    }

    #[tokio::test]
    async fn logout_wins_against_in_flight_resolution() {
        let f = fixture();
        f.identity
            .add_account("amy@school.io", "pw", "admin", "tok-amy");
        f.session.store().set_token("tok-amy");
        let pause = f.identity.pause_profile();

        let session = f.session.clone();
        let resolution = tokio::spawn(async move { session.resolve().await });

        pause.entered.notified().await;
        assert_eq!(f.session.state(), AuthState::Resolving);
        f.session.logout().await;
        pause.release.notify_one();

        assert_eq!(resolution.await.unwrap(), AuthState::Anonymous);
        assert_eq!(f.session.state(), AuthState::Anonymous);
        assert_eq!(f.session.store().token(), None);
        assert!(f.local.is_empty());
    }

    #[tokio::test]
    async fn set_user_overrides_identity() {
        let f = fixture();
        let user = User {
            id: "7".into(),
            email: "x@school.io".into(),
            role: Role::Teacher,
            name: None,
        };
        f.session.set_user(user.clone());
        assert_eq!(f.session.current_user(), Some(user));
        assert!(f.session.is_role(Role::Teacher));
    }
}
