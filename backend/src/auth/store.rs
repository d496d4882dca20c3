//! Session token and user caches.
//!
//! A token lives in two places: the `auth-token` cookie, which is primary and the
//! only copy the edge gate can see, and a redundant `token` entry in a local
//! key-value cache. The local cache also keeps the last known `user` record so the
//! resolver can recover an identity when neither the service nor the token helps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::models::User;

pub const AUTH_COOKIE: &str = "auth-token";
pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Seven days.
pub const COOKIE_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(key, value.into());
        store
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

#[derive(Clone)]
pub struct CredentialStore {
    cookies: Arc<dyn KeyValueStore>,
    local: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(cookies: Arc<dyn KeyValueStore>, local: Arc<dyn KeyValueStore>) -> Self {
        Self { cookies, local }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// The cookie copy wins; the local copy is the fallback.
    pub fn token(&self) -> Option<String> {
        self.cookies
            .get(AUTH_COOKIE)
            .filter(|t| !t.is_empty())
            .or_else(|| self.local.get(TOKEN_KEY).filter(|t| !t.is_empty()))
    }

    pub fn set_token(&self, token: &str) {
        self.cookies.set(AUTH_COOKIE, token.to_string());
        self.local.set(TOKEN_KEY, token.to_string());
    }

    pub fn remove_token(&self) {
        self.cookies.remove(AUTH_COOKIE);
        self.local.remove(TOKEN_KEY);
    }

    pub fn cached_user(&self) -> Option<User> {
        let raw = self.local.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                debug!(error = %err, "discarding unreadable cached user");
                None
            }
        }
    }

    pub fn cache_user(&self, user: &User) {
        if let Ok(raw) = serde_json::to_string(user) {
            self.local.set(USER_KEY, raw);
        }
    }

    /// Drops every token and user record held locally.
    pub fn clear_all(&self) {
        self.remove_token();
        self.local.clear();
    }
}

/// `Set-Cookie` value that stores `token` for seven days.
pub fn auth_cookie(token: &str) -> String {
    format!("{AUTH_COOKIE}={token}; Max-Age={COOKIE_MAX_AGE_SECS}; Path=/; SameSite=Strict")
}

/// `Set-Cookie` value that deletes the auth cookie.
pub fn expired_auth_cookie() -> String {
    format!("{AUTH_COOKIE}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/; SameSite=Strict")
}

/// Value of cookie `name` in a `Cookie` request header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}
