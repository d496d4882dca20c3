//! Wire models for the identity service.
//!
//! These mirror the JSON the service speaks. They are deliberately loose where the
//! service is loose: user ids arrive as either `id` or `_id`, and profile/dashboard
//! payloads carry many presentation-only fields that are passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary profile fields, forwarded as-is on update.
pub type ProfileFields = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRequest {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// A user record as returned by login, registration and profile calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub email: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Remaining presentation fields (bio, avatar, lastActive, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteUser {
    /// The user identifier, whichever key the service used for it.
    pub fn identifier(&self) -> Option<&str> {
        self.id.as_deref().or(self.object_id.as_deref())
    }
}

/// Answer to login and registration. A refusal may arrive as a 2xx
/// `{ success: false, message }` with neither user nor token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<RemoteUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<RemoteUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Dashboard payloads are chart data for the front end; the gateway never inspects them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub data: Value,
}

/// Which dashboard feed to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardKind {
    General,
    Admin,
    Teacher,
}

impl DashboardKind {
    pub fn path(self) -> &'static str {
        match self {
            Self::General => "dashboard",
            Self::Admin => "dashboard/admin",
            Self::Teacher => "dashboard/teacher",
        }
    }
}

/// Shape of an error body; only the message is of interest.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
