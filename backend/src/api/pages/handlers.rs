//! Handler functions for page contexts.

use axum::extract::Query;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::policy::{self, nav_for_role, NavItem};
use crate::auth::Role;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub page: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<&'static str>,
    pub nav: Vec<NavItem>,
}

/// Context for any page path. The role is present only on protected pages.
pub async fn page(uri: Uri, role: Option<Extension<Role>>) -> Response {
    let path = uri.path();
    if !policy::is_public(path) && policy::allowed_roles(path).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Page not found", "page": path })),
        )
            .into_response();
    }

    let role = role.map(|Extension(role)| role);
    Json(PageContext {
        page: path.to_string(),
        role,
        role_name: role.map(Role::display_name),
        nav: role.map(nav_for_role).unwrap_or_default(),
    })
    .into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnauthorizedQuery {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub required_roles: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnauthorizedContext {
    pub from: String,
    pub required_roles: Vec<String>,
    pub user_role: String,
}

impl From<UnauthorizedQuery> for UnauthorizedContext {
    fn from(query: UnauthorizedQuery) -> Self {
        Self {
            from: query
                .from
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| "unknown page".to_string()),
            required_roles: query
                .required_roles
                .map(|roles| {
                    roles
                        .split(',')
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            user_role: query
                .user_role
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Diagnostic context for the unauthorized page. Display only.
pub async fn unauthorized(
    Query(query): Query<UnauthorizedQuery>,
) -> (StatusCode, Json<UnauthorizedContext>) {
    (StatusCode::FORBIDDEN, Json(query.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_context_defaults() {
        let ctx = UnauthorizedContext::from(UnauthorizedQuery::default());
        assert_eq!(ctx.from, "unknown page");
        assert!(ctx.required_roles.is_empty());
        assert_eq!(ctx.user_role, "unknown");
    }

    #[test]
    fn unauthorized_context_splits_roles() {
        let ctx = UnauthorizedContext::from(UnauthorizedQuery {
            from: Some("/students".into()),
            required_roles: Some("teacher,admin".into()),
            user_role: Some("student".into()),
        });
        assert_eq!(ctx.required_roles, ["teacher", "admin"]);
        assert_eq!(ctx.user_role, "student");
    }
}
