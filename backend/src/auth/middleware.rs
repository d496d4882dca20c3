//! Edge gate protecting role-restricted pages.
//!
//! Runs before any handler, sees only the incoming request, and re-derives the
//! caller's role from the `auth-token` cookie every time. Decisions are made by the
//! pure [`evaluate`] so they can be checked without a server; [`route_gate`] is the
//! axum adapter around it.
//!
//! | request                                   | outcome                                   |
//! |-------------------------------------------|-------------------------------------------|
//! | public or unlisted path                   | pass through                              |
//! | protected path, no cookie                 | `/login?redirect=<path>`                  |
//! | protected path, corrupt token             | `/login?redirect=<path>`                  |
//! | protected path, role not allowed/unknown  | `/unauthorized?from&requiredRoles&userRole`|
//! | protected path, role allowed              | pass through with `x-user-role`           |

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use reqwest::Url;
use tracing::{debug, warn};

use super::models::Role;
use super::policy;
use super::store::{cookie_value, AUTH_COOKIE};
use super::token::{inspect, Payload};

pub const ROLE_HEADER: &str = "x-user-role";
pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through. `role` is set when the path was protected.
    Allow { role: Option<Role> },
    RedirectLogin { location: String },
    RedirectUnauthorized { location: String },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Allow { .. } => None,
            Self::RedirectLogin { location } | Self::RedirectUnauthorized { location } => {
                Some(location)
            }
        }
    }
}

/// Role claim as the gate sees it. Unrecognised claims are kept verbatim so the
/// unauthorized page can show them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeRole {
    Known(Role),
    Unrecognised(String),
}

impl EdgeRole {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(role) => role.as_str(),
            Self::Unrecognised(raw) => raw,
        }
    }
}

/// Role the gate attributes to `token`; `None` means "treat as signed out".
///
/// A token that is not three segments, or whose payload has no role claim, gets
/// the lowest role. Only a payload that cannot be decoded at all gets nothing.
pub fn edge_role(token: &str) -> Option<EdgeRole> {
    match inspect(token) {
        Payload::Opaque => Some(EdgeRole::Known(Role::LOWEST)),
        Payload::Corrupt => None,
        Payload::Claims(claims) => Some(match claims.role.as_deref() {
            None | Some("") => EdgeRole::Known(Role::LOWEST),
            Some(raw) => raw
                .parse()
                .map(EdgeRole::Known)
                .unwrap_or_else(|_| EdgeRole::Unrecognised(raw.to_string())),
        }),
    }
}

pub fn evaluate(path: &str, token: Option<&str>) -> GateDecision {
    if policy::is_public(path) {
        return GateDecision::Allow { role: None };
    }
    let Some(allowed) = policy::allowed_roles(path) else {
        return GateDecision::Allow { role: None };
    };

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        debug!(path, "no auth cookie on protected path");
        return GateDecision::RedirectLogin {
            location: login_location(path),
        };
    };

    let Some(claimed) = edge_role(token) else {
        warn!(path, "undecodable auth token on protected path");
        return GateDecision::RedirectLogin {
            location: login_location(path),
        };
    };

    match claimed {
        EdgeRole::Known(role) if allowed.contains(&role) => GateDecision::Allow { role: Some(role) },
        claimed => {
            debug!(path, role = claimed.as_str(), "role not allowed on path");
            GateDecision::RedirectUnauthorized {
                location: unauthorized_location(path, allowed, claimed.as_str()),
            }
        }
    }
}

pub fn login_location(path: &str) -> String {
    with_query(LOGIN_PATH, &[("redirect", path)])
}

pub fn unauthorized_location(path: &str, required: &[Role], user_role: &str) -> String {
    let required = required
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(",");
    with_query(
        UNAUTHORIZED_PATH,
        &[
            ("from", path),
            ("requiredRoles", required.as_str()),
            ("userRole", user_role),
        ],
    )
}

fn with_query(path: &str, params: &[(&str, &str)]) -> String {
    match Url::parse_with_params(&format!("http://edge.invalid{path}"), params) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) => path.to_string(),
    }
}

fn request_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| cookie_value(raw, AUTH_COOKIE))
        .map(str::to_owned)
}

/// axum middleware applying [`evaluate`] to every request.
pub async fn route_gate(mut request: Request<Body>, next: Next) -> Response {
    // never trust a role header supplied by the caller
    request.headers_mut().remove(ROLE_HEADER);

    let path = request.uri().path().to_string();
    let token = request_token(&request);

    match evaluate(&path, token.as_deref()) {
        GateDecision::Allow { role } => {
            let Some(role) = role else {
                return next.run(request).await;
            };
            let value = HeaderValue::from_static(role.as_str());
            request.extensions_mut().insert(role);
            request.headers_mut().insert(ROLE_HEADER, value.clone());

            let mut response = next.run(request).await;
            response.headers_mut().insert(ROLE_HEADER, value);
            response
        }
        GateDecision::RedirectLogin { location } | GateDecision::RedirectUnauthorized { location } => {
            Redirect::temporary(&location).into_response()
        }
    }
}
