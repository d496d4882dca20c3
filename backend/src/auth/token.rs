//! Best-effort decoding of session token payloads.
//!
//! Tokens are conventionally `header.payload.signature` with a base64url JSON
//! payload. Nothing here checks the signature: a decoded payload is a hint used for
//! gating and for offline presentation, never proof of identity. [`inspect`] keeps
//! "not a JWT at all" apart from "a JWT we cannot read"; the edge gate treats them
//! differently.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{Map, Value};

use super::models::{Role, User};

/// Claims carried in a token payload.
///
/// Issuers disagree on claim types, so each field is read on its own and a claim of
/// the wrong type is ignored rather than failing the whole payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenClaims {
    pub id: Option<String>,
    pub sub: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub name: Option<String>,
    /// Expiry in seconds since the epoch. Fractional NumericDates are truncated.
    pub exp: Option<i64>,
}

impl From<&Map<String, Value>> for TokenClaims {
    fn from(payload: &Map<String, Value>) -> Self {
        let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            id: payload.get("id").and_then(identifier),
            sub: payload.get("sub").and_then(identifier),
            email: text("email"),
            role: text("role"),
            name: text("name"),
            exp: payload.get("exp").and_then(numeric_date),
        }
    }
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn numeric_date(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        _ => None,
    }
}

impl TokenClaims {
    /// The role claim, if present and one we know.
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref()?.parse().ok()
    }

    /// A payload is trusted offline only if it carries an expiry that is still ahead of `now`.
    pub fn is_fresh_at(&self, now: i64) -> bool {
        matches!(self.exp, Some(exp) if exp > now)
    }

    /// Builds a session identity from the claims. Requires a known role.
    pub fn to_user(&self) -> Option<User> {
        Some(User {
            id: self
                .id
                .clone()
                .or_else(|| self.sub.clone())
                .unwrap_or_else(|| "1".to_string()),
            email: self.email.clone().unwrap_or_default(),
            role: self.role()?,
            name: self.name.clone(),
        })
    }
}

/// What a token's payload turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Not a three-segment token at all (e.g. an opaque session id).
    Opaque,
    /// Three segments, but the payload is not base64 JSON object.
    Corrupt,
    Claims(TokenClaims),
}

/// Classifies `token` by its payload segment.
pub fn inspect(token: &str) -> Payload {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Payload::Opaque;
    };

    let payload = payload.trim_end_matches('=');
    let Ok(bytes) = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
    else {
        return Payload::Corrupt;
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(payload)) => Payload::Claims(TokenClaims::from(&payload)),
        _ => Payload::Corrupt,
    }
}

/// Decodes the payload segment of `token`.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    match inspect(token) {
        Payload::Claims(claims) => Some(claims),
        Payload::Opaque | Payload::Corrupt => None,
    }
}

/// Role claim of `token`, without any defaulting.
pub fn role_from_token(token: &str) -> Option<Role> {
    decode_claims(token)?.role()
}

#[cfg(test)]
pub(crate) fn unsigned_token(payload: &Value) -> String {
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("eyJhbGciOiJIUzI1NiJ9.{body}.c2lnbmF0dXJl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_well_formed_token() {
        let token = unsigned_token(&json!({
            "id": "u-1",
            "email": "amy@school.io",
            "role": "teacher",
            "name": "Amy",
            "exp": 4_102_444_800i64
        }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.role(), Some(Role::Teacher));
        assert_eq!(claims.email.as_deref(), Some("amy@school.io"));
        assert_eq!(decode_claims(&token), Some(claims));
    }

    #[test]
    fn accepts_padded_and_standard_alphabet_payloads() {
        let payload = json!({"role": "admin", "note": "??>>"}).to_string();
        let standard = base64::engine::general_purpose::STANDARD.encode(&payload);
        let token = format!("h.{standard}.s");
        assert_eq!(role_from_token(&token), Some(Role::Admin));
    }

    #[test]
    fn numeric_ids_become_strings() {
        let token = unsigned_token(&json!({"id": 17, "role": "student"}));
        assert_eq!(decode_claims(&token).unwrap().id.as_deref(), Some("17"));
    }

    #[test]
    fn malformed_input_is_no_identity() {
        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("not json"));
        let array = format!("a.{}.c", URL_SAFE_NO_PAD.encode("[]"));
        for input in [
            "",
            "dummy_token_1700000000_abc",
            "a.b",
            "a.b.c.d",
            "a.!!!.c",
            not_json.as_str(),
            array.as_str(),
        ] {
            assert_eq!(decode_claims(input), None, "input: {input:?}");
            assert_eq!(role_from_token(input), None);
        }
    }

    #[test]
    fn inspect_distinguishes_opaque_from_corrupt() {
        assert_eq!(inspect("dummy_token_1700000000_abc"), Payload::Opaque);
        assert_eq!(inspect("a.b.c.d"), Payload::Opaque);
        assert_eq!(inspect("a.!!!.c"), Payload::Corrupt);
        let token = unsigned_token(&json!({"role": "student"}));
        assert!(matches!(inspect(&token), Payload::Claims(_)));
    }

    #[test]
    fn mistyped_claims_do_not_spoil_the_payload() {
        let token = unsigned_token(&json!({
            "id": "a-1",
            "role": "admin",
            "name": 7,
            "email": null,
            "exp": 4_102_444_800.5,
            "iat": "yesterday"
        }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.role(), Some(Role::Admin));
        assert_eq!(claims.name, None);
        assert_eq!(claims.email, None);
        assert_eq!(claims.exp, Some(4_102_444_800));
        assert!(claims.is_fresh_at(4_102_444_799));
    }

    #[test]
    fn non_numeric_expiry_is_no_expiry() {
        let token = unsigned_token(&json!({"role": "teacher", "exp": "soon"}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, None);
        assert!(!claims.is_fresh_at(0));
    }

    #[test]
    fn unknown_role_is_not_a_role() {
        let token = unsigned_token(&json!({"role": "superuser"}));
        assert!(decode_claims(&token).is_some());
        assert_eq!(role_from_token(&token), None);
    }

    #[test]
    fn freshness_requires_future_expiry() {
        let fresh = TokenClaims {
            exp: Some(1_000),
            ..Default::default()
        };
        assert!(fresh.is_fresh_at(999));
        assert!(!fresh.is_fresh_at(1_000));
        assert!(!TokenClaims::default().is_fresh_at(0));
    }

    #[test]
    fn to_user_requires_role_and_defaults_id() {
        let claims = TokenClaims {
            sub: Some("s-9".into()),
            role: Some("admin".into()),
            ..Default::default()
        };
        let user = claims.to_user().unwrap();
        assert_eq!(user.id, "s-9");
        assert_eq!(user.role, Role::Admin);

        let no_role = TokenClaims {
            id: Some("x".into()),
            ..Default::default()
        };
        assert_eq!(no_role.to_user(), None);
    }
}
