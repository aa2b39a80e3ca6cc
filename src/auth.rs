//! Internal request authentication.
//!
//! Trusted internal callers (for example the HTTP remote source loading
//! options on behalf of a signed-in user) attach an `X-Internal-User` header
//! carrying a signed token:
//!
//! ```text
//! base64url(json claims) "." base64url(HMAC-SHA256(secret, encoded claims))
//! ```
//!
//! The claims may bind the token to a method, path, host and body hash. A
//! request without the header is passed through untouched.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the header carrying the signed token.
pub const HEADER_NAME: &str = "X-Internal-User";

/// Default allowed clock skew for the `iat` claim, in seconds.
pub const DEFAULT_SKEW_SECS: u64 = 60;

type HmacSha256 = Hmac<Sha256>;

/// Errors produced while signing or verifying internal tokens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token is malformed, badly signed or outside the allowed skew.
    #[error("Internal auth failed: {0}")]
    InvalidToken(String),

    #[error("Method mismatch")]
    MethodMismatch,

    #[error("Path mismatch")]
    PathMismatch,

    #[error("Host mismatch")]
    HostMismatch,

    #[error("Body hash mismatch")]
    BodyHashMismatch,

    /// The authenticated user lacks a permission listed in the token.
    #[error("Forbidden (permission: {0})")]
    Forbidden(String),
}

impl AuthError {
    /// HTTP status code to answer the request with.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Forbidden(_) => 403,
            _ => 401,
        }
    }
}

/// Claims carried by an internal token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalClaims {
    /// Identifier of the user the request acts for.
    #[serde(deserialize_with = "uid_from_scalar")]
    pub uid: String,
    /// Bound HTTP method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<String>,
    /// Bound request path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// Bound scheme and host, e.g. `https://app.example.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<String>,
    /// Hex SHA-256 of the request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bh: Option<String>,
    /// Permissions the user must hold.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub perms: Vec<String>,
    /// Issued-at, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

impl InternalClaims {
    /// Claims for a user with no bindings.
    pub fn for_user(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            m: None,
            p: None,
            h: None,
            bh: None,
            perms: Vec::new(),
            iat: None,
        }
    }
}

// User ids are commonly numeric on the issuing side.
fn uid_from_scalar<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) if !s.is_empty() => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("uid must be a non-empty string or a number")),
    }
}

/// Hex SHA-256 digest of a request body.
pub fn body_hash(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn mac_for(secret: &[u8]) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(secret).map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Encode and sign claims.
pub fn encode_token(claims: &InternalClaims, secret: &[u8]) -> Result<String, AuthError> {
    let json = serde_json::to_vec(claims).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    let encoded = URL_SAFE_NO_PAD.encode(json);

    let mut mac = mac_for(secret)?;
    mac.update(encoded.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", encoded, signature))
}

/// Verify a token's signature and decode its claims.
pub fn decode_token(token: &str, secret: &[u8]) -> Result<InternalClaims, AuthError> {
    let (encoded, signature) = token
        .trim()
        .split_once('.')
        .ok_or_else(|| AuthError::InvalidToken("malformed token".to_string()))?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| AuthError::InvalidToken("malformed signature".to_string()))?;

    let mut mac = mac_for(secret)?;
    mac.update(encoded.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AuthError::InvalidToken("bad signature".to_string()))?;

    let json = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| AuthError::InvalidToken("malformed payload".to_string()))?;

    serde_json::from_slice(&json).map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// The parts of an incoming (or outgoing) request a token can be bound to.
#[derive(Debug, Clone, Copy)]
pub struct InternalRequest<'a> {
    /// HTTP method, any case.
    pub method: &'a str,
    /// Path without the query string, e.g. `/api/users`.
    pub path: &'a str,
    /// Scheme and host (with a non-default port), e.g. `https://app.example.com`.
    pub host: &'a str,
    /// Raw request body.
    pub body: &'a [u8],
}

/// Decides whether a user holds a permission.
pub trait PermissionChecker: Send + Sync {
    fn can(&self, uid: &str, permission: &str) -> bool;
}

/// Grants every permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn can(&self, _uid: &str, _permission: &str) -> bool {
        true
    }
}

impl<F> PermissionChecker for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn can(&self, uid: &str, permission: &str) -> bool {
        self(uid, permission)
    }
}

/// A user authenticated from a valid internal token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub uid: String,
    pub permissions: Vec<String>,
}

/// Verifies the internal auth header on incoming requests.
pub struct InternalAuthenticator<P = AllowAll> {
    secret: Vec<u8>,
    skew_secs: u64,
    checker: P,
}

impl InternalAuthenticator<AllowAll> {
    /// Create an authenticator that grants every listed permission.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self::with_checker(secret, AllowAll)
    }
}

impl<P: PermissionChecker> InternalAuthenticator<P> {
    /// Create an authenticator with a permission checker.
    pub fn with_checker(secret: impl Into<Vec<u8>>, checker: P) -> Self {
        Self {
            secret: secret.into(),
            skew_secs: DEFAULT_SKEW_SECS,
            checker,
        }
    }

    /// Set the allowed clock skew for `iat`.
    pub fn with_skew(mut self, skew_secs: u64) -> Self {
        self.skew_secs = skew_secs;
        self
    }

    /// Authenticate a request.
    ///
    /// Returns `Ok(None)` when no header is present, so the request continues
    /// unauthenticated.
    pub fn authenticate(
        &self,
        header: Option<&str>,
        request: &InternalRequest<'_>,
        now: u64,
    ) -> Result<Option<AuthenticatedUser>, AuthError> {
        let Some(token) = header.filter(|h| !h.trim().is_empty()) else {
            return Ok(None);
        };

        let claims = decode_token(token, &self.secret).map_err(|e| {
            warn!("Rejected internal token: {}", e);
            e
        })?;

        if let Some(iat) = claims.iat {
            if now.abs_diff(iat) > self.skew_secs {
                return Err(AuthError::InvalidToken("token expired".to_string()));
            }
        }

        if let Some(method) = &claims.m {
            if !method.eq_ignore_ascii_case(request.method) {
                return Err(AuthError::MethodMismatch);
            }
        }

        if claims.p.as_deref().is_some_and(|p| p != request.path) {
            return Err(AuthError::PathMismatch);
        }

        if claims.h.as_deref().is_some_and(|h| h != request.host) {
            return Err(AuthError::HostMismatch);
        }

        if let Some(expected) = claims.bh.as_deref().filter(|bh| !bh.is_empty()) {
            if !expected.eq_ignore_ascii_case(&body_hash(request.body)) {
                return Err(AuthError::BodyHashMismatch);
            }
        }

        if let Some(denied) = claims.perms.iter().find(|perm| !self.checker.can(&claims.uid, perm)) {
            return Err(AuthError::Forbidden(denied.clone()));
        }

        debug!(uid = %claims.uid, "Internal request authenticated");
        Ok(Some(AuthenticatedUser {
            uid: claims.uid,
            permissions: claims.perms,
        }))
    }
}

/// Signs outgoing requests on behalf of a user.
#[derive(Clone)]
pub struct InternalSigner {
    secret: Vec<u8>,
    uid: String,
    perms: Vec<String>,
}

impl std::fmt::Debug for InternalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalSigner")
            .field("uid", &self.uid)
            .field("perms", &self.perms)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl InternalSigner {
    /// Create a signer acting for `uid`.
    pub fn new(secret: impl Into<Vec<u8>>, uid: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            uid: uid.into(),
            perms: Vec::new(),
        }
    }

    /// Require permissions on the receiving side.
    pub fn with_permissions(mut self, perms: Vec<String>) -> Self {
        self.perms = perms;
        self
    }

    /// Produce a token bound to the given request.
    ///
    /// The body hash is only bound when the body is non-empty.
    pub fn sign(&self, request: &InternalRequest<'_>, now: u64) -> Result<String, AuthError> {
        let claims = InternalClaims {
            uid: self.uid.clone(),
            m: Some(request.method.to_ascii_uppercase()),
            p: Some(request.path.to_string()),
            h: Some(request.host.to_string()),
            bh: (!request.body.is_empty()).then(|| body_hash(request.body)),
            perms: self.perms.clone(),
            iat: Some(now),
        };
        encode_token(&claims, &self.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";
    const NOW: u64 = 1_700_000_000;

    fn get_users() -> InternalRequest<'static> {
        InternalRequest {
            method: "GET",
            path: "/api/users",
            host: "https://app.example.com",
            body: b"",
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let mut claims = InternalClaims::for_user("42");
        claims.perms = vec!["users.view".to_string()];
        let token = encode_token(&claims, SECRET).unwrap();
        assert_eq!(decode_token(&token, SECRET).unwrap(), claims);
    }

    #[test]
    fn test_numeric_uid_accepted() {
        let encoded = URL_SAFE_NO_PAD.encode(br#"{"uid":7}"#);
        let mut mac = mac_for(SECRET).unwrap();
        mac.update(encoded.as_bytes());
        let token = format!(
            "{}.{}",
            encoded,
            URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
        );
        assert_eq!(decode_token(&token, SECRET).unwrap().uid, "7");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = encode_token(&InternalClaims::for_user("1"), SECRET).unwrap();
        let err = decode_token(&token, b"other").unwrap_err();
        assert_eq!(err.to_string(), "Internal auth failed: bad signature");
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(matches!(
            decode_token("no-dot-here", SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_missing_header_passes_through() {
        let auth = InternalAuthenticator::new(SECRET);
        assert_eq!(auth.authenticate(None, &get_users(), NOW).unwrap(), None);
        assert_eq!(auth.authenticate(Some(""), &get_users(), NOW).unwrap(), None);
    }

    #[test]
    fn test_signed_request_authenticates() {
        let signer = InternalSigner::new(SECRET, "42");
        let token = signer.sign(&get_users(), NOW).unwrap();
        let user = InternalAuthenticator::new(SECRET)
            .authenticate(Some(&token), &get_users(), NOW + 5)
            .unwrap()
            .unwrap();
        assert_eq!(user.uid, "42");
    }

    #[test]
    fn test_binding_mismatches() {
        let token = InternalSigner::new(SECRET, "42").sign(&get_users(), NOW).unwrap();
        let auth = InternalAuthenticator::new(SECRET);

        let post = InternalRequest { method: "POST", ..get_users() };
        assert_eq!(
            auth.authenticate(Some(&token), &post, NOW).unwrap_err(),
            AuthError::MethodMismatch
        );

        let other_path = InternalRequest { path: "/api/teams", ..get_users() };
        assert_eq!(
            auth.authenticate(Some(&token), &other_path, NOW).unwrap_err(),
            AuthError::PathMismatch
        );

        let other_host = InternalRequest { host: "https://evil.example.com", ..get_users() };
        assert_eq!(
            auth.authenticate(Some(&token), &other_host, NOW).unwrap_err(),
            AuthError::HostMismatch
        );
    }

    #[test]
    fn test_body_hash_bound() {
        let request = InternalRequest { method: "post", body: b"{\"a\":1}", ..get_users() };
        let token = InternalSigner::new(SECRET, "42").sign(&request, NOW).unwrap();
        let auth = InternalAuthenticator::new(SECRET);

        assert!(auth.authenticate(Some(&token), &request, NOW).is_ok());

        let tampered = InternalRequest { body: b"{\"a\":2}", ..request };
        let err = auth.authenticate(Some(&token), &tampered, NOW).unwrap_err();
        assert_eq!(err.to_string(), "Body hash mismatch");
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = InternalSigner::new(SECRET, "42").sign(&get_users(), NOW).unwrap();
        let auth = InternalAuthenticator::new(SECRET).with_skew(60);
        assert!(auth.authenticate(Some(&token), &get_users(), NOW + 60).is_ok());
        assert!(matches!(
            auth.authenticate(Some(&token), &get_users(), NOW + 61),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_permission_denied_is_403() {
        let signer = InternalSigner::new(SECRET, "42")
            .with_permissions(vec!["users.view".to_string(), "users.admin".to_string()]);
        let token = signer.sign(&get_users(), NOW).unwrap();

        let auth = InternalAuthenticator::with_checker(SECRET, |_uid: &str, perm: &str| {
            perm == "users.view"
        });
        let err = auth.authenticate(Some(&token), &get_users(), NOW).unwrap_err();
        assert_eq!(err, AuthError::Forbidden("users.admin".to_string()));
        assert_eq!(err.to_string(), "Forbidden (permission: users.admin)");
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_body_hash_is_sha256_hex() {
        assert_eq!(
            body_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_signer_debug_redacts_secret() {
        let debug = format!("{:?}", InternalSigner::new(SECRET, "42"));
        assert!(!debug.contains("test-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
