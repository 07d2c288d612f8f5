//! JWT session token handling
//!
//! Session tokens are signed, self-contained claim sets: the username plus
//! issue/expiry instants. Nothing is persisted; validity is determined solely
//! by the signature and the expiry at verification time.
//!
//! Security notes:
//! - Tokens are signed with HS256 (HMAC-SHA256)
//! - Default expiry is 24 hours
//! - JWT_SECRET should be a strong random value from environment

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::TaskhubError;

/// Payload stored in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token asserts
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Result of token verification
#[derive(Debug)]
pub struct TokenVerification {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenVerification {
    pub fn valid(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }
}

/// Session token signer and verifier
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
    expiry_seconds: u64,
}

impl TokenSigner {
    /// Create a new token signer
    ///
    /// Returns an error if the secret is empty or too short.
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, TaskhubError> {
        if secret.is_empty() {
            return Err(TaskhubError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < 32 {
            return Err(TaskhubError::Config(
                "JWT_SECRET must be at least 32 characters".into(),
            ));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Create a signer for dev mode (fixed insecure secret)
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            expiry_seconds: 86400,
        }
    }

    /// Issue a session token for an authenticated username
    pub fn issue(&self, username: &str) -> Result<String, TaskhubError> {
        if username.is_empty() {
            return Err(TaskhubError::Auth(
                "Cannot issue token for empty username".into(),
            ));
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TaskhubError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TaskhubError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verify and decode a session token
    ///
    /// A token is valid iff the signature verifies against the process secret,
    /// the expiry is strictly in the future, and it carries a non-empty
    /// username claim.
    pub fn verify(&self, token: &str) -> TokenVerification {
        let mut validation = Validation::default();
        validation.leeway = 0;

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(token_data) => {
                if token_data.claims.sub.is_empty() {
                    return TokenVerification::invalid("Missing username claim");
                }
                TokenVerification::valid(token_data.claims)
            }
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let error_msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidToken => "Invalid token",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Token validation failed",
                };
                TokenVerification::invalid(error_msg)
            }
        }
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    // Support "Bearer <token>" format
    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    // Also support raw token (for flexibility)
    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

/// Extract token from a URL query string (?token=...)
pub fn extract_token_from_query(query: Option<&str>) -> Option<String> {
    let query = query?;
    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            if key == "token" && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer() -> TokenSigner {
        TokenSigner::new(
            "test-secret-that-is-at-least-32-characters-long".into(),
            3600,
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let signer = test_signer();

        let token = signer.issue("alice").unwrap();
        assert!(!token.is_empty());

        let result = signer.verify(&token);
        assert!(result.valid);
        assert_eq!(result.claims.unwrap().sub, "alice");
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = test_signer();

        // Forge a token whose expiry is already in the past, signed with the
        // same secret
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            sub: "alice".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret-that-is-at-least-32-characters-long".as_bytes()),
        )
        .unwrap();

        let result = signer.verify(&token);
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Token expired"));
    }

    #[test]
    fn test_empty_subject_claim_rejected() {
        let signer = test_signer();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            sub: String::new(),
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret-that-is-at-least-32-characters-long".as_bytes()),
        )
        .unwrap();

        let result = signer.verify(&token);
        assert!(!result.valid);
    }

    #[test]
    fn test_invalid_token() {
        let signer = test_signer();

        let result = signer.verify("invalid-token");
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_wrong_secret() {
        let signer1 = test_signer();
        let signer2 = TokenSigner::new(
            "different-secret-that-is-at-least-32-characters".into(),
            3600,
        )
        .unwrap();

        let token = signer1.issue("alice").unwrap();

        // Verify with wrong secret should fail
        let result = signer2.verify(&token);
        assert!(!result.valid);
    }

    #[test]
    fn test_empty_username_rejected_at_issue() {
        let signer = test_signer();
        assert!(signer.issue("").is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        // Bearer format
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );

        // Raw token
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));

        // Empty cases
        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);

        // Invalid format
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }

    #[test]
    fn test_extract_token_from_query() {
        assert_eq!(
            extract_token_from_query(Some("token=abc123")),
            Some("abc123".into())
        );

        assert_eq!(
            extract_token_from_query(Some("foo=bar&token=abc123")),
            Some("abc123".into())
        );

        assert_eq!(extract_token_from_query(Some("foo=bar")), None);
        assert_eq!(extract_token_from_query(Some("token=")), None);
        assert_eq!(extract_token_from_query(None), None);
    }

    #[test]
    fn test_secret_validation() {
        // Too short
        assert!(TokenSigner::new("short".into(), 3600).is_err());

        // Empty
        assert!(TokenSigner::new("".into(), 3600).is_err());

        // Valid
        assert!(TokenSigner::new("this-secret-is-at-least-32-chars-long".into(), 3600).is_ok());
    }
}
