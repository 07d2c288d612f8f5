//! Session gate for protected routes
//!
//! Wraps every protected request: extracts the bearer token from the
//! Authorization header, verifies it, and yields the resolved identity.
//! On any failure the caller gets a ready-made 401 response. The message is
//! uniform regardless of which check failed, so a caller cannot distinguish
//! a missing token from an expired or forged one.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use tracing::warn;

use crate::auth::{extract_token_from_header, TokenSigner};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Identity attached to a request after the session gate passes
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub username: String,
}

/// Authenticate a protected HTTP request.
///
/// Returns the resolved identity, or a 401 response the handler must return
/// without touching the wrapped logic.
pub fn authenticate(
    req: &Request<Incoming>,
    signer: &TokenSigner,
) -> Result<AuthContext, Response<BoxBody>> {
    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match extract_token_from_header(auth_header) {
        Some(t) => t,
        None => {
            warn!("Request to {} without bearer token", req.uri().path());
            return Err(unauthorized_response());
        }
    };

    let result = signer.verify(token);
    match result.claims {
        Some(claims) if result.valid => Ok(AuthContext {
            username: claims.sub,
        }),
        _ => {
            warn!(
                "Token verification failed for {}: {}",
                req.uri().path(),
                result.error.as_deref().unwrap_or("unknown")
            );
            Err(unauthorized_response())
        }
    }
}

/// Uniform 401 response for any authentication failure
pub fn unauthorized_response() -> Response<BoxBody> {
    let body = r#"{"error":"Invalid or expired token"}"#;
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("Content-Type", "application/json")
        .body(
            Full::new(Bytes::from(body))
                .map_err(|never| match never {})
                .boxed(),
        )
        .unwrap()
}
