//! HTTP routes for registration and authentication
//!
//! - POST /register - Create an account (username + password)
//! - POST /login    - Authenticate and get a session token
//! - GET  /home     - Authenticated greeting, mainly a session smoke test

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{authenticate, hash_password, verify_password};
use crate::db::schemas::UserDoc;
use crate::routes::helpers::{
    error_response, json_response, parse_json_body, BoxBody, MessageResponse,
};
use crate::server::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /register
///
/// Flow:
/// 1. Validate required fields
/// 2. Check the username is not already taken
/// 3. Hash the password with argon2
/// 4. Store the credentials
async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: CredentialsRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e)),
    };

    if body.username.is_empty() || body.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: username, password",
        );
    }

    if body.password.len() < 8 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        );
    }

    let users = match &state.mongo {
        Some(m) => m.collection::<UserDoc>(),
        None => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Signup failed"),
    };

    // Check if the username already exists
    match users.find_one(doc! { "username": &body.username }).await {
        Ok(Some(_)) => {
            return error_response(StatusCode::BAD_REQUEST, "Username already taken");
        }
        Ok(None) => {}
        Err(e) => {
            warn!("User lookup failed during register: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Signup failed");
        }
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => {
            warn!("Password hashing failed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Signup failed");
        }
    };

    let user = UserDoc::new(body.username.clone(), password_hash);

    if let Err(e) = users.insert_one(user).await {
        // The unique index closes the check-then-insert race
        let error_str = e.to_string();
        if error_str.contains("duplicate key") || error_str.contains("E11000") {
            return error_response(StatusCode::BAD_REQUEST, "Username already taken");
        }
        warn!("User insert failed: {}", e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Signup failed");
    }

    info!("Registered new user: {}", body.username);

    json_response(
        StatusCode::OK,
        &MessageResponse {
            message: "Signup successful".into(),
        },
    )
}

/// POST /login
///
/// Fails with one uniform error whether the username is unknown or the
/// password is wrong, so callers cannot enumerate accounts.
async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: CredentialsRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e)),
    };

    if body.username.is_empty() || body.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: username, password",
        );
    }

    let users = match &state.mongo {
        Some(m) => m.collection::<UserDoc>(),
        None => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed"),
    };

    let user = match users
        .find_one(doc! { "username": &body.username, "is_active": true })
        .await
    {
        Ok(u) => u,
        Err(e) => {
            warn!("User lookup failed during login: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed");
        }
    };

    if !check_credentials(user.as_ref(), &body.password) {
        warn!("Login failed for {}", body.username);
        return invalid_credentials_response();
    }

    let token = match state.signer.issue(&body.username) {
        Ok(t) => t,
        Err(e) => {
            warn!("Token issue failed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed");
        }
    };

    info!("Login successful: {}", body.username);

    json_response(
        StatusCode::OK,
        &LoginResponse {
            token,
            username: body.username,
        },
    )
}

/// Uniform login verdict. An unknown username and a wrong password are
/// indistinguishable in the result, and both reach the same rejection path.
fn check_credentials(user: Option<&UserDoc>, password: &str) -> bool {
    match user {
        Some(u) => verify_password(password, &u.password_hash).unwrap_or(false),
        None => false,
    }
}

/// The single rejection response every failed login produces
fn invalid_credentials_response() -> Response<BoxBody> {
    error_response(StatusCode::UNAUTHORIZED, "Invalid credentials")
}

/// GET /home
async fn handle_home(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state.signer) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    json_response(
        StatusCode::OK,
        &MessageResponse {
            message: format!("Hello, {}", ctx.username),
        },
    )
}

// =============================================================================
// Router
// =============================================================================

/// Handle auth-related HTTP requests.
///
/// Returns Some(response) if the request was handled, None otherwise.
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    let response = match (method, path) {
        (&Method::POST, "/register") => handle_register(req, state).await,
        (&Method::POST, "/login") => handle_login(req, state).await,
        (&Method::GET, "/home") => handle_home(req, state).await,

        (_, "/register") | (_, "/login") | (_, "/home") => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }

        _ => return None,
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_unknown_user_and_wrong_password_both_rejected() {
        let hash = hash_password("correct horse battery").unwrap();
        let user = UserDoc::new("alice".into(), hash);

        // Both failure modes fall through to the same rejection path
        assert!(!check_credentials(None, "correct horse battery"));
        assert!(!check_credentials(Some(&user), "wrong password"));

        assert!(check_credentials(Some(&user), "correct horse battery"));
    }

    #[tokio::test]
    async fn test_rejected_login_response_is_uniform_401() {
        let resp = invalid_credentials_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"error":"Invalid credentials"}"#);
    }
}
