//! Shared JSON response and body helpers for route handlers

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::types::TaskhubError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Maximum accepted request body size
const MAX_BODY_BYTES: usize = 10240;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(full_body(json))
        .unwrap()
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response<BoxBody> {
    json_response(
        status,
        &ErrorResponse {
            error: message.into(),
        },
    )
}

/// Map a service error to its HTTP response. Store failures are logged by
/// the service layer; the client only sees a generic message.
pub fn error_to_response(err: TaskhubError) -> Response<BoxBody> {
    let status = err.status_code();
    let message = match &err {
        TaskhubError::Database(_) => "Internal server error".to_string(),
        TaskhubError::Internal(_) => "Internal server error".to_string(),
        other => other.to_string(),
    };
    // Collapse the 503 from the database layer into the documented 500
    let status = if status == StatusCode::SERVICE_UNAVAILABLE {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        status
    };
    error_response(status, message)
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Read and deserialize a JSON request body, enforcing the size cap
pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, TaskhubError> {
    let body = req
        .collect()
        .await
        .map_err(|e| TaskhubError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(TaskhubError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| TaskhubError::Http(format!("Invalid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failures_are_not_echoed_to_clients() {
        let resp = error_to_response(TaskhubError::Database(
            "connection refused to mongodb://internal-host:27017".into(),
        ));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_to_response(TaskhubError::BadRequest("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_to_response(TaskhubError::Forbidden("x".into())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            error_to_response(TaskhubError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
    }
}
