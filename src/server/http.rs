//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one spawned task per accepted connection.
//! Routing is a plain match over (method, path); auth and task routes are
//! delegated to their own sub-routers.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::TokenSigner;
use crate::config::Args;
use crate::db::MongoClient;
use crate::registry::ConnectionRegistry;
use crate::routes;
use crate::server::websocket;
use crate::types::TaskhubError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// Registry of live notification channels
    pub registry: Arc<ConnectionRegistry>,
    /// Session token signer/verifier
    pub signer: TokenSigner,
}

impl AppState {
    pub fn new(args: Args, mongo: Option<MongoClient>, signer: TokenSigner) -> Self {
        Self {
            args,
            mongo,
            registry: Arc::new(ConnectionRegistry::new()),
            signer,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), TaskhubError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "taskhub listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let origin = req
        .headers()
        .get(hyper::header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    info!("[{}] {} {}", addr, method, path);

    // CORS preflight
    if method == Method::OPTIONS {
        return Ok(with_cors(preflight_response(), &state, origin.as_deref()));
    }

    let response = match (&method, path.as_str()) {
        // Health check endpoints
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Notification channel upgrade
        (&Method::GET, "/ws") => {
            if hyper_tungstenite::is_upgrade_request(&req) {
                to_boxed(websocket::handle_ws_upgrade(state.clone(), req).await)
            } else {
                bad_request_response("Notification endpoint requires WebSocket upgrade")
            }
        }

        _ => {
            // Delegate to the sub-routers; each consumes the request when
            // the path belongs to it
            if matches!(path.as_str(), "/register" | "/login" | "/home") {
                match routes::handle_auth_request(req, Arc::clone(&state)).await {
                    Some(resp) => resp,
                    None => not_found_response(&path),
                }
            } else if path == "/tasks" || path.starts_with("/tasks/") {
                match routes::handle_task_request(req, Arc::clone(&state)).await {
                    Some(resp) => resp,
                    None => not_found_response(&path),
                }
            } else {
                not_found_response(&path)
            }
        }
    };

    Ok(with_cors(response, &state, origin.as_deref()))
}

/// Append CORS headers when the request origin is allowed
fn with_cors(
    mut response: Response<BoxBody>,
    state: &AppState,
    origin: Option<&str>,
) -> Response<BoxBody> {
    if let Some(origin) = origin {
        if state.args.origin_allowed(origin) {
            if let Ok(value) = HeaderValue::from_str(origin) {
                let headers = response.headers_mut();
                headers.insert("Access-Control-Allow-Origin", value);
                headers.insert(
                    "Access-Control-Allow-Credentials",
                    HeaderValue::from_static("true"),
                );
            }
        }
    }
    response
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<BoxBody> {
    to_boxed(
        Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header(
                "Access-Control-Allow-Methods",
                "GET, POST, PUT, PATCH, DELETE, OPTIONS",
            )
            .header(
                "Access-Control-Allow-Headers",
                "Origin, Content-Type, Accept, Authorization, X-Requested-With",
            )
            .header("Access-Control-Max-Age", "43200")
            .body(Full::new(Bytes::new()))
            .unwrap(),
    )
}

/// Not found response
fn not_found_response(path: &str) -> Response<BoxBody> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    to_boxed(
        Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap(),
    )
}

/// Bad request response
fn bad_request_response(message: &str) -> Response<BoxBody> {
    let body = serde_json::json!({
        "error": "Bad Request",
        "message": message,
    });

    to_boxed(
        Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap(),
    )
}
