//! Notification channel: WebSocket upgrade and connection handling
//!
//! The handshake requires the same session token verification as the HTTP
//! routes. The token is taken from the query string (?token=...) first,
//! then the Authorization header. An upgrade without a valid token is
//! rejected with 401.
//!
//! After the upgrade, the connection registers a writer channel in the
//! registry and runs a read loop until the peer disconnects, the entry is
//! replaced by a newer registration, or the idle deadline passes. Client
//! messages are read and discarded; they only count as liveness.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::auth::{extract_token_from_header, extract_token_from_query};
use crate::server::http::AppState;

/// WebSocket type after upgrade
type HyperWebSocket =
    hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

/// Handle WebSocket upgrade for the notification channel
pub async fn handle_ws_upgrade(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let username = match authenticate_upgrade(&state, &req) {
        Ok(u) => u,
        Err(err_msg) => {
            warn!("Notification channel auth failed: {}", err_msg);
            return Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from(
                    r#"{"error":"Invalid or expired token"}"#.to_string(),
                )))
                .unwrap();
        }
    };

    match hyper_tungstenite::upgrade(req, None) {
        Ok((response, websocket)) => {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                match websocket.await {
                    Ok(ws) => {
                        run_connection(state, username, ws).await;
                    }
                    Err(e) => {
                        error!("WebSocket upgrade failed: {:?}", e);
                    }
                }
            });

            // Convert the upgrade response
            let (parts, _) = response.into_parts();
            Response::from_parts(parts, Full::new(Bytes::new()))
        }
        Err(e) => {
            error!("WebSocket upgrade error: {:?}", e);
            Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Full::new(Bytes::from(format!(
                    "WebSocket upgrade failed: {e}"
                ))))
                .unwrap()
        }
    }
}

/// Resolve the identity opening the channel.
///
/// Token sources, in order of precedence:
/// 1. Query string (?token=...)
/// 2. Authorization header
fn authenticate_upgrade(state: &AppState, req: &Request<Incoming>) -> Result<String, String> {
    let token = extract_token_from_query(req.uri().query()).or_else(|| {
        let auth_header = req
            .headers()
            .get(hyper::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        extract_token_from_header(auth_header).map(|t| t.to_string())
    });

    let token = token.ok_or_else(|| "No token provided".to_string())?;

    let result = state.signer.verify(&token);
    match result.claims {
        Some(claims) if result.valid => Ok(claims.sub),
        _ => Err(result.error.unwrap_or_else(|| "Invalid token".to_string())),
    }
}

/// Run one notification connection until it terminates.
///
/// Termination causes:
/// - peer close or read error
/// - a newer registration replacing this one (our receiver closes)
/// - idle deadline passing with no inbound traffic
async fn run_connection(state: Arc<AppState>, username: String, ws: HyperWebSocket) {
    let (mut sink, mut stream) = ws.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let connection_id = state.registry.register(&username, tx);

    info!(
        "Notification channel opened for {} (connection {})",
        username, connection_id
    );

    let idle_timeout = Duration::from_secs(state.args.ws_idle_timeout_seconds);
    let mut ping_ticker = interval(Duration::from_secs(state.args.ws_ping_interval_seconds));
    ping_ticker.tick().await; // first tick fires immediately
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // Outbound notification from the registry channel
            msg = rx.recv() => {
                match msg {
                    Some(text) => {
                        if sink.send(WsMessage::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    // Sender dropped: a newer registration replaced this one
                    None => {
                        debug!("Notification channel for {} superseded", username);
                        break;
                    }
                }
            }

            // Keep-alive and idle eviction
            _ = ping_ticker.tick() => {
                if last_activity.elapsed() >= idle_timeout {
                    info!(
                        "Evicting idle notification channel for {} (connection {})",
                        username, connection_id
                    );
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break;
                }
                if sink.send(WsMessage::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            // Inbound frame from the client: liveness only
            msg = stream.next() => {
                match msg {
                    Some(Ok(WsMessage::Close(_))) => {
                        debug!("Notification channel for {} closed by peer", username);
                        break;
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        last_activity = Instant::now();
                        let _ = sink.send(WsMessage::Pong(data)).await;
                    }
                    Some(Ok(_)) => {
                        // Text/binary/pong frames are discarded
                        last_activity = Instant::now();
                    }
                    Some(Err(e)) => {
                        debug!("Notification channel read error for {}: {}", username, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Conditional unregister: a no-op when a newer registration owns the slot
    if state.registry.unregister(&username, connection_id) {
        info!(
            "Notification channel closed for {} (connection {})",
            username, connection_id
        );
    }
}
