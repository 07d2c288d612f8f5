//! Configuration for taskhub
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// taskhub - multi-user task tracker with real-time notifications
#[derive(Parser, Debug, Clone)]
#[command(name = "taskhub")]
#[command(about = "Task tracker with WebSocket assignment notifications")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "taskhub")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (default: 24 hours)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "86400")]
    pub jwt_expiry_seconds: u64,

    /// Allowed CORS origins, comma-separated
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        default_value = "http://localhost:3000,http://localhost:5173"
    )]
    pub allowed_origins: String,

    /// Idle timeout for notification WebSocket connections, in seconds.
    /// A connection with no inbound traffic for this long is evicted.
    #[arg(long, env = "WS_IDLE_TIMEOUT_SECONDS", default_value = "300")]
    pub ws_idle_timeout_seconds: u64,

    /// Interval between server keep-alive pings on notification connections
    #[arg(long, env = "WS_PING_INTERVAL_SECONDS", default_value = "30")]
    pub ws_ping_interval_seconds: u64,

    /// Enable development mode (allows missing JWT secret and MongoDB)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Check whether an Origin header value is allowed
    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .any(|o| o == "*" || o == origin)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.ws_ping_interval_seconds == 0 {
            return Err("WS_PING_INTERVAL_SECONDS must be greater than zero".to_string());
        }

        if self.ws_idle_timeout_seconds <= self.ws_ping_interval_seconds {
            return Err(
                "WS_IDLE_TIMEOUT_SECONDS must be greater than WS_PING_INTERVAL_SECONDS".to_string(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_from(argv: &[&str]) -> Args {
        let mut full = vec!["taskhub"];
        full.extend_from_slice(argv);
        Args::parse_from(full)
    }

    #[test]
    fn test_origin_allowed() {
        let args = args_from(&["--jwt-secret", "0123456789abcdef0123456789abcdef"]);
        assert!(args.origin_allowed("http://localhost:3000"));
        assert!(args.origin_allowed("http://localhost:5173"));
        assert!(!args.origin_allowed("http://evil.example.com"));
    }

    #[test]
    fn test_validate_requires_secret_in_production() {
        let args = args_from(&[]);
        assert!(args.validate().is_err());

        let args = args_from(&["--dev-mode"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_timer_relationship() {
        let args = args_from(&[
            "--dev-mode",
            "--ws-idle-timeout-seconds",
            "10",
            "--ws-ping-interval-seconds",
            "30",
        ]);
        assert!(args.validate().is_err());
    }
}
