//! taskhub - multi-user task tracker with real-time notifications
//!
//! Users register, authenticate, create tasks, assign them, and mark them
//! done; the assignee receives a push notification over a WebSocket channel
//! when a task is created for them.
//!
//! ## Components
//!
//! - **auth**: password hashing, session tokens, and the session gate
//! - **registry**: live notification channels, one per identity
//! - **notify**: best-effort, at-most-once delivery through the registry
//! - **tasks**: task lifecycle (create, list, Pending -> Done)
//! - **server**: hyper HTTP listener and the WebSocket upgrade path
//! - **db**: MongoDB storage for users and tasks

pub mod auth;
pub mod config;
pub mod db;
pub mod notify;
pub mod registry;
pub mod routes;
pub mod server;
pub mod tasks;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TaskhubError};
