//! HTTP routes for taskhub

pub mod auth_routes;
pub mod health;
pub mod helpers;
pub mod task_routes;

pub use auth_routes::handle_auth_request;
pub use health::health_check;
pub use task_routes::handle_task_request;
