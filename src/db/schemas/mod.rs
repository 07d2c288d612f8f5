//! Database schemas for taskhub
//!
//! Defines MongoDB document structures for users and tasks.

mod task;
mod timestamps;
mod user;

pub use task::{TaskDoc, TaskStatus};
pub use timestamps::Timestamps;
pub use user::UserDoc;
