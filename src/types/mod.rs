//! Shared types for taskhub

mod error;

pub use error::{Result, TaskhubError};
