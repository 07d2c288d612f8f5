//! Database layer for taskhub
//!
//! Provides MongoDB storage for users and tasks.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{TaskDoc, TaskStatus, Timestamps, UserDoc};
