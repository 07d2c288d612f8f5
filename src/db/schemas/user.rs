//! User document schema
//!
//! Stores usernames and password hashes. The clear-text password is never
//! persisted; verification is by re-hash-and-compare.

use bson::{doc, oid::ObjectId};
use mongodb::{options::IndexOptions, IndexModel};
use serde::{Deserialize, Serialize};

use crate::db::mongo::{CollectionSchema, Stamped};
use crate::db::schemas::Timestamps;

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Write stamps
    #[serde(default)]
    pub timestamps: Timestamps,

    /// Unique username, case-sensitive, immutable after registration
    pub username: String,

    /// Argon2 password hash (PHC format)
    pub password_hash: String,

    /// Whether the user account is active
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new user document
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            _id: None,
            timestamps: Timestamps::default(),
            username,
            password_hash,
            is_active: true,
        }
    }
}

impl CollectionSchema for UserDoc {
    const NAME: &'static str = "users";

    fn indexes() -> Vec<IndexModel> {
        // Unique username index; closes the check-then-insert race at register
        vec![IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("username_unique".to_string())
                    .build(),
            )
            .build()]
    }
}

impl Stamped for UserDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
