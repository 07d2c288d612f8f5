//! Write stamps shared by stored documents

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Creation and update instants, maintained by the collection layer: set on
/// insert, and refreshed by updates that include a `timestamps.updated_at`
/// clause.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Timestamps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl Timestamps {
    /// Stamp both instants with one consistent now
    pub fn stamp(&mut self) {
        let now = DateTime::now();
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }
}
