//! Task document schema
//!
//! A task carries a creator, an assignee, and a two-state lifecycle:
//! Pending at creation, Done once the assignee completes it. Done is
//! terminal.

use bson::{doc, oid::ObjectId};
use mongodb::{options::IndexOptions, IndexModel};
use serde::{Deserialize, Serialize};

use crate::db::mongo::{CollectionSchema, Stamped};
use crate::db::schemas::Timestamps;

/// Task lifecycle status
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TaskStatus {
    #[default]
    Pending,
    Done,
}

impl TaskStatus {
    /// BSON string form, used in update filters
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Done => "Done",
        }
    }
}

/// Task document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TaskDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Write stamps
    #[serde(default)]
    pub timestamps: Timestamps,

    /// Short task title
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Username of the assignee; never empty (defaults to the creator)
    pub assigned_to: String,

    /// Username of the creator (provenance)
    pub created_by: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: TaskStatus,

    /// Creation instant (Unix seconds)
    pub created_at: i64,
}

impl TaskDoc {
    /// Create a new pending task. An empty assignee defaults to the creator.
    pub fn new(title: String, description: String, assigned_to: String, created_by: String) -> Self {
        let assigned_to = if assigned_to.is_empty() {
            created_by.clone()
        } else {
            assigned_to
        };

        Self {
            _id: None,
            timestamps: Timestamps::default(),
            title,
            description,
            assigned_to,
            created_by,
            status: TaskStatus::Pending,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

impl CollectionSchema for TaskDoc {
    const NAME: &'static str = "tasks";

    fn indexes() -> Vec<IndexModel> {
        vec![
            // Assignee index backs the list-my-tasks query
            IndexModel::builder()
                .keys(doc! { "assigned_to": 1 })
                .options(
                    IndexOptions::builder()
                        .name("assigned_to_index".to_string())
                        .build(),
                )
                .build(),
            // Creator index backs provenance lookups
            IndexModel::builder()
                .keys(doc! { "created_by": 1 })
                .options(
                    IndexOptions::builder()
                        .name("created_by_index".to_string())
                        .build(),
                )
                .build(),
        ]
    }
}

impl Stamped for TaskDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_assignee_defaults_to_creator() {
        let task = TaskDoc::new(
            "Write report".into(),
            "Quarterly numbers".into(),
            "".into(),
            "alice".into(),
        );
        assert_eq!(task.assigned_to, "alice");
        assert_eq!(task.created_by, "alice");
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_explicit_assignee_kept() {
        let task = TaskDoc::new("Review PR".into(), "".into(), "bob".into(), "alice".into());
        assert_eq!(task.assigned_to, "bob");
        assert_eq!(task.created_by, "alice");
    }

    #[test]
    fn test_status_serializes_as_string() {
        let json = serde_json::to_string(&TaskStatus::Pending).unwrap();
        assert_eq!(json, "\"Pending\"");
        let json = serde_json::to_string(&TaskStatus::Done).unwrap();
        assert_eq!(json, "\"Done\"");
    }
}
