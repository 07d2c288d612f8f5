//! Task lifecycle management
//!
//! Creates tasks, defaults fields, transitions status, enforces the
//! assignee-only completion rule, and triggers notification on creation.

use bson::{doc, oid::ObjectId, DateTime, Document};
use tracing::{info, warn};

use crate::db::schemas::{TaskDoc, TaskStatus};
use crate::db::MongoClient;
use crate::notify::Notifier;
use crate::types::{Result, TaskhubError};

/// Service owning task creation, listing, and status transitions
#[derive(Clone)]
pub struct TaskService {
    mongo: MongoClient,
    notifier: Notifier,
}

impl TaskService {
    pub fn new(mongo: MongoClient, notifier: Notifier) -> Self {
        Self { mongo, notifier }
    }

    /// Create a task and notify the assignee.
    ///
    /// An empty assignee defaults to the creator. On persistence failure no
    /// notification is sent. Notification delivery is best-effort; a missing
    /// or dead channel does not affect the result.
    pub async fn create(
        &self,
        creator: &str,
        title: &str,
        description: &str,
        assigned_to: &str,
    ) -> Result<TaskDoc> {
        if title.is_empty() {
            return Err(TaskhubError::BadRequest("Title is required".into()));
        }

        let mut task = TaskDoc::new(
            title.to_string(),
            description.to_string(),
            assigned_to.to_string(),
            creator.to_string(),
        );

        let id = self
            .mongo
            .collection::<TaskDoc>()
            .insert_one(task.clone())
            .await?;
        task._id = Some(id);

        info!(
            "Task {} created by {} for {}",
            id, task.created_by, task.assigned_to
        );

        self.notifier.notify(
            &task.assigned_to,
            &format!("New task assigned to you: {}", task.title),
        );

        Ok(task)
    }

    /// All tasks assigned to a user, in store-native order (no sort applied)
    pub async fn list_for_user(&self, username: &str) -> Result<Vec<TaskDoc>> {
        self.mongo
            .collection::<TaskDoc>()
            .find_many(doc! { "assigned_to": username })
            .await
    }

    /// Transition a task to Done.
    ///
    /// Only the assignee may complete a task; creators who are not also the
    /// assignee get Forbidden. A missing id and an already-Done task are
    /// reported identically as NotFound. The transition itself is a single
    /// conditional update, so concurrent calls resolve deterministically:
    /// exactly one observes a modified document.
    pub async fn mark_done(&self, username: &str, task_id: &str) -> Result<()> {
        let object_id = ObjectId::parse_str(task_id)
            .map_err(|_| TaskhubError::BadRequest("Invalid task ID format".into()))?;

        let collection = self.mongo.collection::<TaskDoc>();

        let task = collection
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or_else(|| TaskhubError::NotFound("Task not found or already done".into()))?;

        authorize_completion(&task, username)?;

        let result = collection
            .update_one(
                done_transition_filter(object_id),
                doc! {
                    "$set": {
                        "status": TaskStatus::Done.as_str(),
                        "timestamps.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;

        if result.modified_count == 0 {
            // Raced with another completion; Done is terminal either way
            return Err(TaskhubError::NotFound(
                "Task not found or already done".into(),
            ));
        }

        info!("Task {} marked done by {}", task_id, username);
        Ok(())
    }
}

/// Only the assignee may complete a task. Creator status grants nothing here.
fn authorize_completion(task: &TaskDoc, username: &str) -> Result<()> {
    if task.assigned_to != username {
        warn!(
            "{} attempted to complete a task assigned to {}",
            username, task.assigned_to
        );
        return Err(TaskhubError::Forbidden(
            "You can only update your assigned tasks".into(),
        ));
    }
    Ok(())
}

/// Filter for the Pending -> Done compare-and-set. Matching on the current
/// status closes the window where two callers both observe Pending.
fn done_transition_filter(id: ObjectId) -> Document {
    doc! { "_id": id, "status": TaskStatus::Pending.as_str() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    #[test]
    fn test_done_transition_filter_pins_pending_status() {
        let id = ObjectId::new();
        let filter = done_transition_filter(id);

        assert_eq!(filter.get_object_id("_id").unwrap(), id);
        // A Done task can never match, so repeated completions modify nothing
        assert_eq!(filter.get_str("status").unwrap(), "Pending");
    }

    #[test]
    fn test_non_assignee_completion_is_forbidden() {
        // The creator assigned the task away and may no longer complete it
        let task = TaskDoc::new("Review PR".into(), "".into(), "bob".into(), "alice".into());

        let err = authorize_completion(&task, "alice").unwrap_err();
        assert!(matches!(err, TaskhubError::Forbidden(_)));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_assignee_may_complete() {
        let task = TaskDoc::new("Review PR".into(), "".into(), "bob".into(), "alice".into());
        assert!(authorize_completion(&task, "bob").is_ok());
    }

    #[test]
    fn test_stranger_completion_is_forbidden() {
        let task = TaskDoc::new("Review PR".into(), "".into(), "bob".into(), "alice".into());
        assert!(authorize_completion(&task, "mallory").is_err());
    }
}
