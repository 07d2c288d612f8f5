//! MongoDB access layer
//!
//! A thin typed wrapper over the driver, shaped around the handful of
//! operations the services actually perform: stamped inserts, filtered
//! reads, and conditional updates whose results the caller inspects.
//! Index declarations live on the schema types and are applied once at
//! startup, not on every collection access.

use bson::{doc, oid::ObjectId, Document};
use mongodb::{
    options::UpdateModifications, results::UpdateResult, Client, Collection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::Timestamps;
use crate::types::TaskhubError;

/// Where a document type is stored and which indexes that collection needs
pub trait CollectionSchema {
    const NAME: &'static str;

    fn indexes() -> Vec<IndexModel>;
}

/// Documents carrying write stamps maintained by the collection layer
pub trait Stamped {
    fn timestamps_mut(&mut self) -> &mut Timestamps;
}

/// Handle to one MongoDB database
#[derive(Clone)]
pub struct MongoClient {
    db: Database,
}

impl MongoClient {
    /// Connect and verify the server is reachable
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, TaskhubError> {
        info!("Connecting to MongoDB at {}", uri);

        // Bound server selection so an unreachable MongoDB fails fast
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| TaskhubError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| TaskhubError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self { db })
    }

    /// Apply a schema's index declarations. Called once per schema at startup.
    pub async fn ensure_indexes<T: CollectionSchema>(&self) -> Result<(), TaskhubError> {
        let indexes = T::indexes();
        if indexes.is_empty() {
            return Ok(());
        }

        self.db
            .collection::<Document>(T::NAME)
            .create_indexes(indexes)
            .await
            .map_err(|e| {
                TaskhubError::Database(format!("Failed to create indexes on {}: {}", T::NAME, e))
            })?;

        Ok(())
    }

    /// Typed handle to a schema's collection
    pub fn collection<T>(&self) -> MongoCollection<T>
    where
        T: CollectionSchema + Serialize + DeserializeOwned + Unpin + Send + Sync,
    {
        MongoCollection {
            inner: self.db.collection(T::NAME),
        }
    }
}

/// Typed collection exposing the operations the services use
#[derive(Debug, Clone)]
pub struct MongoCollection<T: Send + Sync> {
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Stamped,
{
    /// Insert a document, stamping its write instants first
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, TaskhubError> {
        item.timestamps_mut().stamp();

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| TaskhubError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| TaskhubError::Database("Failed to get inserted ID".into()))
    }

    /// First document matching the filter, if any
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, TaskhubError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| TaskhubError::Database(format!("Find failed: {}", e)))
    }

    /// All documents matching the filter, in store-native order
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, TaskhubError> {
        use futures_util::TryStreamExt;

        let cursor = self
            .inner
            .find(filter)
            .await
            .map_err(|e| TaskhubError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| TaskhubError::Database(format!("Cursor read failed: {}", e)))
    }

    /// Update one document, returning the raw result so callers can inspect
    /// matched and modified counts
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, TaskhubError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| TaskhubError::Database(format!("Update failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    // Collection behavior needs a running MongoDB instance; the filter and
    // stamping logic it composes with is exercised by the service-level tests.
}
