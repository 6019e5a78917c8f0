//! Remote document backend adapter.
//!
//! The sync engine talks to the backend through the object-safe
//! [`DocumentBackend`] trait: per-collection CRUD plus push
//! subscriptions delivering full ordered snapshots. Two adapters ship
//! with the crate:
//!
//! - [`HttpBackend`]: a REST document store, with subscriptions
//!   realized by polling the list endpoint
//! - [`MemoryBackend`]: an in-process store used by tests and demos

pub mod error;
pub mod http;
pub mod memory;

pub use error::BackendError;
pub use http::HttpBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::Collection;

/// Entity fields on the wire, without the id.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// One item of a collection snapshot: `{ id, ...fields }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Flatten into a single JSON object with the id inlined, the shape
    /// typed entities deserialize from.
    pub fn into_value(self) -> serde_json::Value {
        let mut obj = self.fields;
        obj.insert("id".to_string(), serde_json::Value::String(self.id));
        serde_json::Value::Object(obj)
    }
}

/// One notification on a subscription feed: the full ordered snapshot
/// of a collection, or a stream failure.
pub type SnapshotResult = Result<Vec<Document>, BackendError>;

/// A live feed of collection snapshots.
///
/// Dropping the subscription closes the channel; the adapter stops
/// producing notifications once it observes the closed receiver.
pub struct BackendSubscription {
    pub snapshots: mpsc::Receiver<SnapshotResult>,
}

/// A document store offering per-collection CRUD and push subscriptions.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Create a document and return the backend-assigned id.
    async fn add_document(
        &self,
        collection: Collection,
        fields: Fields,
    ) -> Result<String, BackendError>;

    /// Merge `fields` into an existing document. Fields not present in
    /// the patch are left untouched.
    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), BackendError>;

    /// Permanently remove a document. Removing an absent id succeeds.
    async fn delete_document(&self, collection: Collection, id: &str)
        -> Result<(), BackendError>;

    /// Establish a live feed for one collection. Every notification is
    /// a whole snapshot, ordered by the collection's order field when
    /// it has one.
    async fn subscribe(&self, collection: Collection) -> Result<BackendSubscription, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_flattens_fields() {
        let json = r#"{"id":"r1","teamId":"t1","points":50}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.id, "r1");
        assert_eq!(doc.fields["teamId"], "t1");

        let value = doc.into_value();
        assert_eq!(value["id"], "r1");
        assert_eq!(value["points"], 50);
    }
}
