//! In-process document backend.
//!
//! Ships in the library proper, not behind `cfg(test)`: demos and the
//! test suite both use it as the remote-mode double. Semantics match
//! the wire contract, including the initial snapshot delivered to every
//! new subscriber and snapshot ordering for the results collection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::models::Collection;

use super::{BackendError, BackendSubscription, Document, DocumentBackend, Fields, SnapshotResult};

/// Buffer for snapshot notifications per subscriber.
const SNAPSHOT_CHANNEL_SIZE: usize = 16;

#[derive(Default)]
pub struct MemoryBackend {
    data: Mutex<HashMap<Collection, Vec<Document>>>,
    subscribers: Mutex<HashMap<Collection, Vec<mpsc::Sender<SnapshotResult>>>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, for exercising the
    /// write-failure path.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(BackendError::ServerError("write rejected".to_string()))
        } else {
            Ok(())
        }
    }

    /// Snapshot of one collection, ordered per the collection's order
    /// field. Results sort by timestamp descending; unparseable
    /// timestamps fall back to reverse lexicographic comparison so a
    /// malformed entity cannot panic the ordering path.
    fn snapshot(&self, collection: Collection) -> Vec<Document> {
        let data = self.data.lock().expect("backend data lock poisoned");
        let mut docs = data.get(&collection).cloned().unwrap_or_default();
        if collection.order_field().is_some() {
            docs.sort_by(|a, b| match (doc_timestamp(a), doc_timestamp(b)) {
                (Some(ta), Some(tb)) => tb.cmp(&ta),
                _ => raw_timestamp(b).cmp(&raw_timestamp(a)),
            });
        }
        docs
    }

    async fn notify(&self, collection: Collection) {
        let snapshot = self.snapshot(collection);
        let senders: Vec<mpsc::Sender<SnapshotResult>> = {
            let mut subs = self
                .subscribers
                .lock()
                .expect("backend subscriber lock poisoned");
            let list = subs.entry(collection).or_default();
            list.retain(|tx| !tx.is_closed());
            list.clone()
        };

        let sends = senders.into_iter().map(|tx| {
            let snap = snapshot.clone();
            async move {
                let _ = tx.send(Ok(snap)).await;
            }
        });
        futures::future::join_all(sends).await;
    }
}

fn raw_timestamp(doc: &Document) -> String {
    doc.fields
        .get("timestamp")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn doc_timestamp(doc: &Document) -> Option<DateTime<Utc>> {
    doc.fields
        .get("timestamp")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn add_document(
        &self,
        collection: Collection,
        fields: Fields,
    ) -> Result<String, BackendError> {
        self.check_writable()?;
        let id = format!("doc_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        {
            let mut data = self.data.lock().expect("backend data lock poisoned");
            data.entry(collection)
                .or_default()
                .push(Document::new(id.clone(), fields));
        }
        self.notify(collection).await;
        Ok(id)
    }

    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), BackendError> {
        self.check_writable()?;
        let found = {
            let mut data = self.data.lock().expect("backend data lock poisoned");
            let docs = data.entry(collection).or_default();
            match docs.iter_mut().find(|d| d.id == id) {
                Some(doc) => {
                    for (key, value) in fields {
                        doc.fields.insert(key, value);
                    }
                    true
                }
                None => false,
            }
        };
        if !found {
            return Err(BackendError::NotFound(format!("{}/{}", collection, id)));
        }
        self.notify(collection).await;
        Ok(())
    }

    async fn delete_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<(), BackendError> {
        self.check_writable()?;
        {
            let mut data = self.data.lock().expect("backend data lock poisoned");
            data.entry(collection).or_default().retain(|d| d.id != id);
        }
        self.notify(collection).await;
        Ok(())
    }

    async fn subscribe(&self, collection: Collection) -> Result<BackendSubscription, BackendError> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_SIZE);
        // New subscribers get the current snapshot straight away.
        let initial = self.snapshot(collection);
        let _ = tx.send(Ok(initial)).await;
        self.subscribers
            .lock()
            .expect("backend subscriber lock poisoned")
            .entry(collection)
            .or_default()
            .push(tx);
        Ok(BackendSubscription { snapshots: rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_fields(team: &str, points: u32, timestamp: &str) -> Fields {
        json!({
            "programId": "prog1",
            "participantId": "u1",
            "teamId": team,
            "points": points,
            "grade": "A",
            "place": "1st",
            "timestamp": timestamp,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[tokio::test]
    async fn test_subscriber_receives_initial_snapshot() {
        let backend = MemoryBackend::new();
        backend
            .add_document(
                Collection::Results,
                result_fields("t1", 50, "2026-02-01T10:00:00Z"),
            )
            .await
            .unwrap();

        let mut sub = backend.subscribe(Collection::Results).await.unwrap();
        let snapshot = sub.snapshots.recv().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].fields["teamId"], "t1");
    }

    #[tokio::test]
    async fn test_results_snapshots_are_newest_first() {
        let backend = MemoryBackend::new();
        backend
            .add_document(
                Collection::Results,
                result_fields("t1", 40, "2026-02-01T10:00:00Z"),
            )
            .await
            .unwrap();
        backend
            .add_document(
                Collection::Results,
                result_fields("t2", 60, "2026-02-01T12:00:00Z"),
            )
            .await
            .unwrap();

        let mut sub = backend.subscribe(Collection::Results).await.unwrap();
        let snapshot = sub.snapshots.recv().await.unwrap().unwrap();
        assert_eq!(snapshot[0].fields["teamId"], "t2");
        assert_eq!(snapshot[1].fields["teamId"], "t1");
    }

    #[tokio::test]
    async fn test_mutations_push_fresh_snapshots() {
        let backend = MemoryBackend::new();
        let mut sub = backend.subscribe(Collection::Teams).await.unwrap();
        assert!(sub.snapshots.recv().await.unwrap().unwrap().is_empty());

        let fields = json!({"name": "Falcons", "color": "#2563eb"})
            .as_object()
            .cloned()
            .unwrap();
        let id = backend
            .add_document(Collection::Teams, fields)
            .await
            .unwrap();
        let snapshot = sub.snapshots.recv().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);

        backend
            .delete_document(Collection::Teams, &id)
            .await
            .unwrap();
        let snapshot = sub.snapshots.recv().await.unwrap().unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend
            .update_document(Collection::Programs, "nope", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fail_writes_rejects_all_writes() {
        let backend = MemoryBackend::new();
        backend.set_fail_writes(true);
        let err = backend
            .add_document(Collection::Teams, Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::ServerError(_)));
    }
}
