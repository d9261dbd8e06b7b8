use std::{
    cmp::Ordering,
    sync::{Arc, RwLock},
};

use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    error::ProviderError,
    feed::{
        FeedHandle,
        source::{
            DocumentCallback, DocumentSnapshot, DocumentStore, ErrorCallback, QueryCallback,
            QueryKey, SortDirection,
        },
    },
};

const CHANGE_CAPACITY: usize = 32;

/// In-memory document store with push-based watchers.
///
/// Every mutation signals the collection's watchers; each watcher recomputes
/// its snapshot and only delivers when the payload actually changed, so the
/// delivery pattern matches a hosted store (initial snapshot, then one
/// delivery per effective change).
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Arc<MemoryCollection>>,
}

struct MemoryCollection {
    docs: RwLock<IndexMap<String, Value>>,
    changed: broadcast::Sender<()>,
    errors: broadcast::Sender<ProviderError>,
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self {
            docs: RwLock::new(IndexMap::new()),
            changed: broadcast::channel(CHANGE_CAPACITY).0,
            errors: broadcast::channel(CHANGE_CAPACITY).0,
        }
    }
}

impl MemoryCollection {
    fn document(&self, id: &str) -> DocumentSnapshot {
        let docs = self.docs.read().expect("collection lock poisoned");
        DocumentSnapshot {
            id: id.to_string(),
            data: docs.get(id).cloned(),
        }
    }

    fn query(&self, key: &QueryKey) -> Vec<DocumentSnapshot> {
        let docs = self.docs.read().expect("collection lock poisoned");
        let mut rows: Vec<(&String, &Value)> = docs.iter().collect();
        rows.sort_by(|(_, a), (_, b)| {
            let ordering = compare_field(a.get(&key.order_by), b.get(&key.order_by));
            match key.direction {
                SortDirection::Descending => ordering.reverse(),
                SortDirection::Ascending => ordering,
            }
        });

        rows.into_iter()
            .take(key.limit)
            .map(|(id, value)| DocumentSnapshot {
                id: id.clone(),
                data: Some(value.clone()),
            })
            .collect()
    }
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document and notify the collection's watchers.
    pub fn upsert(&self, collection: &str, id: &str, value: Value) {
        let collection = self.collection(collection);
        collection
            .docs
            .write()
            .expect("collection lock poisoned")
            .insert(id.to_string(), value);
        let _ = collection.changed.send(());
    }

    /// Remove a document and notify the collection's watchers.
    pub fn remove(&self, collection: &str, id: &str) {
        let collection = self.collection(collection);
        collection
            .docs
            .write()
            .expect("collection lock poisoned")
            .shift_remove(id);
        let _ = collection.changed.send(());
    }

    /// Push a transport error to every watcher of `collection`. Test hook
    /// mirroring a hosted store's error callback.
    pub fn emit_error(&self, collection: &str, error: ProviderError) {
        let _ = self.collection(collection).errors.send(error);
    }

    fn collection(&self, name: &str) -> Arc<MemoryCollection> {
        self.collections
            .entry(name.to_string())
            .or_default()
            .clone()
    }
}

impl DocumentStore for MemoryStore {
    fn watch_document(
        &self,
        collection: &str,
        id: &str,
        on_data: DocumentCallback,
        on_error: ErrorCallback,
    ) -> FeedHandle {
        let collection = self.collection(collection);
        let id = id.to_string();

        let task = tokio::spawn(async move {
            let mut changes = collection.changed.subscribe();
            let mut errors = collection.errors.subscribe();

            let mut last = collection.document(&id);
            on_data(last.clone());

            loop {
                tokio::select! {
                    change = changes.recv() => match change {
                        Ok(()) | Err(RecvError::Lagged(_)) => {
                            let next = collection.document(&id);
                            if next != last {
                                on_data(next.clone());
                                last = next;
                            }
                        }
                        Err(RecvError::Closed) => break,
                    },
                    error = errors.recv() => match error {
                        Ok(error) => on_error(error),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });

        FeedHandle::from_task(task)
    }

    fn watch_query(
        &self,
        key: &QueryKey,
        on_data: QueryCallback,
        on_error: ErrorCallback,
    ) -> FeedHandle {
        let collection = self.collection(&key.collection);
        let key = key.clone();

        let task = tokio::spawn(async move {
            let mut changes = collection.changed.subscribe();
            let mut errors = collection.errors.subscribe();

            let mut last = collection.query(&key);
            on_data(last.clone());

            loop {
                tokio::select! {
                    change = changes.recv() => match change {
                        Ok(()) | Err(RecvError::Lagged(_)) => {
                            let next = collection.query(&key);
                            if next != last {
                                on_data(next.clone());
                                last = next;
                            }
                        }
                        Err(RecvError::Closed) => break,
                    },
                    error = errors.recv() => match error {
                        Ok(error) => on_error(error),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });

        FeedHandle::from_task(task)
    }
}

/// Order two raw field values; missing fields sort lowest.
fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(a), Value::Number(b)) => {
                let a = a.as_f64().unwrap_or(f64::NEG_INFINITY);
                let b = b.as_f64().unwrap_or(f64::NEG_INFINITY);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => Ordering::Equal,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;

    fn score(score: i64, date: i64) -> Value {
        json!({ "score": score, "date": date, "firstName": "Jane", "lastName": "Doe" })
    }

    async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("delivery timed out")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn document_watch_delivers_initial_and_changes() {
        let store = MemoryStore::new();
        store.upsert("users", "u1", json!({ "username": "jd" }));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = store.watch_document(
            "users",
            "u1",
            Box::new(move |snapshot| {
                let _ = tx.send(snapshot);
            }),
            Box::new(|_| {}),
        );

        let initial = recv(&mut rx).await;
        assert!(initial.exists());

        store.remove("users", "u1");
        let gone = recv(&mut rx).await;
        assert!(!gone.exists());
    }

    #[tokio::test]
    async fn query_watch_orders_limits_and_reacts() {
        let store = MemoryStore::new();
        store.upsert("game-scores", "a", score(10, 3));
        store.upsert("game-scores", "b", score(30, 1));
        store.upsert("game-scores", "c", score(20, 2));

        let key = QueryKey {
            collection: "game-scores".into(),
            order_by: "score".into(),
            direction: SortDirection::Descending,
            limit: 2,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = store.watch_query(
            &key,
            Box::new(move |rows| {
                let _ = tx.send(rows);
            }),
            Box::new(|_| {}),
        );

        let initial = recv(&mut rx).await;
        let ids: Vec<&str> = initial.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);

        store.upsert("game-scores", "d", score(99, 4));
        let next = recv(&mut rx).await;
        let ids: Vec<&str> = next.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, ["d", "b"]);
    }

    #[tokio::test]
    async fn emitted_errors_reach_watchers() {
        let store = MemoryStore::new();
        let errors = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&errors);
        let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
        let _handle = store.watch_document(
            "users",
            "u1",
            Box::new(move |_| {
                let _ = ready_tx.send(());
            }),
            Box::new(move |error| sink.lock().unwrap().push(error)),
        );

        // Wait for the watcher task to be running before emitting.
        recv(&mut ready_rx).await;
        store.emit_error("users", ProviderError::new("unavailable", "boom"));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let seen = errors.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "boom");
    }
}
