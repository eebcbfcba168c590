//! Offline Form Storage
//!
//! Durable record store for queued mutating requests. The store needs only
//! three operations, each individually atomic: add, read-all, delete-by-id.
//! No cross-record transactions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::http::Method;

// == Queued Form ==
/// A mutating request persisted for later replay.
///
/// Exists in storage from creation until its replay is confirmed; a crash
/// or reload between the two must not lose it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedForm {
    /// Durable auto-assigned identifier
    pub id: u64,
    /// Absolute request URL
    pub url: String,
    pub method: Method,
    pub headers: HashMap<String, String>,
    /// JSON request body, if any
    pub body: Option<Value>,
    /// Enqueue time
    pub queued_at: DateTime<Utc>,
}

/// A [`QueuedForm`] before the store assigns its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedFormDraft {
    pub url: String,
    pub method: Method,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub queued_at: DateTime<Utc>,
}

impl QueuedFormDraft {
    fn into_form(self, id: u64) -> QueuedForm {
        QueuedForm {
            id,
            url: self.url,
            method: self.method,
            headers: self.headers,
            body: self.body,
            queued_at: self.queued_at,
        }
    }
}

// == Form Store Trait ==
/// The persistence boundary of the offline queue.
///
/// `get_all` returns records in insertion order.
#[async_trait]
pub trait FormStore: Send + Sync {
    async fn add(&self, draft: QueuedFormDraft) -> anyhow::Result<u64>;
    async fn get_all(&self) -> anyhow::Result<Vec<QueuedForm>>;
    async fn delete(&self, id: u64) -> anyhow::Result<bool>;
}

// == Memory Form Store ==
/// In-memory store for tests and embeddings that do not need durability.
#[derive(Debug, Default)]
pub struct MemoryFormStore {
    forms: Mutex<Vec<QueuedForm>>,
    next_id: AtomicU64,
}

impl MemoryFormStore {
    pub fn new() -> Self {
        Self {
            forms: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl FormStore for MemoryFormStore {
    async fn add(&self, draft: QueuedFormDraft) -> anyhow::Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.forms.lock().await.push(draft.into_form(id));
        Ok(id)
    }

    async fn get_all(&self) -> anyhow::Result<Vec<QueuedForm>> {
        Ok(self.forms.lock().await.clone())
    }

    async fn delete(&self, id: u64) -> anyhow::Result<bool> {
        let mut forms = self.forms.lock().await;
        let before = forms.len();
        forms.retain(|form| form.id != id);
        Ok(forms.len() < before)
    }
}

// == Persisted Document ==
/// On-disk layout of the JSON file store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredQueue {
    next_id: u64,
    forms: Vec<QueuedForm>,
}

// == Json File Form Store ==
/// Durable store backed by a single JSON file.
///
/// Every mutation rewrites the file through a temp-file-then-rename, so each
/// operation is individually atomic even across a crash mid-write.
#[derive(Debug)]
pub struct JsonFileFormStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles against the file
    lock: Mutex<()>,
}

impl JsonFileFormStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> anyhow::Result<StoredQueue> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(StoredQueue {
                    next_id: 1,
                    forms: Vec::new(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, queue: &StoredQueue) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(queue)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl FormStore for JsonFileFormStore {
    async fn add(&self, draft: QueuedFormDraft) -> anyhow::Result<u64> {
        let _guard = self.lock.lock().await;
        let mut queue = self.load().await?;
        let id = queue.next_id.max(1);
        queue.next_id = id + 1;
        queue.forms.push(draft.into_form(id));
        self.save(&queue).await?;
        Ok(id)
    }

    async fn get_all(&self) -> anyhow::Result<Vec<QueuedForm>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.forms)
    }

    async fn delete(&self, id: u64) -> anyhow::Result<bool> {
        let _guard = self.lock.lock().await;
        let mut queue = self.load().await?;
        let before = queue.forms.len();
        queue.forms.retain(|form| form.id != id);
        let existed = queue.forms.len() < before;
        if existed {
            self.save(&queue).await?;
        }
        Ok(existed)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(url: &str) -> QueuedFormDraft {
        QueuedFormDraft {
            url: url.to_string(),
            method: Method::Post,
            headers: HashMap::new(),
            body: Some(json!({"name": "candidate"})),
            queued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_add_and_get_all() {
        let store = MemoryFormStore::new();

        let id1 = store.add(draft("/candidates")).await.unwrap();
        let id2 = store.add(draft("/jobs")).await.unwrap();
        assert_ne!(id1, id2);

        let forms = store.get_all().await.unwrap();
        assert_eq!(forms.len(), 2);
        // Insertion order preserved
        assert_eq!(forms[0].url, "/candidates");
        assert_eq!(forms[1].url, "/jobs");
    }

    #[tokio::test]
    async fn test_memory_store_delete() {
        let store = MemoryFormStore::new();

        let id = store.add(draft("/candidates")).await.unwrap();
        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let store = JsonFileFormStore::new(&path);

        let id = store.add(draft("/evaluations")).await.unwrap();
        let forms = store.get_all().await.unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].id, id);
        assert_eq!(forms[0].method, Method::Post);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");

        {
            let store = JsonFileFormStore::new(&path);
            store.add(draft("/candidates")).await.unwrap();
        }

        // A fresh handle sees the record: storage outlives the in-memory state
        let reopened = JsonFileFormStore::new(&path);
        let forms = reopened.get_all().await.unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].url, "/candidates");
    }

    #[tokio::test]
    async fn test_file_store_ids_keep_increasing_after_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let store = JsonFileFormStore::new(&path);

        let id1 = store.add(draft("/a")).await.unwrap();
        store.delete(id1).await.unwrap();
        let id2 = store.add(draft("/b")).await.unwrap();
        assert!(id2 > id1);
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileFormStore::new(dir.path().join("absent.json"));
        assert!(store.get_all().await.unwrap().is_empty());
    }
}
