//! In-memory document store used by unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::paths::{CollectionPath, DocumentPath};
use crate::store::{Document, DocumentStore, StoreError};

/// Operations observed by the store, for assertions.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedOp {
    Add { collection: String },
    Update { document: String, fields: Value },
    Delete { document: String },
    DeleteBatch { documents: Vec<String> },
    GetMany { collection: String },
}

/// Test double with injectable per-operation failures.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    next_id: AtomicU64,
    ops: Mutex<Vec<RecordedOp>>,
    // Queued errors consumed one per matching call, in order.
    add_failures: Mutex<VecDeque<StoreError>>,
    update_failures: Mutex<VecDeque<StoreError>>,
    get_failures: Mutex<VecDeque<StoreError>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an error to be returned by the next `add` call.
    pub fn fail_next_add(&self, error: StoreError) {
        self.add_failures.lock().expect("store lock poisoned").push_back(error);
    }

    /// Queues an error to be returned by the next `update` call.
    pub fn fail_next_update(&self, error: StoreError) {
        self.update_failures.lock().expect("store lock poisoned").push_back(error);
    }

    /// Queues an error to be returned by the next `get_many` call.
    pub fn fail_next_get(&self, error: StoreError) {
        self.get_failures.lock().expect("store lock poisoned").push_back(error);
    }

    /// All operations observed so far, in call order.
    pub fn recorded_ops(&self) -> Vec<RecordedOp> {
        self.ops.lock().expect("store lock poisoned").clone()
    }

    /// Documents currently stored in `collection`, unordered.
    pub fn documents(&self, collection: &CollectionPath) -> Vec<Document> {
        self.collections
            .lock()
            .expect("store lock poisoned")
            .get(collection.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Inserts a document directly, bypassing the `add` bookkeeping.
    pub fn seed(&self, collection: &CollectionPath, document: Document) {
        self.collections
            .lock()
            .expect("store lock poisoned")
            .entry(collection.as_str().to_string())
            .or_default()
            .push(document);
    }

    fn record(&self, op: RecordedOp) {
        self.ops.lock().expect("store lock poisoned").push(op);
    }

    fn take_failure(queue: &Mutex<VecDeque<StoreError>>) -> Option<StoreError> {
        queue.lock().expect("store lock poisoned").pop_front()
    }

    fn split_document_path(path: &DocumentPath) -> (String, String) {
        let raw = path.as_str();
        match raw.rsplit_once('/') {
            Some((collection, id)) => (collection.to_string(), id.to_string()),
            None => (String::new(), raw.to_string()),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn add(&self, collection: &CollectionPath, mut fields: Value) -> Result<String, StoreError> {
        self.record(RecordedOp::Add {
            collection: collection.as_str().to_string(),
        });
        if let Some(error) = Self::take_failure(&self.add_failures) {
            return Err(error);
        }

        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        // Server-assigned creation time, like the hosted store.
        if let Some(map) = fields.as_object_mut()
            && !map.contains_key("created_at")
        {
            map.insert("created_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        self.collections
            .lock()
            .expect("store lock poisoned")
            .entry(collection.as_str().to_string())
            .or_default()
            .push(Document { id: id.clone(), fields });
        Ok(id)
    }

    async fn update(&self, document: &DocumentPath, fields: Value) -> Result<(), StoreError> {
        self.record(RecordedOp::Update {
            document: document.as_str().to_string(),
            fields: fields.clone(),
        });
        if let Some(error) = Self::take_failure(&self.update_failures) {
            return Err(error);
        }

        let (collection, id) = Self::split_document_path(document);
        let mut collections = self.collections.lock().expect("store lock poisoned");
        let docs = collections.get_mut(&collection).ok_or(StoreError::NotFound)?;
        let doc = docs.iter_mut().find(|doc| doc.id == id).ok_or(StoreError::NotFound)?;
        if let (Some(target), Some(patch)) = (doc.fields.as_object_mut(), fields.as_object()) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, document: &DocumentPath) -> Result<(), StoreError> {
        self.record(RecordedOp::Delete {
            document: document.as_str().to_string(),
        });
        let (collection, id) = Self::split_document_path(document);
        let mut collections = self.collections.lock().expect("store lock poisoned");
        if let Some(docs) = collections.get_mut(&collection) {
            docs.retain(|doc| doc.id != id);
        }
        Ok(())
    }

    async fn delete_batch(&self, documents: &[DocumentPath]) -> Result<(), StoreError> {
        self.record(RecordedOp::DeleteBatch {
            documents: documents.iter().map(|d| d.as_str().to_string()).collect(),
        });
        let mut collections = self.collections.lock().expect("store lock poisoned");
        for document in documents {
            let (collection, id) = Self::split_document_path(document);
            if let Some(docs) = collections.get_mut(&collection) {
                docs.retain(|doc| doc.id != id);
            }
        }
        Ok(())
    }

    async fn get_many(&self, collection: &CollectionPath, order_by: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        self.record(RecordedOp::GetMany {
            collection: collection.as_str().to_string(),
        });
        if let Some(error) = Self::take_failure(&self.get_failures) {
            return Err(error);
        }

        let mut docs = self.documents(collection);
        // Descending by the named field; RFC 3339 strings compare correctly.
        docs.sort_by(|a, b| {
            let left = field_sort_key(&a.fields, order_by);
            let right = field_sort_key(&b.fields, order_by);
            right.cmp(&left)
        });
        docs.truncate(limit);
        Ok(docs)
    }
}

fn field_sort_key(fields: &Value, order_by: &str) -> String {
    match fields.get(order_by) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
