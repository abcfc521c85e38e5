use super::{DocumentMeta, DocumentStore, ErrorBody, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

const COLLECTION: &str = "locations";

/// In-process stand-in for an ArangoDB collection
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<String, Map<String, Value>>>,
    next_key: AtomicU64,
    revision: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned().map(Value::Object)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Map<String, Value>>> {
        self.documents.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn stamp(&self, key: &str, document: &mut Map<String, Value>) -> DocumentMeta {
        let rev = format!("_r{}", self.revision.fetch_add(1, Ordering::SeqCst));
        let id = format!("{COLLECTION}/{key}");
        document.insert("_key".to_string(), Value::from(key));
        document.insert("_id".to_string(), Value::from(id.clone()));
        document.insert("_rev".to_string(), Value::from(rev.clone()));

        DocumentMeta {
            id,
            key: key.to_string(),
            rev,
            extra: Map::new(),
        }
    }
}

fn not_found() -> StoreError {
    StoreError::NotFound(ErrorBody::new(404, Some(1202), "document not found"))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn all(&self) -> Result<Vec<Value>, StoreError> {
        Ok(self.lock().values().cloned().map(Value::Object).collect())
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.get(key))
    }

    async fn insert(&self, document: &Value) -> Result<DocumentMeta, StoreError> {
        let Value::Object(mut document) = document.clone() else {
            return Err(StoreError::Unknown(ErrorBody::new(400, Some(1227), "invalid document type")));
        };

        let key = match document.get("_key").and_then(Value::as_str) {
            Some(key) => key.to_string(),
            None => self.next_key.fetch_add(1, Ordering::SeqCst).to_string(),
        };

        let mut documents = self.lock();
        if documents.contains_key(&key) {
            return Err(StoreError::Conflict(ErrorBody::new(409, Some(1210), "unique constraint violated")));
        }

        let meta = self.stamp(&key, &mut document);
        documents.insert(key, document);
        Ok(meta)
    }

    async fn update(&self, key: &str, patch: &Value) -> Result<DocumentMeta, StoreError> {
        let mut documents = self.lock();
        let document = documents.get_mut(key).ok_or_else(not_found)?;
        let old_rev = document.get("_rev").cloned().unwrap_or(Value::Null);

        if let Value::Object(fields) = patch {
            for (name, value) in fields {
                document.insert(name.clone(), value.clone());
            }
        }

        let mut meta = self.stamp(key, document);
        meta.extra.insert("_oldRev".to_string(), old_rev);
        Ok(meta)
    }

    async fn remove(&self, key: &str) -> Result<DocumentMeta, StoreError> {
        let mut document = self.lock().remove(key).ok_or_else(not_found)?;
        Ok(self.stamp(key, &mut document))
    }
}
