pub mod arango;
pub mod error;
#[cfg(test)]
pub mod memory;

pub use arango::ArangoStore;
pub use error::{ErrorBody, StoreError};
#[cfg(test)]
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Handle returned by the store for every write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A remote collection of JSON documents addressed by `_key`
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn all(&self) -> Result<Vec<Value>, StoreError>;

    async fn find_by_key(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// The store assigns a `_key` when the document carries none
    async fn insert(&self, document: &Value) -> Result<DocumentMeta, StoreError>;

    /// Merges `patch` into the stored document
    async fn update(&self, key: &str, patch: &Value) -> Result<DocumentMeta, StoreError>;

    async fn remove(&self, key: &str) -> Result<DocumentMeta, StoreError>;
}
