use std::collections::HashMap;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A raw document together with the store-assigned key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Value,
}

/// Document store abstraction (PostgreSQL JSONB / in-process map)
#[tonic::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores a new document and returns its generated key
    async fn insert(&self, document: Value) -> AppResult<String>;

    /// Every stored document, in no particular order
    async fn fetch_all(&self) -> AppResult<Vec<StoredDocument>>;

    /// Merges top-level keys into an existing document. `false` when the key is unknown
    async fn merge(&self, id: &str, patch: Map<String, Value>) -> AppResult<bool>;

    /// Removes a document and returns what was stored, `None` when the key is unknown
    async fn remove(&self, id: &str) -> AppResult<Option<Value>>;

    /// Cheap reachability check used by the health service
    async fn ping(&self) -> AppResult<()>;

    fn name(&self) -> &str;
}

/// Keeps documents in process memory. Used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Seeds a document under a caller-chosen key.
    pub async fn put_raw(&self, id: impl Into<String>, document: Value) {
        self.documents.write().await.insert(id.into(), document);
    }
}

#[tonic::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, document: Value) -> AppResult<String> {
        if !document.is_object() {
            return Err(AppError::Persistence("document must be a JSON object".to_string()));
        }
        let id = Uuid::new_v4().to_string();
        self.documents.write().await.insert(id.clone(), document);
        Ok(id)
    }

    async fn fetch_all(&self) -> AppResult<Vec<StoredDocument>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .map(|(id, data)| StoredDocument {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn merge(&self, id: &str, patch: Map<String, Value>) -> AppResult<bool> {
        let mut documents = self.documents.write().await;
        let Some(document) = documents.get_mut(id) else {
            return Ok(false);
        };
        let Some(fields) = document.as_object_mut() else {
            return Err(AppError::Persistence(format!("document {} is not an object", id)));
        };
        fields.extend(patch);
        Ok(true)
    }

    async fn remove(&self, id: &str) -> AppResult<Option<Value>> {
        Ok(self.documents.write().await.remove(id))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
