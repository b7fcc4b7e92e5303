//! Record store gateway: the only place that talks to the document store.

use std::sync::Arc;

use chrono::Utc;

use crate::clock::WriteClock;
use crate::db::document::patch_to_document;
use crate::db::{DocumentStore, InventoryDocument};
use crate::error::{AppError, AppResult};
use crate::models::{ImageRef, InventoryRecord, RecordFields, RecordPatch};
use crate::storage::MediaHost;

/// Result of a successful write. Whoever owns a `RecordCollection` must
/// reload it after receiving one.
#[must_use = "the record collection is stale until it is reloaded"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation<T> {
    value: T,
}

impl<T> Mutation<T> {
    pub(crate) fn new(value: T) -> Self {
        Self { value }
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Mutation<U> {
        Mutation { value: f(self.value) }
    }
}

pub struct RecordGateway {
    store: Arc<dyn DocumentStore>,
    media: Option<Arc<dyn MediaHost>>,
    clock: WriteClock,
}

impl RecordGateway {
    pub fn new(store: Arc<dyn DocumentStore>, media: Option<Arc<dyn MediaHost>>) -> Self {
        Self {
            store,
            media,
            clock: WriteClock::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Stores a new record; both timestamps are set to the same instant.
    pub async fn create(&self, fields: &RecordFields) -> AppResult<Mutation<String>> {
        let now = self.clock.now();
        let document = InventoryDocument::new(fields, now).to_value()?;
        let id = self.store.insert(document).await?;

        tracing::info!("Inventory item created: id={}, store={}", id, self.store.name());
        Ok(Mutation::new(id))
    }

    /// Every record, newest `created_at` first.
    pub async fn list(&self) -> AppResult<Vec<InventoryRecord>> {
        let documents = self.store.fetch_all().await?;
        let now = Utc::now();

        let mut records = documents
            .into_iter()
            .map(|stored| {
                let document = InventoryDocument::from_value(stored.data).map_err(|e| {
                    AppError::Persistence(format!("Malformed document {}: {}", stored.id, e))
                })?;
                Ok(document.into_record(stored.id, now))
            })
            .collect::<AppResult<Vec<_>>>()?;

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        tracing::debug!("Inventory items listed: count={}", records.len());
        Ok(records)
    }

    /// Merges the given fields and refreshes `updated_at`.
    pub async fn update(&self, id: &str, patch: &RecordPatch) -> AppResult<Mutation<()>> {
        let now = self.clock.now();
        let merge = patch_to_document(patch, now)?;

        if !self.store.merge(id, merge).await? {
            return Err(AppError::NotFound(format!("Inventory item {} not found", id)));
        }

        tracing::info!("Inventory item updated: id={}", id);
        Ok(Mutation::new(()))
    }

    /// Removes a record. A stored photo is deleted in the background; that
    /// deletion can fail without affecting the result.
    pub async fn delete(&self, id: &str) -> AppResult<Mutation<()>> {
        let removed = self
            .store
            .remove(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Inventory item {} not found", id)))?;

        tracing::info!("Inventory item deleted: id={}", id);

        // The record is gone either way; a document we cannot read just skips cleanup.
        match InventoryDocument::from_value(removed) {
            Ok(document) => {
                if let Some(image) = document.image() {
                    self.spawn_image_cleanup(id.to_string(), image);
                }
            }
            Err(e) => tracing::warn!("Skipping image cleanup for {}: {}", id, e),
        }

        Ok(Mutation::new(()))
    }

    fn spawn_image_cleanup(&self, id: String, image: ImageRef) {
        let Some(media) = self.media.clone() else {
            tracing::warn!(
                "No media host configured, leaving image {} of item {} in place",
                image.public_id,
                id
            );
            return;
        };

        tokio::spawn(async move {
            match media.delete(&image.public_id).await {
                Ok(()) => tracing::debug!(
                    "Image cleanup done: item={}, public_id={}",
                    id,
                    image.public_id
                ),
                Err(e) => {
                    let err = AppError::MediaCleanup(format!(
                        "item={}, public_id={}, host={}: {}",
                        id,
                        image.public_id,
                        media.name(),
                        e
                    ));
                    tracing::warn!("{}", err);
                }
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{MemoryDocumentStore, StoredDocument};
    use crate::models::{ItemStatus, Warehouse};
    use crate::storage::ImageUpload;
    use serde_json::{json, Map, Value};
    use tokio::sync::mpsc;

    /// Store whose every call fails like an unreachable database.
    pub(crate) struct UnreachableStore;

    #[tonic::async_trait]
    impl DocumentStore for UnreachableStore {
        async fn insert(&self, _document: Value) -> AppResult<String> {
            Err(AppError::Persistence("connection refused".into()))
        }
        async fn fetch_all(&self) -> AppResult<Vec<StoredDocument>> {
            Err(AppError::Persistence("connection refused".into()))
        }
        async fn merge(&self, _id: &str, _patch: Map<String, Value>) -> AppResult<bool> {
            Err(AppError::Persistence("connection refused".into()))
        }
        async fn remove(&self, _id: &str) -> AppResult<Option<Value>> {
            Err(AppError::Persistence("connection refused".into()))
        }
        async fn ping(&self) -> AppResult<()> {
            Err(AppError::Persistence("connection refused".into()))
        }
        fn name(&self) -> &str {
            "unreachable"
        }
    }

    /// Media host that reports every delete on a channel and optionally fails it.
    pub(crate) struct RecordingHost {
        pub deleted: mpsc::UnboundedSender<String>,
        pub fail: bool,
    }

    #[tonic::async_trait]
    impl MediaHost for RecordingHost {
        async fn upload(&self, image: &ImageUpload) -> AppResult<ImageRef> {
            Ok(ImageRef::new(
                format!("https://media.test/{}", image.file_name()),
                format!("inventory/{}", image.file_name()),
            ))
        }
        async fn delete(&self, public_id: &str) -> AppResult<()> {
            let _ = self.deleted.send(public_id.to_string());
            if self.fail {
                Err(AppError::Storage("media host unavailable".into()))
            } else {
                Ok(())
            }
        }
        fn name(&self) -> &str {
            "recording"
        }
    }

    pub(crate) fn monitor() -> RecordFields {
        RecordFields {
            description: "Dell Monitor 24\"".to_string(),
            status: ItemStatus::New,
            warehouse: Warehouse::Secondary,
            image: None,
        }
    }

    fn memory_gateway() -> RecordGateway {
        RecordGateway::new(Arc::new(MemoryDocumentStore::new()), None)
    }

    #[tokio::test]
    async fn test_create_then_list_newest_first() {
        let gateway = memory_gateway();
        let older = gateway
            .create(&RecordFields {
                description: "Pallet wrap".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .into_inner();
        let id = gateway.create(&monitor()).await.unwrap().into_inner();
        assert_ne!(id, older);

        let records = gateway.list().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].description, "Dell Monitor 24\"");
        assert_eq!(records[0].status, ItemStatus::New);
        assert_eq!(records[0].warehouse, Warehouse::Secondary);
        assert_eq!(records[0].created_at, records[0].updated_at);
        assert_eq!(records[1].id, older);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let gateway = memory_gateway();
        let id = gateway.create(&monitor()).await.unwrap().into_inner();
        let before = gateway.list().await.unwrap().remove(0);

        let patch = RecordPatch {
            status: Some(ItemStatus::Used),
            ..Default::default()
        };
        let _ = gateway.update(&id, &patch).await.unwrap();

        let after = gateway.list().await.unwrap().remove(0);
        assert_eq!(after.status, ItemStatus::Used);
        assert_eq!(after.description, before.description);
        assert_eq!(after.warehouse, before.warehouse);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn test_updated_at_strictly_increases() {
        let gateway = memory_gateway();
        let id = gateway.create(&monitor()).await.unwrap().into_inner();
        let mut last = gateway.list().await.unwrap()[0].updated_at;

        for description in ["a", "b", "c", "d"] {
            let patch = RecordPatch {
                description: Some(description.to_string()),
                ..Default::default()
            };
            let _ = gateway.update(&id, &patch).await.unwrap();
            let record = gateway.list().await.unwrap().remove(0);
            assert!(record.updated_at > last);
            assert!(record.created_at <= record.updated_at);
            last = record.updated_at;
        }
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let gateway = memory_gateway();
        let result = gateway.update("missing", &RecordPatch::default()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let gateway = memory_gateway();
        let id = gateway.create(&monitor()).await.unwrap().into_inner();

        assert!(gateway.delete(&id).await.is_ok());
        assert!(matches!(gateway.delete(&id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            gateway.delete("never-existed").await,
            Err(AppError::NotFound(_))
        ));
        assert!(gateway.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_persistence_error() {
        let gateway = RecordGateway::new(Arc::new(UnreachableStore), None);
        assert!(matches!(gateway.create(&monitor()).await, Err(AppError::Persistence(_))));
        assert!(matches!(gateway.list().await, Err(AppError::Persistence(_))));
        assert!(matches!(
            gateway.update("x", &RecordPatch::default()).await,
            Err(AppError::Persistence(_))
        ));
        assert!(matches!(gateway.delete("x").await, Err(AppError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_malformed_document_fails_list() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .put_raw("legacy", json!({"description": "Old", "status": "agotado", "warehouse": "bodega_1"}))
            .await;
        let gateway = RecordGateway::new(store, None);
        assert!(matches!(gateway.list().await, Err(AppError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_delete_cleans_up_image() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let host = Arc::new(RecordingHost { deleted: tx, fail: false });
        let gateway = RecordGateway::new(Arc::new(MemoryDocumentStore::new()), Some(host));

        let mut fields = monitor();
        fields.image = Some(ImageRef::new("https://media.test/m.png", "inventory/m"));
        let id = gateway.create(&fields).await.unwrap().into_inner();

        let _ = gateway.delete(&id).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("inventory/m"));
    }

    #[tokio::test]
    async fn test_failed_image_cleanup_does_not_fail_delete() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let host = Arc::new(RecordingHost { deleted: tx, fail: true });
        let gateway = RecordGateway::new(Arc::new(MemoryDocumentStore::new()), Some(host));

        let mut fields = monitor();
        fields.image = Some(ImageRef::new("https://media.test/m.png", "inventory/m"));
        let id = gateway.create(&fields).await.unwrap().into_inner();

        assert!(gateway.delete(&id).await.is_ok());
        assert_eq!(rx.recv().await.as_deref(), Some("inventory/m"));
        assert!(gateway.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_without_image_skips_cleanup() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let host = Arc::new(RecordingHost { deleted: tx, fail: false });
        let gateway = RecordGateway::new(Arc::new(MemoryDocumentStore::new()), Some(host));

        let id = gateway.create(&monitor()).await.unwrap().into_inner();
        let _ = gateway.delete(&id).await.unwrap();
        drop(gateway);

        // Sender dropped with the gateway and no cleanup was ever queued
        assert_eq!(rx.recv().await, None);
    }
}
