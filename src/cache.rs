//! The last fetched record list and the counts derived from it.

use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::filter::{filter_records, FilterCriteria};
use crate::gateway::RecordGateway;
use crate::models::{InventoryRecord, ItemStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryStats {
    pub total: usize,
    pub new: usize,
    pub used: usize,
}

impl InventoryStats {
    pub fn from_records(records: &[InventoryRecord]) -> Self {
        records.iter().fold(Self::default(), |mut stats, record| {
            stats.total += 1;
            match record.status {
                ItemStatus::New => stats.new += 1,
                ItemStatus::Used => stats.used += 1,
            }
            stats
        })
    }
}

/// Owned snapshot of the store. Never patched in place: every change goes
/// through a full `reload`.
#[derive(Debug, Clone, Default)]
pub struct RecordCollection {
    records: Vec<InventoryRecord>,
    stats: InventoryStats,
    loaded_at: Option<DateTime<Utc>>,
}

impl RecordCollection {
    pub fn from_records(records: Vec<InventoryRecord>) -> Self {
        let mut collection = Self::default();
        collection.replace(records);
        collection
    }

    pub async fn load(gateway: &RecordGateway) -> AppResult<Self> {
        let mut collection = Self::default();
        collection.reload(gateway).await?;
        Ok(collection)
    }

    /// Re-fetches everything. On failure the previous contents are kept.
    pub async fn reload(&mut self, gateway: &RecordGateway) -> AppResult<()> {
        let records = gateway.list().await?;
        self.replace(records);
        Ok(())
    }

    fn replace(&mut self, records: Vec<InventoryRecord>) {
        self.stats = InventoryStats::from_records(&records);
        self.records = records;
        self.loaded_at = Some(Utc::now());
    }

    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    pub fn stats(&self) -> InventoryStats {
        self.stats
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&InventoryRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn view(&self, criteria: &FilterCriteria) -> Vec<InventoryRecord> {
        filter_records(&self.records, criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use crate::error::AppError;
    use crate::gateway::tests::{monitor, UnreachableStore};
    use crate::models::{RecordFields, RecordPatch, Warehouse};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_load_computes_stats() {
        let gateway = RecordGateway::new(Arc::new(MemoryDocumentStore::new()), None);
        let _ = gateway.create(&monitor()).await.unwrap();
        let _ = gateway
            .create(&RecordFields {
                description: "Used chair".into(),
                status: ItemStatus::Used,
                warehouse: Warehouse::Main,
                image: None,
            })
            .await
            .unwrap();

        let collection = RecordCollection::load(&gateway).await.unwrap();
        assert!(collection.is_loaded());
        assert_eq!(
            collection.stats(),
            InventoryStats {
                total: 2,
                new: 1,
                used: 1
            }
        );
    }

    #[tokio::test]
    async fn test_reload_sees_each_write() {
        let gateway = RecordGateway::new(Arc::new(MemoryDocumentStore::new()), None);
        let mut collection = RecordCollection::load(&gateway).await.unwrap();
        assert!(collection.is_empty());

        let id = gateway.create(&monitor()).await.unwrap().into_inner();
        collection.reload(&gateway).await.unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get(&id).unwrap().description, "Dell Monitor 24\"");

        let patch = RecordPatch {
            status: Some(ItemStatus::Used),
            ..Default::default()
        };
        let _ = gateway.update(&id, &patch).await.unwrap();
        collection.reload(&gateway).await.unwrap();
        assert_eq!(collection.stats().used, 1);
        assert_eq!(collection.stats().new, 0);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_contents() {
        let good = RecordGateway::new(Arc::new(MemoryDocumentStore::new()), None);
        let _ = good.create(&monitor()).await.unwrap();
        let mut collection = RecordCollection::load(&good).await.unwrap();
        let loaded_at = collection.loaded_at();

        let broken = RecordGateway::new(Arc::new(UnreachableStore), None);
        assert!(matches!(
            collection.reload(&broken).await,
            Err(AppError::Persistence(_))
        ));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.stats().total, 1);
        assert_eq!(collection.loaded_at(), loaded_at);
    }

    #[test]
    fn test_empty_stats() {
        let collection = RecordCollection::from_records(Vec::new());
        assert_eq!(collection.stats(), InventoryStats::default());
    }
}
