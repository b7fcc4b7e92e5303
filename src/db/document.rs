//! Wire shape of an inventory record inside the document store.
//!
//! Status and warehouse are persisted under their legacy labels; timestamps
//! are RFC 3339 strings that older documents may lack.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{ImageRef, InventoryRecord, ItemStatus, RecordFields, RecordPatch, Warehouse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredStatus {
    #[serde(rename = "disponible")]
    Disponible,
    #[serde(rename = "en_transito")]
    EnTransito,
}

impl From<ItemStatus> for StoredStatus {
    fn from(status: ItemStatus) -> Self {
        match status {
            ItemStatus::New => StoredStatus::Disponible,
            ItemStatus::Used => StoredStatus::EnTransito,
        }
    }
}

impl From<StoredStatus> for ItemStatus {
    fn from(status: StoredStatus) -> Self {
        match status {
            StoredStatus::Disponible => ItemStatus::New,
            StoredStatus::EnTransito => ItemStatus::Used,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredWarehouse {
    #[serde(rename = "bodega_1")]
    Bodega1,
    #[serde(rename = "bodega_2")]
    Bodega2,
    #[serde(rename = "bodega_3")]
    Bodega3,
}

impl From<Warehouse> for StoredWarehouse {
    fn from(warehouse: Warehouse) -> Self {
        match warehouse {
            Warehouse::Main => StoredWarehouse::Bodega1,
            Warehouse::Secondary => StoredWarehouse::Bodega2,
            Warehouse::External => StoredWarehouse::Bodega3,
        }
    }
}

impl From<StoredWarehouse> for Warehouse {
    fn from(warehouse: StoredWarehouse) -> Self {
        match warehouse {
            StoredWarehouse::Bodega1 => Warehouse::Main,
            StoredWarehouse::Bodega2 => Warehouse::Secondary,
            StoredWarehouse::Bodega3 => Warehouse::External,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDocument {
    pub description: String,
    pub status: StoredStatus,
    pub warehouse: StoredWarehouse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_public_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InventoryDocument {
    /// A fresh document; both timestamps are `now`.
    pub fn new(fields: &RecordFields, now: DateTime<Utc>) -> Self {
        Self {
            description: fields.description.clone(),
            status: fields.status.into(),
            warehouse: fields.warehouse.into(),
            image_url: fields.image.as_ref().map(|image| image.url.clone()),
            image_public_id: fields.image.as_ref().map(|image| image.public_id.clone()),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn image(&self) -> Option<ImageRef> {
        ImageRef::from_parts(self.image_url.clone(), self.image_public_id.clone())
    }

    /// Missing timestamps become `now`; `updated_at` never precedes `created_at`.
    pub fn into_record(self, id: String, now: DateTime<Utc>) -> InventoryRecord {
        let image = self.image();
        if image.is_none() && (self.image_url.is_some() || self.image_public_id.is_some()) {
            tracing::warn!("Ignoring incomplete image reference on inventory item {}", id);
        }
        let created_at = self.created_at.unwrap_or(now);
        let updated_at = self.updated_at.unwrap_or(now).max(created_at);

        InventoryRecord {
            id,
            description: self.description,
            status: self.status.into(),
            warehouse: self.warehouse.into(),
            image,
            created_at,
            updated_at,
        }
    }
}

/// Top-level keys to merge into a stored document. Clearing the image writes nulls.
pub fn patch_to_document(patch: &RecordPatch, now: DateTime<Utc>) -> Result<Map<String, Value>, serde_json::Error> {
    let mut merge = Map::new();

    if let Some(description) = &patch.description {
        merge.insert("description".to_string(), Value::String(description.clone()));
    }
    if let Some(status) = patch.status {
        merge.insert("status".to_string(), serde_json::to_value(StoredStatus::from(status))?);
    }
    if let Some(warehouse) = patch.warehouse {
        merge.insert(
            "warehouse".to_string(),
            serde_json::to_value(StoredWarehouse::from(warehouse))?,
        );
    }
    match &patch.image {
        Some(Some(image)) => {
            merge.insert("imageUrl".to_string(), Value::String(image.url.clone()));
            merge.insert("imagePublicId".to_string(), Value::String(image.public_id.clone()));
        }
        Some(None) => {
            merge.insert("imageUrl".to_string(), Value::Null);
            merge.insert("imagePublicId".to_string(), Value::Null);
        }
        None => {}
    }
    merge.insert("updatedAt".to_string(), serde_json::to_value(now)?);

    Ok(merge)
}
