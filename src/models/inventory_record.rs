use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Physical condition of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    New,
    Used,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 2] = [ItemStatus::New, ItemStatus::Used];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::New => "new",
            ItemStatus::Used => "used",
        }
    }

    /// Label shown in lists and reports
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::New => "New",
            ItemStatus::Used => "Used",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = AppError;

    /// Accepts the current values as well as the legacy stored labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" | "disponible" => Ok(ItemStatus::New),
            "used" | "en_transito" => Ok(ItemStatus::Used),
            _ => Err(AppError::Validation(format!(
                "status must be 'new' or 'used', got '{}'",
                s
            ))),
        }
    }
}

/// Storage location of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Warehouse {
    #[serde(rename = "warehouse_1")]
    Main,
    #[serde(rename = "warehouse_2")]
    Secondary,
    #[serde(rename = "warehouse_3")]
    External,
}

impl Warehouse {
    pub const ALL: [Warehouse; 3] = [Warehouse::Main, Warehouse::Secondary, Warehouse::External];

    pub fn as_str(&self) -> &'static str {
        match self {
            Warehouse::Main => "warehouse_1",
            Warehouse::Secondary => "warehouse_2",
            Warehouse::External => "warehouse_3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Warehouse::Main => "Main Warehouse",
            Warehouse::Secondary => "Secondary Warehouse",
            Warehouse::External => "External Warehouse",
        }
    }
}

impl fmt::Display for Warehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Warehouse {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warehouse_1" | "bodega_1" => Ok(Warehouse::Main),
            "warehouse_2" | "bodega_2" => Ok(Warehouse::Secondary),
            "warehouse_3" | "bodega_3" => Ok(Warehouse::External),
            _ => Err(AppError::Validation(format!(
                "warehouse must be one of warehouse_1, warehouse_2, warehouse_3, got '{}'",
                s
            ))),
        }
    }
}

/// A photo stored at the media host: its public URL and the handle used to delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub public_id: String,
}

impl ImageRef {
    pub fn new(url: impl Into<String>, public_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            public_id: public_id.into(),
        }
    }

    /// Builds a reference only when both halves are present and non-empty.
    pub fn from_parts(url: Option<String>, public_id: Option<String>) -> Option<Self> {
        match (url, public_id) {
            (Some(url), Some(public_id)) if !url.is_empty() && !public_id.is_empty() => {
                Some(Self { url, public_id })
            }
            _ => None,
        }
    }
}

/// The editable fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub description: String,
    pub status: ItemStatus,
    pub warehouse: Warehouse,
    pub image: Option<ImageRef>,
}

impl Default for RecordFields {
    fn default() -> Self {
        Self {
            description: String::new(),
            status: ItemStatus::New,
            warehouse: Warehouse::Main,
            image: None,
        }
    }
}

/// Fields to merge into an existing record. `None` leaves a field untouched;
/// `image: Some(None)` removes the photo reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub description: Option<String>,
    pub status: Option<ItemStatus>,
    pub warehouse: Option<Warehouse>,
    pub image: Option<Option<ImageRef>>,
}

impl RecordPatch {
    /// A patch that overwrites every editable field.
    pub fn replace_all(fields: &RecordFields) -> Self {
        Self {
            description: Some(fields.description.clone()),
            status: Some(fields.status),
            warehouse: Some(fields.warehouse),
            image: Some(fields.image.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.status.is_none()
            && self.warehouse.is_none()
            && self.image.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: String,
    pub description: String,
    pub status: ItemStatus,
    pub warehouse: Warehouse,
    pub image: Option<ImageRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image.as_ref().map(|image| image.url.as_str())
    }

    pub fn fields(&self) -> RecordFields {
        RecordFields {
            description: self.description.clone(),
            status: self.status,
            warehouse: self.warehouse,
            image: self.image.clone(),
        }
    }
}
