//! Client-side filtering over the cached record list.

use std::str::FromStr;

use crate::error::AppError;
use crate::models::{InventoryRecord, ItemStatus, Warehouse};

/// Either every value or exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Selection<T> {
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

/// `""` and `"all"` select everything; anything else must parse as `T`.
impl<T: FromStr<Err = AppError>> FromStr for Selection<T> {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Ok(Selection::All)
        } else {
            trimmed.parse().map(Selection::Only)
        }
    }
}

pub type StatusFilter = Selection<ItemStatus>;
pub type WarehouseFilter = Selection<Warehouse>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub query: String,
    pub status: StatusFilter,
    pub warehouse: WarehouseFilter,
}

impl FilterCriteria {
    pub fn new(query: impl Into<String>, status: StatusFilter, warehouse: WarehouseFilter) -> Self {
        Self {
            query: query.into(),
            status,
            warehouse,
        }
    }

    /// Builds criteria from request strings.
    pub fn parse(query: &str, status: &str, warehouse: &str) -> Result<Self, AppError> {
        Ok(Self::new(query, status.parse()?, warehouse.parse()?))
    }

    pub fn is_unfiltered(&self) -> bool {
        self.query.is_empty() && self.status == Selection::All && self.warehouse == Selection::All
    }

    pub fn matches(&self, record: &InventoryRecord) -> bool {
        self.matches_query(record)
            && self.status.accepts(&record.status)
            && self.warehouse.accepts(&record.warehouse)
    }

    fn matches_query(&self, record: &InventoryRecord) -> bool {
        self.query.is_empty()
            || record
                .description
                .to_lowercase()
                .contains(&self.query.to_lowercase())
    }
}

/// Records matching every criterion, in their original order.
pub fn filter_records(records: &[InventoryRecord], criteria: &FilterCriteria) -> Vec<InventoryRecord> {
    records
        .iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect()
}
