//! Staging and validation of one record's editable fields.

use crate::error::{AppError, AppResult};
use crate::gateway::{Mutation, RecordGateway};
use crate::models::{ImageRef, InventoryRecord, ItemStatus, RecordFields, RecordPatch, Warehouse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    Created { id: String },
    Updated { id: String },
}

impl FormOutcome {
    pub fn id(&self) -> &str {
        match self {
            FormOutcome::Created { id } | FormOutcome::Updated { id } => id,
        }
    }

    /// Short confirmation for the user
    pub fn message(&self) -> &'static str {
        match self {
            FormOutcome::Created { .. } => "Item created successfully",
            FormOutcome::Updated { .. } => "Item updated successfully",
        }
    }
}

/// Rejects descriptions that are empty once trimmed.
pub fn validate_description(description: &str) -> AppResult<()> {
    if description.trim().is_empty() {
        return Err(AppError::Validation("description is required".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryForm {
    mode: FormMode,
    fields: RecordFields,
}

impl Default for InventoryForm {
    fn default() -> Self {
        Self::create()
    }
}

impl InventoryForm {
    /// Empty form for a new record
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            fields: RecordFields::default(),
        }
    }

    /// Form pre-filled from an existing record
    pub fn edit(record: &InventoryRecord) -> Self {
        Self::edit_with(record.id.clone(), record.fields())
    }

    /// Edit form for a record known only by id; submission replaces all of its fields.
    pub fn edit_with(id: impl Into<String>, fields: RecordFields) -> Self {
        Self {
            mode: FormMode::Edit { id: id.into() },
            fields,
        }
    }

    pub fn with_fields(mut self, fields: RecordFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn fields(&self) -> &RecordFields {
        &self.fields
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.fields.description = description.into();
    }

    pub fn set_status(&mut self, status: ItemStatus) {
        self.fields.status = status;
    }

    pub fn set_warehouse(&mut self, warehouse: Warehouse) {
        self.fields.warehouse = warehouse;
    }

    pub fn attach_image(&mut self, image: ImageRef) {
        self.fields.image = Some(image);
    }

    pub fn remove_image(&mut self) {
        self.fields.image = None;
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_description(&self.fields.description)
    }

    /// Validates locally, then creates or fully replaces the record. The
    /// form keeps its fields whatever the outcome, so a failed submit can be retried.
    pub async fn submit(&self, gateway: &RecordGateway) -> AppResult<Mutation<FormOutcome>> {
        self.validate()?;

        let result = match &self.mode {
            FormMode::Create => gateway
                .create(&self.fields)
                .await
                .map(|mutation| mutation.map(|id| FormOutcome::Created { id })),
            FormMode::Edit { id } => gateway
                .update(id, &RecordPatch::replace_all(&self.fields))
                .await
                .map(|mutation| mutation.map(|()| FormOutcome::Updated { id: id.clone() })),
        };

        if let Err(e) = &result {
            tracing::error!("Failed to save inventory item: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RecordCollection;
    use crate::db::MemoryDocumentStore;
    use crate::gateway::tests::UnreachableStore;
    use std::sync::Arc;

    fn gateway() -> RecordGateway {
        RecordGateway::new(Arc::new(MemoryDocumentStore::new()), None)
    }

    #[test]
    fn test_create_defaults() {
        let form = InventoryForm::create();
        assert_eq!(form.mode(), &FormMode::Create);
        assert_eq!(form.fields().status, ItemStatus::New);
        assert_eq!(form.fields().warehouse, Warehouse::Main);
        assert!(form.fields().image.is_none());
    }

    #[tokio::test]
    async fn test_blank_description_never_reaches_store() {
        // An unreachable store would turn any call into a persistence error
        let gateway = RecordGateway::new(Arc::new(UnreachableStore), None);
        let mut form = InventoryForm::create();
        form.set_description("   \n\t");

        assert!(matches!(form.submit(&gateway).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_then_edit() {
        let gateway = gateway();
        let mut form = InventoryForm::create();
        form.set_description("Dell Monitor 24\"");
        form.set_warehouse(Warehouse::Secondary);
        form.attach_image(ImageRef::new("https://media.test/m.png", "inventory/m"));

        let outcome = form.submit(&gateway).await.unwrap().into_inner();
        assert!(matches!(outcome, FormOutcome::Created { .. }));

        let collection = RecordCollection::load(&gateway).await.unwrap();
        let record = collection.get(outcome.id()).unwrap();
        assert!(record.has_image());

        let mut edit = InventoryForm::edit(record);
        edit.set_status(ItemStatus::Used);
        edit.remove_image();
        let updated = edit.submit(&gateway).await.unwrap().into_inner();
        assert_eq!(updated, FormOutcome::Updated { id: record.id.clone() });

        let collection = RecordCollection::load(&gateway).await.unwrap();
        let record = collection.get(outcome.id()).unwrap();
        assert_eq!(record.status, ItemStatus::Used);
        assert_eq!(record.warehouse, Warehouse::Secondary);
        assert!(!record.has_image());
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_fields() {
        let gateway = RecordGateway::new(Arc::new(UnreachableStore), None);
        let mut form = InventoryForm::create();
        form.set_description("Label printer");
        let before = form.clone();

        assert!(matches!(form.submit(&gateway).await, Err(AppError::Persistence(_))));
        assert_eq!(form, before);
    }

    #[tokio::test]
    async fn test_edit_of_deleted_record_is_not_found() {
        let gateway = gateway();
        let form = InventoryForm::edit_with(
            "gone",
            RecordFields {
                description: "Ghost".into(),
                ..Default::default()
            },
        );
        assert!(matches!(form.submit(&gateway).await, Err(AppError::NotFound(_))));
    }
}
