use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

use crate::cache::RecordCollection;
use crate::error::{AppError, AppResult};
use crate::export::{self, ExportFormat, ReportLocale, DEFAULT_BASE_NAME};
use crate::filter::FilterCriteria;
use crate::form::{validate_description, InventoryForm};
use crate::gateway::{Mutation, RecordGateway};
use crate::models::{ImageRef, InventoryRecord, ItemStatus, RecordFields, RecordPatch, Warehouse};
use crate::proto::inventory::inventory_service_server::InventoryService;
use crate::proto::inventory::{
    CreateItemReq, CreateItemRes, DeleteItemReq, DeleteItemRes, ExportItemsReq, ExportItemsRes,
    Item, ItemStats, ListItemsReq, ListItemsRes, PatchItemReq, UpdateItemReq, UpdateItemRes,
    UploadImageReq, UploadImageRes,
};
use crate::storage::{ImageUpload, MediaHost};

/// A loaded collection tagged with the refresh that produced it.
#[derive(Default)]
struct Snapshot {
    generation: u64,
    collection: RecordCollection,
}

pub struct InventoryServiceImpl {
    gateway: Arc<RecordGateway>,
    media: Option<Arc<dyn MediaHost>>,
    collection: RwLock<Snapshot>,
    refreshes: AtomicU64,
    base_name: String,
    locale: ReportLocale,
}

impl InventoryServiceImpl {
    pub fn new(gateway: Arc<RecordGateway>, media: Option<Arc<dyn MediaHost>>) -> Self {
        Self {
            gateway,
            media,
            collection: RwLock::new(Snapshot::default()),
            refreshes: AtomicU64::new(0),
            base_name: DEFAULT_BASE_NAME.to_string(),
            locale: ReportLocale::default(),
        }
    }

    /// File name prefix and date rendering used by `ExportItems`.
    pub fn with_export_settings(mut self, base_name: impl Into<String>, locale: ReportLocale) -> Self {
        self.base_name = base_name.into();
        self.locale = locale;
        self
    }

    fn record_to_proto(record: &InventoryRecord) -> Item {
        Item {
            id: record.id.clone(),
            description: record.description.clone(),
            status: record.status.as_str().to_string(),
            status_label: record.status.label().to_string(),
            warehouse: record.warehouse.as_str().to_string(),
            warehouse_label: record.warehouse.label().to_string(),
            image_url: record.image.as_ref().map(|i| i.url.clone()).unwrap_or_default(),
            image_public_id: record
                .image
                .as_ref()
                .map(|i| i.public_id.clone())
                .unwrap_or_default(),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }

    /// Logs the full error and turns it into a status that names only the action.
    fn failure(action: &str, err: AppError) -> Status {
        match err {
            AppError::Validation(_) | AppError::NotFound(_) => {
                tracing::debug!("Rejected request to {}: {}", action, err);
                err.into()
            }
            AppError::Persistence(_) => {
                tracing::error!("Failed to {}: {}", action, err);
                Status::unavailable(format!("Failed to {}", action))
            }
            _ => {
                tracing::error!("Failed to {}: {}", action, err);
                Status::internal(format!("Failed to {}", action))
            }
        }
    }

    fn image_from_wire(url: &str, public_id: &str) -> AppResult<Option<ImageRef>> {
        match (url.is_empty(), public_id.is_empty()) {
            (true, true) => Ok(None),
            (false, false) => Ok(Some(ImageRef::new(url, public_id))),
            _ => Err(AppError::Validation(
                "image_url and image_public_id must be given together".to_string(),
            )),
        }
    }

    fn fields_from_wire(
        description: &str,
        status: &str,
        warehouse: &str,
        image_url: &str,
        image_public_id: &str,
    ) -> AppResult<RecordFields> {
        let defaults = RecordFields::default();
        let status: ItemStatus = if status.is_empty() {
            defaults.status
        } else {
            status.parse()?
        };
        let warehouse: Warehouse = if warehouse.is_empty() {
            defaults.warehouse
        } else {
            warehouse.parse()?
        };

        Ok(RecordFields {
            description: description.to_string(),
            status,
            warehouse,
            image: Self::image_from_wire(image_url, image_public_id)?,
        })
    }

    fn patch_from_wire(req: &PatchItemReq) -> AppResult<RecordPatch> {
        if let Some(description) = &req.description {
            validate_description(description)?;
        }

        let image_url = req.image_url.as_deref().unwrap_or_default();
        let image_public_id = req.image_public_id.as_deref().unwrap_or_default();
        let image = match Self::image_from_wire(image_url, image_public_id)? {
            Some(image) => Some(Some(image)),
            None if req.clear_image => Some(None),
            None => None,
        };

        Ok(RecordPatch {
            description: req.description.clone(),
            status: req.status.as_deref().map(str::parse).transpose()?,
            warehouse: req.warehouse.as_deref().map(str::parse).transpose()?,
            image,
        })
    }

    /// Fetches a fresh collection, then swaps it in under the write lock.
    /// A fetch that started before the one already in place is dropped, so
    /// overlapping reloads never replace a newer list with an older one.
    async fn refresh(&self) -> AppResult<()> {
        let generation = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        let fresh = RecordCollection::load(&self.gateway).await?;

        let mut current = self.collection.write().await;
        if generation > current.generation {
            *current = Snapshot {
                generation,
                collection: fresh,
            };
        } else {
            tracing::debug!(
                "Discarding reload {}, collection already at {}",
                generation,
                current.generation
            );
        }
        Ok(())
    }

    async fn ensure_loaded(&self) -> AppResult<()> {
        if self.collection.read().await.collection.is_loaded() {
            return Ok(());
        }
        self.refresh().await
    }

    /// Reloads after a write. A failed reload leaves the previous view in place.
    async fn settle<T>(&self, mutation: Mutation<T>) -> T {
        if let Err(e) = self.refresh().await {
            tracing::warn!("Reload after write failed, serving stale collection: {}", e);
        }
        mutation.into_inner()
    }

    fn require_id(id: &str) -> Result<(), Status> {
        if id.is_empty() {
            return Err(Status::invalid_argument("id is required"));
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl InventoryService for InventoryServiceImpl {
    async fn create_item(
        &self,
        request: Request<CreateItemReq>,
    ) -> Result<Response<CreateItemRes>, Status> {
        let req = request.into_inner();
        let action = "save the item";

        let fields = Self::fields_from_wire(
            &req.description,
            &req.status,
            &req.warehouse,
            &req.image_url,
            &req.image_public_id,
        )
        .map_err(|e| Self::failure(action, e))?;

        let mutation = InventoryForm::create()
            .with_fields(fields)
            .submit(&self.gateway)
            .await
            .map_err(|e| Self::failure(action, e))?;
        let outcome = self.settle(mutation).await;

        Ok(Response::new(CreateItemRes {
            id: outcome.id().to_string(),
            message: outcome.message().to_string(),
        }))
    }

    async fn update_item(
        &self,
        request: Request<UpdateItemReq>,
    ) -> Result<Response<UpdateItemRes>, Status> {
        let req = request.into_inner();
        Self::require_id(&req.id)?;
        let action = "save the item";

        let fields = Self::fields_from_wire(
            &req.description,
            &req.status,
            &req.warehouse,
            &req.image_url,
            &req.image_public_id,
        )
        .map_err(|e| Self::failure(action, e))?;

        let mutation = InventoryForm::edit_with(req.id, fields)
            .submit(&self.gateway)
            .await
            .map_err(|e| Self::failure(action, e))?;
        let outcome = self.settle(mutation).await;

        Ok(Response::new(UpdateItemRes {
            message: outcome.message().to_string(),
        }))
    }

    async fn patch_item(
        &self,
        request: Request<PatchItemReq>,
    ) -> Result<Response<UpdateItemRes>, Status> {
        let req = request.into_inner();
        Self::require_id(&req.id)?;
        let action = "update the item";

        let patch = Self::patch_from_wire(&req).map_err(|e| Self::failure(action, e))?;
        if patch.is_empty() {
            return Err(Status::invalid_argument("nothing to update"));
        }

        let mutation = self
            .gateway
            .update(&req.id, &patch)
            .await
            .map_err(|e| Self::failure(action, e))?;
        self.settle(mutation).await;

        Ok(Response::new(UpdateItemRes {
            message: "Item updated successfully".to_string(),
        }))
    }

    async fn delete_item(
        &self,
        request: Request<DeleteItemReq>,
    ) -> Result<Response<DeleteItemRes>, Status> {
        let req = request.into_inner();
        Self::require_id(&req.id)?;

        let mutation = self
            .gateway
            .delete(&req.id)
            .await
            .map_err(|e| Self::failure("delete the item", e))?;
        self.settle(mutation).await;

        Ok(Response::new(DeleteItemRes {
            message: "Item deleted successfully".to_string(),
        }))
    }

    async fn list_items(
        &self,
        request: Request<ListItemsReq>,
    ) -> Result<Response<ListItemsRes>, Status> {
        let req = request.into_inner();
        let action = "load the inventory";

        let criteria = FilterCriteria::parse(&req.query, &req.status, &req.warehouse)
            .map_err(|e| Self::failure(action, e))?;

        let loaded = if req.reload {
            self.refresh().await
        } else {
            self.ensure_loaded().await
        };
        loaded.map_err(|e| Self::failure(action, e))?;

        let snapshot = self.collection.read().await;
        let collection = &snapshot.collection;
        let items: Vec<Item> = collection
            .view(&criteria)
            .iter()
            .map(Self::record_to_proto)
            .collect();
        let stats = collection.stats();

        Ok(Response::new(ListItemsRes {
            total_count: items.len() as u32,
            items,
            stats: Some(ItemStats {
                total: stats.total as u32,
                new_count: stats.new as u32,
                used_count: stats.used as u32,
            }),
        }))
    }

    async fn export_items(
        &self,
        request: Request<ExportItemsReq>,
    ) -> Result<Response<ExportItemsRes>, Status> {
        let req = request.into_inner();
        let action = "export the inventory";

        let format: ExportFormat = req.format.parse().map_err(|e| Self::failure(action, e))?;
        let criteria = if req.filtered {
            Some(
                FilterCriteria::parse(&req.query, &req.status, &req.warehouse)
                    .map_err(|e| Self::failure(action, e))?,
            )
        } else {
            None
        };

        self.ensure_loaded()
            .await
            .map_err(|e| Self::failure(action, e))?;

        let records = {
            let snapshot = self.collection.read().await;
            let collection = &snapshot.collection;
            match &criteria {
                Some(criteria) => collection.view(criteria),
                None => collection.records().to_vec(),
            }
        };

        let base_name = if req.base_name.trim().is_empty() {
            self.base_name.clone()
        } else {
            req.base_name.trim().to_string()
        };
        let locale = self.locale.clone();
        let item_count = records.len();

        let file = tokio::task::spawn_blocking(move || {
            export::export(&records, format, &base_name, &locale, Utc::now())
        })
        .await
        .map_err(|e| AppError::Internal(format!("Export task failed: {}", e)))
        .and_then(|result| result)
        .map_err(|e| Self::failure(action, e))?;

        Ok(Response::new(ExportItemsRes {
            file_name: file.file_name,
            content_type: file.content_type.to_string(),
            data: file.bytes,
            item_count: item_count as u32,
            message: format!("Exported {} items", item_count),
        }))
    }

    async fn upload_image(
        &self,
        request: Request<UploadImageReq>,
    ) -> Result<Response<UploadImageRes>, Status> {
        let req = request.into_inner();
        let action = "upload the image";

        let Some(media) = &self.media else {
            return Err(Status::failed_precondition("Image uploads are not configured"));
        };

        let upload = ImageUpload::new(&req.file_name, &req.content_type, req.data)
            .map_err(|e| Self::failure(action, e))?;
        let image = media
            .upload(&upload)
            .await
            .map_err(|e| Self::failure(action, e))?;

        tracing::info!(
            "Image uploaded: host={}, public_id={}, size={}",
            media.name(),
            image.public_id,
            upload.len()
        );

        Ok(Response::new(UploadImageRes {
            image_url: image.url,
            image_public_id: image.public_id,
        }))
    }
}
