use std::net::SocketAddr;
use std::sync::Arc;

use rust_inventory::config::{Config, MediaConfig};
use rust_inventory::db::{create_pool, DocumentStore, MemoryDocumentStore, PgDocumentStore};
use rust_inventory::gateway::RecordGateway;
use rust_inventory::proto::health::health_server::HealthServer;
use rust_inventory::proto::inventory::inventory_service_server::InventoryServiceServer;
use rust_inventory::proto::FILE_DESCRIPTOR_SET;
use rust_inventory::services::{HealthServiceImpl, InventoryServiceImpl};
use rust_inventory::storage::{CloudinaryHost, MediaHost, R2Host, MAX_IMAGE_BYTES};

use tonic::transport::Server;
use tonic_reflection::server::Builder as ReflectionBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Room for a full-size image or report plus protobuf framing
const MAX_MESSAGE_BYTES: usize = MAX_IMAGE_BYTES + 3 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_inventory=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting rust-inventory gRPC server...");

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let store = PgDocumentStore::new(create_pool(url).await?);
            store.migrate().await?;
            tracing::info!("Database connection established");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, records are kept in memory only");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let media: Option<Arc<dyn MediaHost>> = match &config.media {
        Some(MediaConfig::Cloudinary {
            cloud_name,
            upload_preset,
            api_key,
            api_secret,
        }) => {
            tracing::info!("Image storage enabled: cloudinary, cloud={}", cloud_name);
            Some(Arc::new(CloudinaryHost::new(
                cloud_name.clone(),
                upload_preset.clone(),
                api_key.clone(),
                api_secret.clone(),
            )))
        }
        Some(MediaConfig::R2 {
            bucket,
            account_id,
            access_key,
            secret_key,
            public_url,
        }) => match R2Host::new(
            bucket.clone(),
            account_id.clone(),
            access_key.clone(),
            secret_key.clone(),
            public_url.clone(),
        ) {
            Ok(host) => {
                tracing::info!("Image storage enabled: r2, bucket={}", bucket);
                Some(Arc::new(host))
            }
            Err(e) => {
                tracing::error!("Failed to create R2 client: {}", e);
                None
            }
        },
        None => {
            tracing::info!("Image storage disabled");
            None
        }
    };

    // Create services
    let gateway = Arc::new(RecordGateway::new(store.clone(), media.clone()));
    let inventory_service = InventoryServiceImpl::new(gateway, media)
        .with_export_settings(config.export_base_name.clone(), config.report_locale.clone());
    let health_service = HealthServiceImpl::new(store);

    // CORS layer for gRPC-Web
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any)
        .expose_headers(Any);

    // Build reflection service
    let reflection_service = ReflectionBuilder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!("Listening on {}", addr);

    Server::builder()
        .accept_http1(true) // Required for gRPC-Web
        .layer(cors)
        .layer(tonic_web::GrpcWebLayer::new())
        .add_service(reflection_service)
        .add_service(
            InventoryServiceServer::new(inventory_service)
                .max_decoding_message_size(MAX_MESSAGE_BYTES)
                .max_encoding_message_size(MAX_MESSAGE_BYTES),
        )
        .add_service(HealthServer::new(health_service))
        .serve(addr)
        .await?;

    Ok(())
}
