pub mod health_service;
pub mod inventory_service;

pub use health_service::HealthServiceImpl;
pub use inventory_service::InventoryServiceImpl;
