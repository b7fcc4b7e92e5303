pub mod document;
pub mod pool;
pub mod postgres;
pub mod store;

pub use document::InventoryDocument;
pub use pool::create_pool;
pub use postgres::PgDocumentStore;
pub use store::{DocumentStore, MemoryDocumentStore, StoredDocument};
