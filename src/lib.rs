pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filter;
pub mod form;
pub mod gateway;
pub mod models;
pub mod proto;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
