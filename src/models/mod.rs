pub mod inventory_record;

pub use inventory_record::*;
