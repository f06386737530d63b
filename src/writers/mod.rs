pub mod parquet_store;
pub mod relation;
pub mod store;

pub use parquet_store::{ParquetStore, RelationInfo};
pub use relation::Relation;
pub use store::{append_rows, load_rows, MemoryStore, Store};
