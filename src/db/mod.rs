//! Database layer - connection pooling, table schema, and batch loading

pub mod insert;
pub mod loader;
pub mod pool;
pub mod schema;

pub use loader::{BatchSink, TableLoader};
pub use pool::Pool;
pub use schema::Schema;
