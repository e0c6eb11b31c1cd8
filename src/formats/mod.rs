//! File format readers

pub mod parquet;
pub mod reader;

pub use reader::{BatchSource, Record};
