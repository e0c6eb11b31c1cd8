//! I/O layer: downloading the source file and checking the local staging copy

pub mod fetcher;
pub mod staging;

pub use fetcher::Fetcher;
pub use staging::StagingFile;
