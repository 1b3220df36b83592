// S3 Files - get, save and delete files in a single S3 bucket

pub mod config;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::{ConfigOverrides, StorageConfig, StorageProvider};
pub use storage::{ObjectClient, ObjectStore};
pub use types::{FileSource, GetOptions, PutOptions, StorageError, StorageResult};
