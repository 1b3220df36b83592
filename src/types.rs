// Type definitions shared by the client and the storage providers

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_ACL: &str = "public-read";
pub const DEFAULT_CONTENT_DISPOSITION: &str = "inline";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No such key: {key}")]
    NotFound { key: String },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("S3 error: {0}")]
    Service(#[from] s3::error::S3Error),

    #[error("Credentials error: {0}")]
    Credentials(#[from] s3::creds::error::CredentialsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_found(key: impl Into<String>) -> Self {
        StorageError::NotFound { key: key.into() }
    }

    /// True when the service reported that the key does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// What to upload: bytes already in memory, or a local file to read first.
#[derive(Debug, Clone)]
pub enum FileSource {
    Bytes(Bytes),
    Path(PathBuf),
}

impl FileSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        FileSource::Path(path.into())
    }

    pub async fn read(self) -> StorageResult<Bytes> {
        match self {
            FileSource::Bytes(bytes) => Ok(bytes),
            FileSource::Path(path) => Ok(Bytes::from(tokio::fs::read(&path).await?)),
        }
    }
}

impl From<Vec<u8>> for FileSource {
    fn from(data: Vec<u8>) -> Self {
        FileSource::Bytes(Bytes::from(data))
    }
}

impl From<&'static str> for FileSource {
    fn from(data: &'static str) -> Self {
        FileSource::Bytes(Bytes::from_static(data.as_bytes()))
    }
}

impl From<Bytes> for FileSource {
    fn from(data: Bytes) -> Self {
        FileSource::Bytes(data)
    }
}

/// Inclusive byte range, `end: None` reads to the end of the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    /// Slice an in-memory body the way an HTTP range request would.
    pub fn apply(&self, body: &Bytes) -> Bytes {
        let len = body.len() as u64;
        if self.start >= len {
            return Bytes::new();
        }
        let end = self.end.map(|e| e.min(len - 1)).unwrap_or(len - 1);
        if end < self.start {
            return Bytes::new();
        }
        body.slice(self.start as usize..=end as usize)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub range: Option<ByteRange>,
}

/// Extra upload parameters. `acl` and `content_disposition` replace the
/// public-read / inline defaults when set.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub acl: Option<String>,
    pub content_disposition: Option<String>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct GetObjectRequest {
    pub bucket: String,
    pub key: String,
    pub range: Option<ByteRange>,
}

#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub acl: String,
    pub content_disposition: String,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct DeleteObjectRequest {
    pub bucket: String,
    pub key: String,
}

/// Object body plus whatever metadata the provider returned.
#[derive(Debug, Clone, Default)]
pub struct ObjectData {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    pub content_length: u64,
    pub etag: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutput {
    pub key: String,
    pub status_code: u16,
}
