// Storage layer: object client over a pluggable S3-compatible store

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{self, ConfigOverrides, EnvDefaults, StorageConfig, StorageProvider};
use crate::types::{
    DeleteObjectRequest, DeleteOutput, FileSource, GetObjectRequest, GetOptions, ObjectData,
    PutObjectRequest, PutOptions, StorageResult, DEFAULT_ACL, DEFAULT_CONTENT_DISPOSITION,
};
use crate::utils::{content_type_for, normalize_key, present};

pub mod local;
pub mod memory;
pub mod s3_client;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use s3_client::S3Client;

/// The storage service a client delegates every byte operation to.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, request: GetObjectRequest) -> StorageResult<ObjectData>;
    async fn put_object(&self, request: PutObjectRequest) -> StorageResult<()>;
    async fn delete_object(&self, request: DeleteObjectRequest) -> StorageResult<DeleteOutput>;
}

/// Build the store selected by `config.provider`.
pub fn build_store(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.provider {
        StorageProvider::S3 => Ok(Arc::new(S3Client::new(config)?)),
        StorageProvider::Local => Ok(Arc::new(LocalStore::new(&config.local_root))),
    }
}

/// Get, save and delete files in one bucket.
#[derive(Clone)]
pub struct ObjectClient {
    config: StorageConfig,
    store: Arc<dyn ObjectStore>,
}

impl ObjectClient {
    pub fn new(config: StorageConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, store }
    }

    /// Resolve `overrides` against the environment and connect to the
    /// configured provider. The process-wide default is left untouched.
    pub fn connect(overrides: ConfigOverrides) -> StorageResult<Self> {
        let previous = config::current();
        let config = config::resolve(overrides, previous.as_ref(), &EnvDefaults::from_env())?;
        let store = build_store(&config)?;
        Ok(Self::new(config, store))
    }

    /// Connect with the process-wide default config, resolving it from the
    /// environment on first use.
    pub fn from_default() -> StorageResult<Self> {
        let config = config::cached_or_resolve()?;
        let store = build_store(&config)?;
        Ok(Self::new(config, store))
    }

    /// Use the process-wide default config with an already built store.
    pub fn from_default_with_store(store: Arc<dyn ObjectStore>) -> StorageResult<Self> {
        Ok(Self::new(config::cached_or_resolve()?, store))
    }

    /// Eagerly resolve and cache the process-wide default config.
    pub fn init(overrides: ConfigOverrides) -> StorageResult<StorageConfig> {
        config::init(overrides)
    }

    /// Forget the process-wide default config.
    pub fn reset() {
        config::reset()
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Base URL of the bucket.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn url_for(&self, path: &str) -> String {
        self.config.url_for(normalize_key(path, &self.config.url))
    }

    /// Fetch an object. `path` may be a bare key or a fully qualified URL
    /// into this bucket.
    pub async fn get(&self, path: &str, options: GetOptions) -> StorageResult<ObjectData> {
        let key = normalize_key(path, &self.config.url).to_string();
        debug!("Getting s3://{}/{}", self.config.bucket, key);

        let inferred = content_type_for(&key);
        let mut data = self
            .store
            .get_object(GetObjectRequest {
                bucket: self.config.bucket.clone(),
                key,
                range: options.range,
            })
            .await?;

        if data.content_type.is_none() {
            data.content_type = inferred.map(str::to_string);
        }
        Ok(data)
    }

    /// Upload `source` to `path` and return its URL. Missing `path` or
    /// `source` is skipped with `Ok(None)`.
    pub async fn save(
        &self,
        path: Option<&str>,
        source: Option<FileSource>,
        options: PutOptions,
    ) -> StorageResult<Option<String>> {
        let (path, source) = match (present(path), source) {
            (Some(path), Some(source)) => (path, source),
            _ => {
                debug!("Skipping save with missing path or source");
                return Ok(None);
            }
        };

        let body = source.read().await?;
        let key = normalize_key(path, &self.config.url).to_string();
        // A recognised extension takes precedence over a caller-supplied type
        let content_type = content_type_for(&key)
            .map(str::to_string)
            .or(options.content_type);

        let size = body.len();
        self.store
            .put_object(PutObjectRequest {
                bucket: self.config.bucket.clone(),
                key: key.clone(),
                body,
                acl: options.acl.unwrap_or_else(|| DEFAULT_ACL.to_string()),
                content_disposition: options
                    .content_disposition
                    .unwrap_or_else(|| DEFAULT_CONTENT_DISPOSITION.to_string()),
                content_type,
                cache_control: options.cache_control,
                metadata: options.metadata,
            })
            .await?;

        let url = self.config.url_for(&key);
        info!("Saved {} bytes to {}", size, url);
        Ok(Some(url))
    }

    /// Delete the object at `path`. Missing `path` is skipped with `Ok(None)`.
    pub async fn delete(&self, path: Option<&str>) -> StorageResult<Option<DeleteOutput>> {
        let Some(path) = present(path) else {
            debug!("Skipping delete with missing path");
            return Ok(None);
        };

        let key = normalize_key(path, &self.config.url).to_string();
        let output = self
            .store
            .delete_object(DeleteObjectRequest {
                bucket: self.config.bucket.clone(),
                key,
            })
            .await?;

        info!("Deleted s3://{}/{}", self.config.bucket, output.key);
        Ok(Some(output))
    }
}

impl std::fmt::Debug for ObjectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectClient")
            .field("bucket", &self.config.bucket)
            .field("url", &self.config.url)
            .finish()
    }
}
