// Filesystem-backed object store

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use super::ObjectStore;
use crate::types::{
    DeleteObjectRequest, DeleteOutput, GetObjectRequest, ObjectData, PutObjectRequest,
    StorageError, StorageResult,
};

const META_DIR: &str = ".meta";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ObjectMeta {
    acl: String,
    content_disposition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Objects live at `{root}/{bucket}/{key}`; the headers S3 would keep with
/// the body go to `{root}/{bucket}/.meta/{key}.json`.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reject keys that would resolve outside the bucket directory.
    fn relative_key(key: &str) -> StorageResult<PathBuf> {
        let path = Path::new(key);
        let mut relative = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                _ => return Err(StorageError::InvalidKey(key.to_string())),
            }
        }
        if relative.as_os_str().is_empty() || relative.starts_with(META_DIR) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(relative)
    }

    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        Ok(self.root.join(bucket).join(Self::relative_key(key)?))
    }

    fn meta_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        let mut path = self.root.join(bucket).join(META_DIR).join(Self::relative_key(key)?);
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".json");
        path.set_file_name(name);
        Ok(path)
    }

    async fn write_file(path: &Path, data: &[u8]) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    async fn read_meta(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectMeta>> {
        match fs::read(self.meta_path(bucket, key)?).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

async fn remove_if_exists(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn get_object(&self, request: GetObjectRequest) -> StorageResult<ObjectData> {
        let path = self.object_path(&request.bucket, &request.key)?;
        let body = match fs::read(&path).await {
            Ok(raw) => Bytes::from(raw),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::not_found(request.key));
            }
            Err(e) => return Err(e.into()),
        };
        let meta = match self.read_meta(&request.bucket, &request.key).await {
            Ok(meta) => meta.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable metadata for {}: {}", request.key, e);
                ObjectMeta::default()
            }
        };

        let body = match request.range {
            Some(range) => range.apply(&body),
            None => body,
        };
        Ok(ObjectData {
            content_length: body.len() as u64,
            body,
            content_type: meta.content_type,
            content_disposition: Some(meta.content_disposition).filter(|d| !d.is_empty()),
            cache_control: meta.cache_control,
            etag: None,
            metadata: meta.metadata,
        })
    }

    async fn put_object(&self, request: PutObjectRequest) -> StorageResult<()> {
        let path = self.object_path(&request.bucket, &request.key)?;
        let meta_path = self.meta_path(&request.bucket, &request.key)?;

        Self::write_file(&path, &request.body).await?;
        let meta = ObjectMeta {
            acl: request.acl,
            content_disposition: request.content_disposition,
            content_type: request.content_type,
            cache_control: request.cache_control,
            metadata: request.metadata,
        };
        Self::write_file(&meta_path, &serde_json::to_vec_pretty(&meta)?).await?;

        debug!("Wrote {} bytes to {:?}", request.body.len(), path);
        Ok(())
    }

    async fn delete_object(&self, request: DeleteObjectRequest) -> StorageResult<DeleteOutput> {
        let path = self.object_path(&request.bucket, &request.key)?;
        let existed = remove_if_exists(&path).await?;
        remove_if_exists(&self.meta_path(&request.bucket, &request.key)?).await?;

        debug!("Deleted {:?} (existed: {})", path, existed);
        Ok(DeleteOutput {
            key: request.key,
            status_code: 204,
        })
    }
}
