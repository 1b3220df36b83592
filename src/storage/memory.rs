// In-process object store

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::ObjectStore;
use crate::types::{
    DeleteObjectRequest, DeleteOutput, GetObjectRequest, ObjectData, PutObjectRequest,
    StorageError, StorageResult,
};

/// Keeps every object in a map keyed by `(bucket, key)`.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), PutObjectRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last put request stored under `bucket`/`key`.
    pub fn stored(&self, bucket: &str, key: &str) -> Option<PutObjectRequest> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, request: GetObjectRequest) -> StorageResult<ObjectData> {
        let objects = self.objects.lock();
        let object = objects
            .get(&(request.bucket, request.key.clone()))
            .ok_or_else(|| StorageError::not_found(&request.key))?;

        let body = match request.range {
            Some(range) => range.apply(&object.body),
            None => object.body.clone(),
        };
        Ok(ObjectData {
            content_length: body.len() as u64,
            body,
            content_type: object.content_type.clone(),
            content_disposition: Some(object.content_disposition.clone()),
            cache_control: object.cache_control.clone(),
            etag: None,
            metadata: object.metadata.clone(),
        })
    }

    async fn put_object(&self, request: PutObjectRequest) -> StorageResult<()> {
        self.objects
            .lock()
            .insert((request.bucket.clone(), request.key.clone()), request);
        Ok(())
    }

    async fn delete_object(&self, request: DeleteObjectRequest) -> StorageResult<DeleteOutput> {
        // S3 reports success for keys that do not exist
        self.objects
            .lock()
            .remove(&(request.bucket, request.key.clone()));
        Ok(DeleteOutput {
            key: request.key,
            status_code: 204,
        })
    }
}
