// S3 client backed by rust-s3

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::ObjectStore;
use crate::config::StorageConfig;
use crate::types::{
    DeleteObjectRequest, DeleteOutput, GetObjectRequest, ObjectData, PutObjectRequest,
    StorageError, StorageResult,
};

const METADATA_HEADER_PREFIX: &str = "x-amz-meta-";
// What S3 itself stores when a put carries no content type
const UNSPECIFIED_CONTENT_TYPE: &str = "binary/octet-stream";

pub struct S3Client {
    bucket: Box<Bucket>,
}

impl S3Client {
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let credentials = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key), Some(secret_key)) => {
                Credentials::new(
                    Some(access_key.as_str()),
                    Some(secret_key.as_str()),
                    None,
                    None,
                    None,
                )?
            }
            _ => Credentials::default().or_else(|e| {
                warn!("No S3 credentials found ({}), sending unsigned requests", e);
                Credentials::anonymous()
            })?,
        };

        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => Region::Custom {
                region: config.region.clone(),
                endpoint: format!("https://s3.{}.amazonaws.com", config.region),
            },
        };

        let bucket = Bucket::new(&config.bucket, region, credentials)?;
        let bucket = if config.path_style {
            Box::new(bucket.with_path_style())
        } else {
            Box::new(bucket)
        };

        info!(
            "S3 client ready for bucket {} in {} (path style: {})",
            config.bucket, config.region, config.path_style
        );
        Ok(Self { bucket })
    }

    /// Map the SDK error for `key`, surfacing 404 as `NotFound`.
    fn map_error(key: &str, err: S3Error) -> StorageError {
        match err {
            S3Error::HttpFailWithBody(404, _) => StorageError::not_found(key),
            other => StorageError::Service(other),
        }
    }
}

fn header(headers: &HashMap<String, String>, name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.clone())
}

fn user_metadata(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| {
            let lower = k.to_lowercase();
            lower
                .strip_prefix(METADATA_HEADER_PREFIX)
                .map(|name| (name.to_string(), v.clone()))
        })
        .collect()
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn get_object(&self, request: GetObjectRequest) -> StorageResult<ObjectData> {
        debug!("S3 GetObject: bucket={}, key={}", request.bucket, request.key);

        let response = match request.range {
            Some(range) => {
                self.bucket
                    .get_object_range(&request.key, range.start, range.end)
                    .await
            }
            None => self.bucket.get_object(&request.key).await,
        }
        .map_err(|e| Self::map_error(&request.key, e))?;

        let headers = response.headers();
        let body = response.bytes().clone();
        Ok(ObjectData {
            content_length: body.len() as u64,
            body,
            content_type: header(&headers, "content-type"),
            content_disposition: header(&headers, "content-disposition"),
            cache_control: header(&headers, "cache-control"),
            etag: header(&headers, "etag"),
            metadata: user_metadata(&headers),
        })
    }

    async fn put_object(&self, request: PutObjectRequest) -> StorageResult<()> {
        debug!(
            "S3 PutObject: bucket={}, key={}, size={}",
            request.bucket,
            request.key,
            request.body.len()
        );

        // Per-request headers go on a clone so concurrent puts do not share them
        let mut bucket = (*self.bucket).clone();
        bucket.add_header("x-amz-acl", &request.acl);
        bucket.add_header("Content-Disposition", &request.content_disposition);
        if let Some(cache_control) = &request.cache_control {
            bucket.add_header("Cache-Control", cache_control);
        }
        for (name, value) in &request.metadata {
            bucket.add_header(&format!("{}{}", METADATA_HEADER_PREFIX, name), value);
        }

        let content_type = request
            .content_type
            .as_deref()
            .unwrap_or(UNSPECIFIED_CONTENT_TYPE);
        bucket
            .put_object_with_content_type(&request.key, &request.body, content_type)
            .await
            .map_err(|e| Self::map_error(&request.key, e))?;
        Ok(())
    }

    async fn delete_object(&self, request: DeleteObjectRequest) -> StorageResult<DeleteOutput> {
        debug!("S3 DeleteObject: bucket={}, key={}", request.bucket, request.key);

        let response = self
            .bucket
            .delete_object(&request.key)
            .await
            .map_err(|e| Self::map_error(&request.key, e))?;

        Ok(DeleteOutput {
            key: request.key,
            status_code: response.status_code(),
        })
    }
}
