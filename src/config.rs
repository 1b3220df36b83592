use crate::types::{StorageError, StorageResult};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_LOCAL_ROOT: &str = "/tmp/buckets";
pub const PROVIDER_DOMAIN: &str = "s3.amazonaws.com";

static DEFAULT_CONFIG: Lazy<RwLock<Option<StorageConfig>>> = Lazy::new(|| RwLock::new(None));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    S3,
    Local,
}

impl std::str::FromStr for StorageProvider {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s3" => Ok(StorageProvider::S3),
            "local" => Ok(StorageProvider::Local),
            other => Err(StorageError::Configuration(format!(
                "Unknown storage provider: {}",
                other
            ))),
        }
    }
}

/// Resolved bucket configuration. `url` is always derived from `bucket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub url: String,
    pub provider: StorageProvider,
    pub endpoint: Option<String>,
    pub path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub local_root: PathBuf,
}

impl StorageConfig {
    /// Fully qualified URL for a normalized key.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.url, key)
    }
}

pub fn bucket_url(bucket: &str) -> String {
    format!("https://{}.{}", bucket, PROVIDER_DOMAIN)
}

/// Explicit per-call configuration. Unset fields fall through to the
/// previous config (when `extend_config` is set) and then to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub provider: Option<StorageProvider>,
    pub endpoint: Option<String>,
    pub path_style: Option<bool>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub local_root: Option<PathBuf>,
    pub extend_config: bool,
}

impl ConfigOverrides {
    pub fn bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_provider(mut self, provider: StorageProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_root = Some(root.into());
        self
    }

    pub fn extending(mut self) -> Self {
        self.extend_config = true;
        self
    }
}

/// Values read from the process environment (after loading `.env`).
#[derive(Debug, Clone, Default)]
pub struct EnvDefaults {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub path_style: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub local_root: Option<String>,
}

impl EnvDefaults {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            bucket: env::var("S3_BUCKET").ok(),
            region: env::var("S3_REGION").ok(),
            provider: env::var("STORAGE_PROVIDER").ok(),
            endpoint: env::var("S3_ENDPOINT").ok(),
            path_style: env::var("S3_PATH_STYLE").ok(),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            local_root: env::var("S3_LOCAL_ROOT").ok(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Merge explicit fields over the previous config (only with
/// `extend_config`) over environment defaults.
pub fn resolve(
    overrides: ConfigOverrides,
    previous: Option<&StorageConfig>,
    env: &EnvDefaults,
) -> StorageResult<StorageConfig> {
    let previous = previous.filter(|_| overrides.extend_config);

    let bucket = overrides
        .bucket
        .or_else(|| previous.map(|p| p.bucket.clone()))
        .or_else(|| env.bucket.clone())
        .unwrap_or_default();
    if bucket.is_empty() {
        return Err(StorageError::Configuration(
            "Requires bucket for initialization".to_string(),
        ));
    }

    // Unlike the bucket, an empty region is treated as unset and falls back
    let region = non_empty(overrides.region)
        .or_else(|| previous.map(|p| p.region.clone()))
        .or_else(|| non_empty(env.region.clone()))
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

    let provider = match overrides.provider.or_else(|| previous.map(|p| p.provider)) {
        Some(provider) => provider,
        None => match non_empty(env.provider.clone()) {
            Some(raw) => raw.parse()?,
            None => StorageProvider::default(),
        },
    };

    let path_style = match overrides.path_style.or_else(|| previous.map(|p| p.path_style)) {
        Some(flag) => flag,
        None => match non_empty(env.path_style.clone()) {
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| {
                StorageError::Configuration(format!("S3_PATH_STYLE must be true or false, got {}", raw))
            })?,
            None => false,
        },
    };

    let endpoint = non_empty(overrides.endpoint)
        .or_else(|| previous.and_then(|p| p.endpoint.clone()))
        .or_else(|| non_empty(env.endpoint.clone()));
    let access_key_id = non_empty(overrides.access_key_id)
        .or_else(|| previous.and_then(|p| p.access_key_id.clone()))
        .or_else(|| non_empty(env.access_key_id.clone()));
    let secret_access_key = non_empty(overrides.secret_access_key)
        .or_else(|| previous.and_then(|p| p.secret_access_key.clone()))
        .or_else(|| non_empty(env.secret_access_key.clone()));
    let local_root = overrides
        .local_root
        .or_else(|| previous.map(|p| p.local_root.clone()))
        .or_else(|| non_empty(env.local_root.clone()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_ROOT));

    debug!("Resolved storage config for bucket {} in {}", bucket, region);

    Ok(StorageConfig {
        url: bucket_url(&bucket),
        bucket,
        region,
        provider,
        endpoint,
        path_style,
        access_key_id,
        secret_access_key,
        local_root,
    })
}

/// Resolve `overrides` against the environment and replace the process-wide
/// default config with the result.
pub fn init(overrides: ConfigOverrides) -> StorageResult<StorageConfig> {
    init_with(overrides, &EnvDefaults::from_env())
}

pub fn init_with(overrides: ConfigOverrides, env: &EnvDefaults) -> StorageResult<StorageConfig> {
    let mut guard = DEFAULT_CONFIG.write();
    let config = resolve(overrides, guard.as_ref(), env)?;
    info!("Initialized default storage config for bucket {}", config.bucket);
    *guard = Some(config.clone());
    Ok(config)
}

/// Clear the process-wide default config.
pub fn reset() {
    *DEFAULT_CONFIG.write() = None;
}

pub fn current() -> Option<StorageConfig> {
    DEFAULT_CONFIG.read().clone()
}

/// Return the cached default config, resolving it from the environment on
/// first use.
pub fn cached_or_resolve() -> StorageResult<StorageConfig> {
    cached_or_resolve_with(EnvDefaults::from_env)
}

pub fn cached_or_resolve_with<F>(load_env: F) -> StorageResult<StorageConfig>
where
    F: FnOnce() -> EnvDefaults,
{
    if let Some(config) = DEFAULT_CONFIG.read().as_ref() {
        return Ok(config.clone());
    }

    let mut guard = DEFAULT_CONFIG.write();
    // Another caller may have resolved it between the two locks
    if let Some(config) = guard.as_ref() {
        return Ok(config.clone());
    }
    let config = resolve(ConfigOverrides::default(), None, &load_env())?;
    info!("Resolved default storage config for bucket {} from environment", config.bucket);
    *guard = Some(config.clone());
    Ok(config)
}
