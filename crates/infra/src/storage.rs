//! Uploaded file storage: an HTTP object store with a local-disk fallback.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use livebase_core::TenantId;

use crate::config::{ObjectStoreConfig, StorageConfig};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("local storage failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object store rejected upload with status {0}")]
    Rejected(u16),
}

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredFile {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn put(
        &self,
        key: &str,
        content_type: &str,
        content: Vec<u8>,
    ) -> Result<StoredFile, StorageError>;
}

/// Build the object key `<tenant>/<uuid>-<sanitised name>` for an upload.
pub fn object_key(tenant_id: TenantId, file_name: &str) -> String {
    let sanitised: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitised = sanitised.trim_start_matches('.');
    let name = if sanitised.is_empty() { "file" } else { sanitised };
    format!("{tenant_id}/{}-{name}", Uuid::now_v7())
}

fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Files under a directory on local disk.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(
        &self,
        key: &str,
        _content_type: &str,
        content: Vec<u8>,
    ) -> Result<StoredFile, StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(StoredFile {
            key: key.to_string(),
            url: join_url(&self.public_base_url, key),
        })
    }
}

/// Objects uploaded with `PUT <endpoint>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct HttpObjectStorage {
    client: reqwest::Client,
    config: ObjectStoreConfig,
}

impl HttpObjectStorage {
    pub fn new(client: reqwest::Client, config: ObjectStoreConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl FileStorage for HttpObjectStorage {
    fn name(&self) -> &'static str {
        "object_store"
    }

    async fn put(
        &self,
        key: &str,
        content_type: &str,
        content: Vec<u8>,
    ) -> Result<StoredFile, StorageError> {
        let url = join_url(&join_url(&self.config.endpoint, &self.config.bucket), key);
        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(content);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Rejected(response.status().as_u16()));
        }
        Ok(StoredFile {
            key: key.to_string(),
            url: join_url(&self.config.public_base_url, key),
        })
    }
}

/// Tries `primary` and falls back to `fallback` when it fails.
pub struct FallbackStorage {
    primary: Option<Box<dyn FileStorage>>,
    fallback: Box<dyn FileStorage>,
}

impl FallbackStorage {
    pub fn new(primary: Option<Box<dyn FileStorage>>, fallback: Box<dyn FileStorage>) -> Self {
        Self { primary, fallback }
    }

    /// Object store (when configured) over local disk.
    pub fn from_config(config: &StorageConfig) -> Self {
        let primary = config.object_store.clone().map(|object_store| {
            Box::new(HttpObjectStorage::new(reqwest::Client::new(), object_store))
                as Box<dyn FileStorage>
        });
        let fallback = Box::new(LocalFileStorage::new(
            config.local_root.clone(),
            config.public_base_url.clone(),
        ));
        Self::new(primary, fallback)
    }
}

#[async_trait]
impl FileStorage for FallbackStorage {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn put(
        &self,
        key: &str,
        content_type: &str,
        content: Vec<u8>,
    ) -> Result<StoredFile, StorageError> {
        if let Some(primary) = &self.primary {
            match primary.put(key, content_type, content.clone()).await {
                Ok(stored) => {
                    info!(key, backend = primary.name(), "file stored");
                    return Ok(stored);
                }
                Err(err) => warn!(
                    key,
                    backend = primary.name(),
                    fallback = self.fallback.name(),
                    error = %err,
                    "primary storage failed, falling back"
                ),
            }
        }
        let stored = self.fallback.put(key, content_type, content).await?;
        info!(key, backend = self.fallback.name(), "file stored");
        Ok(stored)
    }
}
