use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use imgstore_core::backend::Backend;
use imgstore_core::backend::local::LocalBackend;
use imgstore_core::backend::s3::S3Backend;
use imgstore_core::{ImageStore, StoreOptions};

const CONFIG_FILE: &str = "imgstore.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(flatten)]
    pub options: StoreOptions,
    pub backend: BackendConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    #[serde(rename = "local")]
    Local { path: String },
    #[serde(rename = "s3")]
    S3 {
        endpoint: String,
        region: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        prefix: Option<String>,
    },
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Local { path } => f.debug_struct("Local").field("path", path).finish(),
            BackendConfig::S3 {
                endpoint,
                region,
                bucket,
                access_key,
                secret_key: _,
                prefix,
            } => f
                .debug_struct("S3")
                .field("endpoint", endpoint)
                .field("region", region)
                .field("bucket", bucket)
                .field("access_key", access_key)
                .field("secret_key", &"<redacted>")
                .field("prefix", prefix)
                .finish(),
        }
    }
}

impl BackendConfig {
    /// Builds the one backend this process will use. A local root is
    /// created if it does not exist yet.
    pub fn open(&self) -> Result<Arc<dyn Backend>> {
        match self {
            BackendConfig::Local { path } => Ok(Arc::new(LocalBackend::init(path)?)),
            BackendConfig::S3 {
                endpoint,
                region,
                bucket,
                access_key,
                secret_key,
                prefix,
            } => {
                let backend = S3Backend::new(
                    bucket,
                    endpoint,
                    region,
                    access_key,
                    secret_key,
                    prefix.as_deref(),
                )?;
                Ok(Arc::new(backend))
            }
        }
    }
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("imgstore")
            .join(CONFIG_FILE)
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("config not found at {}", path.display()))?;
        toml::from_str(&content).context("failed to parse config")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn open_store(&self) -> Result<ImageStore> {
        let backend = self.storage.backend.open()?;
        Ok(ImageStore::with_options(backend, self.storage.options))
    }
}
