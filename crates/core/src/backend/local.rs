use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::Backend;
use crate::error::{StoreError, StoreResult};
use crate::object::validate_name;

pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Opens an existing root without creating it.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            root: path.as_ref().to_path_buf(),
        }
    }

    /// Opens the root, creating it first if it is absent.
    pub fn init(path: impl AsRef<Path>) -> StoreResult<Self> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create directory: {}", root.display()))?;
        debug!(root = %root.display(), "Local storage root ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, name: &str) -> StoreResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Metadata of the entry itself; symlinks are never followed.
    async fn entry(&self, full: &Path) -> StoreResult<Option<std::fs::Metadata>> {
        match tokio::fs::symlink_metadata(full).await {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e, "stat", full)),
        }
    }
}

fn io_error(err: std::io::Error, action: &str, path: &Path) -> StoreError {
    StoreError::Io(anyhow::Error::new(err).context(format!("failed to {action}: {}", path.display())))
}

fn missing_or_io(err: std::io::Error, name: &str, action: &str, path: &Path) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::not_found(name)
    } else {
        io_error(err, action, path)
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn read(&self, name: &str) -> StoreResult<Bytes> {
        let full = self.full_path(name)?;
        // Only regular files count; a symlink could point outside the root.
        if !self.entry(&full).await?.is_some_and(|m| m.is_file()) {
            return Err(StoreError::not_found(name));
        }
        tokio::fs::read(&full)
            .await
            .map(Bytes::from)
            .map_err(|e| missing_or_io(e, name, "read", &full))
    }

    async fn write(&self, name: &str, data: &[u8]) -> StoreResult<()> {
        let full = self.full_path(name)?;
        if self.entry(&full).await?.is_some_and(|m| !m.is_file()) {
            return Err(StoreError::Io(anyhow::anyhow!(
                "refusing to write over non-regular entry: {}",
                full.display()
            )));
        }
        tokio::fs::write(&full, data)
            .await
            .map_err(|e| io_error(e, "write", &full))
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        let full = self.full_path(name)?;
        Ok(self.entry(&full).await?.is_some_and(|m| m.is_file()))
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let mut read_dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| io_error(e, "list", &self.root))?;
        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| io_error(e, "list", &self.root))?
        {
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }

    async fn delete(&self, name: &str) -> StoreResult<()> {
        let full = self.full_path(name)?;
        if !self.exists(name).await? {
            return Err(StoreError::not_found(name));
        }
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| missing_or_io(e, name, "delete", &full))
    }
}
