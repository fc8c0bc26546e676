use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::{StoreError, StoreResult};
use crate::object::{
    BatchItemResult, ImageUpload, ObjectInfo, content_type_from_name, generate_stored_name,
};

pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;
const MAX_NAME_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Items of one batch in flight at once.
    pub batch_concurrency: usize,
    /// Check the backend before using a generated name.
    pub verify_unique_names: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            verify_unique_names: false,
        }
    }
}

/// Image storage over whichever backend was configured at startup.
///
/// Single-item operations return the first error they hit. Batch operations
/// never fail as a whole: every item gets its own outcome, and duplicate
/// names in `load_multiple`, `delete_multiple` and `info_multiple` are
/// processed once, at their first occurrence.
#[derive(Clone)]
pub struct ImageStore {
    backend: Arc<dyn Backend>,
    options: StoreOptions,
}

impl ImageStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    pub fn with_options(backend: Arc<dyn Backend>, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Validate, name and persist one image. Returns the stored name.
    pub async fn upload(&self, file: &ImageUpload) -> StoreResult<String> {
        file.validate()?;
        let name = self.fresh_name(file.extension()).await?;
        self.backend.write(&name, &file.data).await?;
        info!(
            backend = self.backend.kind(),
            original = file.original_name.as_deref().unwrap_or("-"),
            stored = %name,
            size = file.data.len(),
            "Image stored"
        );
        Ok(name)
    }

    pub async fn list_all(&self) -> StoreResult<Vec<String>> {
        let names = self.backend.list().await?;
        debug!(backend = self.backend.kind(), count = names.len(), "Listed images");
        Ok(names)
    }

    pub async fn load(&self, name: &str) -> StoreResult<Bytes> {
        let data = self.backend.read(name).await?;
        debug!(backend = self.backend.kind(), name, size = data.len(), "Image loaded");
        Ok(data)
    }

    pub async fn delete(&self, name: &str) -> StoreResult<()> {
        self.backend.delete(name).await?;
        info!(backend = self.backend.kind(), name, "Image deleted");
        Ok(())
    }

    /// One result per input file, in input order.
    pub async fn upload_multiple(&self, files: &[ImageUpload]) -> Vec<BatchItemResult> {
        stream::iter(files)
            .map(|file| async move {
                match self.upload(file).await {
                    Ok(stored) => BatchItemResult::success(file.original_name.clone(), stored),
                    Err(e) => {
                        warn!(
                            original = file.original_name.as_deref().unwrap_or("-"),
                            error = %e,
                            "Batch upload item failed"
                        );
                        BatchItemResult::failed(file.original_name.clone(), upload_error_detail(&e))
                    }
                }
            })
            .buffered(self.concurrency())
            .collect()
            .await
    }

    /// Missing or unreadable objects map to `None`.
    pub async fn load_multiple<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> HashMap<String, Option<Bytes>> {
        stream::iter(unique_names(names))
            .map(|name| async move {
                let data = match self.backend.read(name).await {
                    Ok(data) => Some(data),
                    Err(StoreError::NotFound(_)) => None,
                    Err(e) => {
                        warn!(name, error = %e, "Batch load item failed");
                        None
                    }
                };
                (name.to_string(), data)
            })
            .buffered(self.concurrency())
            .collect()
            .await
    }

    /// `true` for each name that existed and was removed.
    pub async fn delete_multiple<S: AsRef<str>>(&self, names: &[S]) -> HashMap<String, bool> {
        stream::iter(unique_names(names))
            .map(|name| async move {
                let deleted = match self.delete(name).await {
                    Ok(()) => true,
                    Err(StoreError::NotFound(_)) => false,
                    Err(e) => {
                        warn!(name, error = %e, "Batch delete item failed");
                        false
                    }
                };
                (name.to_string(), deleted)
            })
            .buffered(self.concurrency())
            .collect()
            .await
    }

    /// Existence, size and guessed content type per unique name, in
    /// first-occurrence order.
    pub async fn info_multiple<S: AsRef<str>>(&self, names: &[S]) -> Vec<ObjectInfo> {
        let order = unique_names(names);
        let mut loaded = self.load_multiple(&order).await;
        order
            .into_iter()
            .map(|name| match loaded.remove(name).flatten() {
                Some(data) => ObjectInfo {
                    name: name.to_string(),
                    exists: true,
                    size: Some(data.len() as u64),
                    content_type: Some(content_type_from_name(name)),
                },
                None => ObjectInfo {
                    name: name.to_string(),
                    exists: false,
                    size: None,
                    content_type: None,
                },
            })
            .collect()
    }

    async fn fresh_name(&self, extension: &str) -> StoreResult<String> {
        if !self.options.verify_unique_names {
            return Ok(generate_stored_name(extension));
        }
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = generate_stored_name(extension);
            if !self.backend.exists(&name).await? {
                return Ok(name);
            }
            warn!(name = %name, attempt, "Generated name already taken, regenerating");
        }
        Err(StoreError::Io(anyhow::anyhow!(
            "no unique name after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }

    fn concurrency(&self) -> usize {
        self.options.batch_concurrency.max(1)
    }
}

fn upload_error_detail(err: &StoreError) -> String {
    match err {
        StoreError::Io(e) => format!("Failed to store file: {e:#}"),
        other => other.to_string(),
    }
}

fn unique_names<S: AsRef<str>>(names: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| seen.insert(*name))
        .collect()
}
