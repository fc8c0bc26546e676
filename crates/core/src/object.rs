use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

pub const EMPTY_FILE: &str = "File is empty";
pub const NOT_AN_IMAGE: &str = "Only image files are allowed";
const IMAGE_PREFIX: &str = "image/";

/// One file handed to the store: payload plus what the caller declared about it.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn new(
        original_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            original_name: Some(original_name.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.data.is_empty() {
            return Err(StoreError::validation(EMPTY_FILE));
        }
        match self.content_type.as_deref() {
            Some(ct) if ct.starts_with(IMAGE_PREFIX) => Ok(()),
            _ => Err(StoreError::validation(NOT_AN_IMAGE)),
        }
    }

    /// Suffix of the original name from its last `.`, dot included.
    pub fn extension(&self) -> &str {
        self.original_name.as_deref().map(extension_of).unwrap_or("")
    }
}

/// Returns `""` when there is no dot, or when the suffix holds a character
/// a stored name may not contain.
pub fn extension_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => {
            let ext = &name[idx..];
            if ext.contains(['/', '\\', '\0']) { "" } else { ext }
        }
        None => "",
    }
}

/// `<uuid-v4><ext>`. 122 random bits, so collisions are not checked here.
pub fn generate_stored_name(extension: &str) -> String {
    format!("{}{extension}", uuid::Uuid::new_v4())
}

/// Stored names are flat: one path component, no separators, no dot entries.
pub fn validate_name(name: &str) -> StoreResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::validation(format!("Invalid file name: {name}")));
    }
    Ok(())
}

pub fn content_type_from_name(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemResult {
    #[serde(rename = "originalFilename")]
    pub original_name: Option<String>,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchOutcome {
    Success {
        #[serde(rename = "savedFilename")]
        stored_name: String,
    },
    Failed {
        error: String,
    },
}

impl BatchItemResult {
    pub fn success(original_name: Option<String>, stored_name: String) -> Self {
        Self {
            original_name,
            outcome: BatchOutcome::Success { stored_name },
        }
    }

    pub fn failed(original_name: Option<String>, error: String) -> Self {
        Self {
            original_name,
            outcome: BatchOutcome::Failed { error },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success { .. })
    }

    pub fn stored_name(&self) -> Option<&str> {
        match &self.outcome {
            BatchOutcome::Success { stored_name } => Some(stored_name),
            BatchOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            BatchOutcome::Success { .. } => None,
            BatchOutcome::Failed { error } => Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    #[serde(rename = "totalFiles")]
    pub total: usize,
    #[serde(rename = "successCount")]
    pub succeeded: usize,
    #[serde(rename = "failedCount")]
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_uploads(results: &[BatchItemResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }

    pub fn from_deletes(results: &HashMap<String, bool>) -> Self {
        let succeeded = results.values().filter(|ok| **ok).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    #[serde(rename = "filename")]
    pub name: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}
