//! Session-scoped storage for uploaded files

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upload slots a form wizard reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadSlot {
    Schema,
    RenderingEngineTemplate,
}

impl UploadSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadSlot::Schema => "schema",
            UploadSlot::RenderingEngineTemplate => "rendering-engine-template",
        }
    }
}

impl fmt::Display for UploadSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An uploaded file held in memory until the wizard finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
    /// Directory the file was read from, for resolving relative references
    pub source_dir: Option<PathBuf>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            source_dir: None,
        }
    }

    /// Read a file from disk, keeping only its final path component as name
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| UploadError::NoFileName(path.to_path_buf()))?;

        let content = std::fs::read(path).map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            file_name,
            content,
            source_dir: path.parent().map(Path::to_path_buf),
        })
    }
}

/// Uploaded files keyed by slot
#[derive(Debug, Default)]
pub struct UploadStore {
    slots: HashMap<UploadSlot, UploadedFile>,
}

impl UploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file in a slot, replacing any earlier upload
    pub fn put(&mut self, slot: UploadSlot, file: UploadedFile) {
        tracing::debug!("uploaded {} into slot {}", file.file_name, slot);
        self.slots.insert(slot, file);
    }

    pub fn get(&self, slot: UploadSlot) -> Option<&UploadedFile> {
        self.slots.get(&slot)
    }

    pub fn file_name(&self, slot: UploadSlot) -> Option<&str> {
        self.get(slot).map(|f| f.file_name.as_str())
    }

    pub fn clear(&mut self, slot: UploadSlot) {
        if self.slots.remove(&slot).is_some() {
            tracing::debug!("cleared upload slot {}", slot);
        }
    }

    pub fn clear_all(&mut self) {
        tracing::debug!("clearing {} upload(s)", self.slots.len());
        self.slots.clear();
    }
}

/// Errors raised while reading an upload
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0:?} does not name a file")]
    NoFileName(PathBuf),

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
