//! Local JSON copy of the progress document

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use super::ProgressDocument;
use crate::file_utils::write_atomic;

/// Fallback copy used when the remote store is unconfigured or unreachable
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached document, or a fresh empty one if absent or unreadable
    pub fn load(&self) -> ProgressDocument {
        match std::fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    error!(path = %self.path.display(), error = %e, "Corrupt local progress cache");
                    ProgressDocument::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No local progress cache yet");
                ProgressDocument::new()
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Error loading local progress");
                ProgressDocument::new()
            }
        }
    }

    /// Replace the cached document; failures are logged only
    pub fn store(&self, doc: &ProgressDocument) {
        let result = serde_json::to_vec_pretty(doc)
            .map_err(io::Error::from)
            .and_then(|bytes| write_atomic(&self.path, &bytes));

        if let Err(e) = result {
            error!(path = %self.path.display(), error = %e, "Error saving local progress");
        }
    }
}
