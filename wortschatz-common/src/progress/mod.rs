//! Progress mirror
//!
//! Keeps one JSON document with a learned counter per word (`"{kind}_{word}"`)
//! in a remote versioned store, with a local file as cache and fallback.
//! Without a configured remote only the local file is used.
//!
//! Writes carry the revision that was read. When the store reports a
//! conflict the document is read again and the change re-applied, up to
//! `max_attempts` times.

mod cache;
pub mod github;
pub mod remote;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, DEFAULT_MAX_ATTEMPTS};
use crate::words::WordKind;
use crate::{Error, Result};

pub use cache::LocalCache;
pub use github::GitHubContentsStore;
pub use remote::{PutOutcome, RemoteBlob, RemoteError, RemoteStore};

fn now_timestamp() -> String {
    Local::now().to_rfc3339()
}

/// Aggregate learned counters across both word kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressDocument {
    #[serde(default)]
    pub progress: BTreeMap<String, u64>,
    #[serde(default = "now_timestamp")]
    pub last_updated: String,
}

impl Default for ProgressDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressDocument {
    pub fn new() -> Self {
        Self {
            progress: BTreeMap::new(),
            last_updated: now_timestamp(),
        }
    }

    pub fn count(&self, key: &str) -> u64 {
        self.progress.get(key).copied().unwrap_or(0)
    }

    /// Add one to `key` and return the new value
    pub fn increment(&mut self, key: &str) -> u64 {
        let count = self.progress.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn touch(&mut self) {
        self.last_updated = now_timestamp();
    }
}

/// Outcome of [`ProgressMirror::update_word`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub key: String,
    pub count: u64,
    /// True when the remote copy was updated
    pub mirrored: bool,
}

pub struct ProgressMirror {
    remote: Option<Arc<dyn RemoteStore>>,
    remote_path: String,
    cache: LocalCache,
    max_attempts: u32,
}

impl ProgressMirror {
    /// Mirror that only ever touches the local cache file
    pub fn local_only(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            remote: None,
            remote_path: String::new(),
            cache: LocalCache::new(cache_path),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_remote(
        cache_path: impl Into<PathBuf>,
        remote: Arc<dyn RemoteStore>,
        remote_path: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            remote: Some(remote),
            remote_path: remote_path.into(),
            cache: LocalCache::new(cache_path),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Build from configuration; the GitHub store is used when a token is set
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let cache_path = config.progress_cache_path();
        match &config.mirror {
            Some(mirror) => {
                let store = GitHubContentsStore::new(mirror)
                    .map_err(|e| Error::Remote(e.to_string()))?;
                info!(remote = %store.describe(), path = %mirror.path, "Progress mirror enabled");
                Ok(Self::with_remote(
                    cache_path,
                    Arc::new(store),
                    mirror.path.clone(),
                    mirror.max_attempts,
                ))
            }
            None => {
                info!("No GitHub token configured, progress is kept locally only");
                Ok(Self::local_only(cache_path))
            }
        }
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Current progress document
    ///
    /// Remote copy when reachable (and refreshes the cache), a fresh document
    /// when the remote file does not exist yet, otherwise the local cache.
    pub async fn fetch(&self) -> ProgressDocument {
        let Some(remote) = self.remote.as_deref() else {
            return self.cache.load();
        };

        match self.read_remote(remote).await {
            Ok(Some((doc, _))) => {
                self.cache.store(&doc);
                doc
            }
            Ok(None) => {
                debug!(path = %self.remote_path, "Remote progress document does not exist yet");
                ProgressDocument::new()
            }
            Err(e) => {
                error!(error = %e, "Error fetching remote progress, using local cache");
                self.cache.load()
            }
        }
    }

    /// Write `doc` to the remote store and the local cache
    ///
    /// Stamps `last_updated`. Returns true only if the remote upload
    /// succeeded; the local cache is refreshed either way.
    pub async fn save(&self, doc: &mut ProgressDocument) -> bool {
        let Some(remote) = self.remote.as_deref() else {
            warn!("No remote progress store configured, saving locally only");
            doc.touch();
            self.cache.store(doc);
            return false;
        };

        let mut mirrored = false;
        for attempt in 1..=self.max_attempts {
            let previous = match remote.get(&self.remote_path).await {
                Ok(blob) => blob.map(|b| b.revision),
                Err(e) => {
                    error!(error = %e, "Error reading remote revision");
                    break;
                }
            };

            doc.touch();
            match self.upload(remote, doc, previous.as_deref()).await {
                Ok(PutOutcome::Written { .. }) => {
                    mirrored = true;
                    break;
                }
                Ok(PutOutcome::Conflict) => {
                    warn!(attempt, max_attempts = self.max_attempts, "Remote revision changed during save");
                }
                Err(e) => {
                    error!(error = %e, "Error saving progress to remote store");
                    break;
                }
            }
        }

        self.cache.store(doc);
        mirrored
    }

    /// Add one to the counter of `word`
    ///
    /// With a remote store this is a read-modify-write loop: on a revision
    /// conflict the document is re-read and the increment applied to the
    /// fresh copy. If the remote cannot be read the local cache is updated
    /// instead.
    pub async fn update_word(&self, kind: WordKind, word: &str) -> ProgressUpdate {
        let key = kind.progress_key(word);
        let Some(remote) = self.remote.as_deref() else {
            return self.update_local(key);
        };

        let mut pending = None;
        for attempt in 1..=self.max_attempts {
            let (mut doc, previous) = match self.read_remote(remote).await {
                Ok(Some((doc, revision))) => (doc, Some(revision)),
                Ok(None) => (ProgressDocument::new(), None),
                Err(e) => {
                    error!(error = %e, "Error fetching remote progress, updating local cache");
                    return self.update_local(key);
                }
            };

            let count = doc.increment(&key);
            doc.touch();

            match self.upload(remote, &doc, previous.as_deref()).await {
                Ok(PutOutcome::Written { .. }) => {
                    debug!(key = %key, count, "Progress mirrored");
                    self.cache.store(&doc);
                    return ProgressUpdate {
                        key,
                        count,
                        mirrored: true,
                    };
                }
                Ok(PutOutcome::Conflict) => {
                    warn!(key = %key, attempt, max_attempts = self.max_attempts, "Remote revision conflict, re-reading");
                    pending = Some((doc, count));
                }
                Err(e) => {
                    error!(error = %e, "Error saving progress to remote store");
                    self.cache.store(&doc);
                    return ProgressUpdate {
                        key,
                        count,
                        mirrored: false,
                    };
                }
            }
        }

        match pending {
            Some((doc, count)) => {
                warn!(key = %key, "Giving up on remote update after repeated conflicts");
                self.cache.store(&doc);
                ProgressUpdate {
                    key,
                    count,
                    mirrored: false,
                }
            }
            None => self.update_local(key),
        }
    }

    /// Counter for one word, 0 if never practised
    pub async fn get_word(&self, kind: WordKind, word: &str) -> u64 {
        self.fetch().await.count(&kind.progress_key(word))
    }

    /// Every counter in the document
    pub async fn all_progress(&self) -> BTreeMap<String, u64> {
        self.fetch().await.progress
    }

    fn update_local(&self, key: String) -> ProgressUpdate {
        let mut doc = self.cache.load();
        let count = doc.increment(&key);
        doc.touch();
        self.cache.store(&doc);
        ProgressUpdate {
            key,
            count,
            mirrored: false,
        }
    }

    async fn read_remote(
        &self,
        remote: &dyn RemoteStore,
    ) -> std::result::Result<Option<(ProgressDocument, String)>, RemoteError> {
        let Some(blob) = remote.get(&self.remote_path).await? else {
            return Ok(None);
        };
        let doc = serde_json::from_slice(&blob.content)
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Some((doc, blob.revision)))
    }

    async fn upload(
        &self,
        remote: &dyn RemoteStore,
        doc: &ProgressDocument,
        previous: Option<&str>,
    ) -> std::result::Result<PutOutcome, RemoteError> {
        let content =
            serde_json::to_vec_pretty(doc).map_err(|e| RemoteError::Decode(e.to_string()))?;
        let message = format!("Update progress - {}", Local::now().format("%Y-%m-%d %H:%M"));
        remote
            .put(&self.remote_path, &content, previous, &message)
            .await
    }
}
