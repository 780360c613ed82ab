//! Versioned remote blob store used by the progress mirror

use async_trait::async_trait;
use thiserror::Error;

/// Remote store errors
///
/// Never surfaced to HTTP callers: the mirror logs them and falls back to
/// its local cache.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Content of a remote file together with the revision the store assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBlob {
    pub content: Vec<u8>,
    pub revision: String,
}

/// Result of a conditional upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// Upload accepted; carries the new revision when the store reports one
    Written { revision: Option<String> },
    /// The previous revision no longer matches (someone else wrote first)
    Conflict,
}

/// Get/put by path with optimistic concurrency on a revision identifier
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Human readable location, for logs
    fn describe(&self) -> String;

    /// Current content and revision, or `None` if the path does not exist
    async fn get(&self, path: &str) -> Result<Option<RemoteBlob>, RemoteError>;

    /// Write `content`; `previous` is the revision the caller read, `None`
    /// when creating the file
    async fn put(
        &self,
        path: &str,
        content: &[u8],
        previous: Option<&str>,
        message: &str,
    ) -> Result<PutOutcome, RemoteError>;
}
