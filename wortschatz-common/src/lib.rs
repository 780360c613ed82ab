//! # Wortschatz Common Library
//!
//! Storage and configuration shared by the Wortschatz web service:
//! - CSV word lists for verbs and nouns (record store)
//! - Progress mirror (GitHub-backed JSON document with local cache)
//! - Configuration loading
//! - Error types

pub mod config;
pub mod error;
pub mod file_utils;
pub mod progress;
pub mod store;
pub mod words;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use progress::{ProgressDocument, ProgressMirror, ProgressUpdate};
pub use store::{ProgressSummary, RecordStore};
pub use words::{FieldValue, WordKind, WordRecord};
