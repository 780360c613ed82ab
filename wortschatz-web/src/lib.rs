//! wortschatz-web library - HTTP front end for the vocabulary trainer
//!
//! Serves the UI shell and the JSON endpoints for listing, adding and
//! practising German verbs and nouns.

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;
use wortschatz_common::{ProgressMirror, RecordStore};

pub mod api;
pub mod error;

pub use error::ApiError;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// CSV word lists
    pub store: Arc<RecordStore>,
    /// Aggregate progress document (remote + local cache)
    pub mirror: Arc<ProgressMirror>,
    /// Service start, for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(store: RecordStore, mirror: ProgressMirror) -> Self {
        Self {
            store: Arc::new(store),
            mirror: Arc::new(mirror),
            startup_time: Utc::now(),
        }
    }

    /// Run a word list operation on the blocking thread pool
    ///
    /// The record store does synchronous file I/O.
    pub async fn with_store<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&RecordStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| ApiError::Internal(format!("Word list task failed: {}", e)))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/get_verbs", get(api::get_verbs))
        .route("/get_nouns", get(api::get_nouns))
        .route("/add_verb", post(api::add_verb))
        .route("/add_noun", post(api::add_noun))
        .route("/update_learned_count", post(api::update_learned_count))
        .route("/get_progress", get(api::get_progress))
        .route("/get_word_progress", get(api::get_word_progress))
        .route("/get_all_progress", get(api::get_all_progress))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
