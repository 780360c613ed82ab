//! Progress endpoints
//!
//! `/get_progress` counts words in the CSV lists; the other two read the
//! aggregate progress document.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use wortschatz_common::{ProgressSummary, WordKind};

use super::words::require_word;
use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub verbs: ProgressSummary,
    pub nouns: ProgressSummary,
}

#[derive(Debug, Deserialize)]
pub struct WordProgressQuery {
    #[serde(rename = "type")]
    pub word_type: Option<String>,
    pub word: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WordProgressResponse {
    #[serde(rename = "type")]
    pub word_type: WordKind,
    pub word: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct AllProgressResponse {
    pub progress: BTreeMap<String, u64>,
}

/// GET /get_progress
///
/// Total and learned word counts per list; zeros when a list is missing.
pub async fn get_progress(
    State(state): State<AppState>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let response = state
        .with_store(|store| ProgressResponse {
            verbs: store.count_progress(WordKind::Verb),
            nouns: store.count_progress(WordKind::Noun),
        })
        .await?;
    Ok(Json(response))
}

/// GET /get_word_progress?type=verb&word=gehen
pub async fn get_word_progress(
    State(state): State<AppState>,
    Query(query): Query<WordProgressQuery>,
) -> Result<Json<WordProgressResponse>, ApiError> {
    let (kind, word) = require_word(query.word_type, query.word)?;
    let count = state.mirror.get_word(kind, &word).await;

    Ok(Json(WordProgressResponse {
        word_type: kind,
        word,
        count,
    }))
}

/// GET /get_all_progress
pub async fn get_all_progress(State(state): State<AppState>) -> Json<AllProgressResponse> {
    Json(AllProgressResponse {
        progress: state.mirror.all_progress().await,
    })
}
