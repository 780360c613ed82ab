//! Word list endpoints
//!
//! GET    /get_verbs, /get_nouns        - all records of a list
//! POST   /add_verb, /add_noun          - append a word
//! POST   /update_learned_count         - practise a word once

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};
use wortschatz_common::{WordKind, WordRecord};

use crate::{ApiError, AppState};

/// Body of successful mutations
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Request body for POST /update_learned_count
#[derive(Debug, Deserialize)]
pub struct UpdateLearnedRequest {
    #[serde(rename = "type")]
    pub word_type: Option<String>,
    pub word: Option<String>,
}

/// GET /get_verbs
pub async fn get_verbs(State(state): State<AppState>) -> Result<Json<Vec<WordRecord>>, ApiError> {
    list_words(&state, WordKind::Verb).await
}

/// GET /get_nouns
pub async fn get_nouns(State(state): State<AppState>) -> Result<Json<Vec<WordRecord>>, ApiError> {
    list_words(&state, WordKind::Noun).await
}

async fn list_words(state: &AppState, kind: WordKind) -> Result<Json<Vec<WordRecord>>, ApiError> {
    let records = state.with_store(move |store| store.list_records(kind)).await?;
    Ok(Json(records))
}

/// POST /add_verb
///
/// Body: `{infinitiv, präteritum, perfekt, english}`
pub async fn add_verb(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    add_word(&state, WordKind::Verb, payload).await
}

/// POST /add_noun
///
/// Body: `{article, nomen, plural, english}`
pub async fn add_noun(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    add_word(&state, WordKind::Noun, payload).await
}

async fn add_word(
    state: &AppState,
    kind: WordKind,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(body) = payload?;
    let fields: HashMap<String, String> = body
        .iter()
        .filter_map(|(name, value)| field_text(value).map(|text| (name.clone(), text)))
        .collect();

    state
        .with_store(move |store| store.append_record(kind, &fields))
        .await??;
    info!(kind = %kind, "Added word");
    Ok(SuccessResponse::ok())
}

/// POST /update_learned_count
///
/// Body: `{type: "verb"|"noun", word}`. Bumps the counter in the word list,
/// then records the practice in the progress mirror (best effort) when a
/// word matched.
pub async fn update_learned_count(
    State(state): State<AppState>,
    payload: Result<Json<UpdateLearnedRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) = payload?;
    let (kind, word) = require_word(request.word_type, request.word)?;

    let target = word.clone();
    let updated = state
        .with_store(move |store| store.increment_learned(kind, &target))
        .await??;
    if updated == 0 {
        return Ok(SuccessResponse::ok());
    }

    let update = state.mirror.update_word(kind, &word).await;
    if !update.mirrored && state.mirror.is_remote_enabled() {
        warn!(key = %update.key, "Progress recorded locally only");
    }

    Ok(SuccessResponse::ok())
}

/// Validate the `type`/`word` pair shared by the practice endpoints
pub(crate) fn require_word(
    word_type: Option<String>,
    word: Option<String>,
) -> Result<(WordKind, String), ApiError> {
    match (word_type, word) {
        (Some(word_type), Some(word)) if !word_type.is_empty() && !word.is_empty() => {
            let kind = word_type.parse::<WordKind>()?;
            Ok((kind, word))
        }
        _ => Err(ApiError::BadRequest("Missing required fields".to_string())),
    }
}

/// Text of a submitted field; null, false, zero and containers count as missing
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_text() {
        assert_eq!(field_text(&json!("gehen")), Some("gehen".to_string()));
        assert_eq!(field_text(&json!(3)), Some("3".to_string()));
        assert_eq!(field_text(&json!(null)), None);
        assert_eq!(field_text(&json!(0)), None);
        assert_eq!(field_text(&json!(0.0)), None);
        assert_eq!(field_text(&json!(false)), None);
        assert_eq!(field_text(&json!(["a"])), None);
    }

    #[test]
    fn test_require_word() {
        let (kind, word) = require_word(Some("noun".into()), Some("Haus".into())).unwrap();
        assert_eq!(kind, WordKind::Noun);
        assert_eq!(word, "Haus");

        assert!(matches!(
            require_word(None, Some("Haus".into())),
            Err(ApiError::BadRequest(ref m)) if m == "Missing required fields"
        ));
        assert!(matches!(
            require_word(Some("verb".into()), Some(String::new())),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            require_word(Some("adjective".into()), Some("schnell".into())),
            Err(ApiError::BadRequest(ref m)) if m.contains("Unknown word type")
        ));
    }
}
