//! Word kinds and the record model shared by the store and the web layer
//!
//! A word list is a CSV file whose first row names the columns. Each kind
//! fixes its required columns and the positional column used to identify a
//! word when its learned counter is bumped.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Name of the optional trailing counter column
pub const LEARNED_COUNT: &str = "learned_count";

const VERB_FIELDS: [&str; 4] = ["infinitiv", "präteritum", "perfekt", "english"];
const NOUN_FIELDS: [&str; 4] = ["article", "nomen", "plural", "english"];

/// The two kinds of word list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordKind {
    Verb,
    Noun,
}

impl WordKind {
    pub const ALL: [WordKind; 2] = [WordKind::Verb, WordKind::Noun];

    /// Lowercase name used in requests and progress keys
    pub fn as_str(&self) -> &'static str {
        match self {
            WordKind::Verb => "verb",
            WordKind::Noun => "noun",
        }
    }

    /// Backing file name inside the data directory
    pub fn file_name(&self) -> &'static str {
        match self {
            WordKind::Verb => "verbs.csv",
            WordKind::Noun => "nouns.csv",
        }
    }

    /// Required fields, in column order
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            WordKind::Verb => &VERB_FIELDS,
            WordKind::Noun => &NOUN_FIELDS,
        }
    }

    /// Column index of the identity field (infinitiv / nomen)
    pub fn identity_index(&self) -> usize {
        match self {
            WordKind::Verb => 0,
            WordKind::Noun => 1,
        }
    }

    /// Header written when a word list is created from scratch
    pub fn default_header(&self) -> Vec<String> {
        self.required_fields()
            .iter()
            .map(|f| f.to_string())
            .chain(std::iter::once(LEARNED_COUNT.to_string()))
            .collect()
    }

    /// Composite key used in the progress document
    pub fn progress_key(&self, word: &str) -> String {
        format!("{}_{}", self.as_str(), word)
    }
}

impl fmt::Display for WordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "verb" => Ok(WordKind::Verb),
            "noun" => Ok(WordKind::Noun),
            other => Err(Error::InvalidInput(format!("Unknown word type: {}", other))),
        }
    }
}

/// A single cell of a word record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Count(u64),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Count(n) => serializer.serialize_u64(*n),
        }
    }
}

/// One word entry: header-ordered field names mapped to cell values
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordRecord {
    fields: Vec<(String, FieldValue)>,
}

impl WordRecord {
    /// Build a record from a header and a (possibly ragged) row
    ///
    /// Cells are trimmed, short rows padded with empty strings, cells past
    /// the header dropped, and the counter column coerced to an integer.
    pub fn from_row<S: AsRef<str>>(header: &[String], row: &[S]) -> Self {
        let fields = header
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let cell = row.get(i).map(|c| c.as_ref().trim()).unwrap_or("");
                let value = if name == LEARNED_COUNT {
                    FieldValue::Count(parse_count(cell))
                } else {
                    FieldValue::Text(cell.to_string())
                };
                (name.clone(), value)
            })
            .collect();

        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Text value of a field, if present and textual
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn learned_count(&self) -> u64 {
        match self.get(LEARNED_COUNT) {
            Some(FieldValue::Count(n)) => *n,
            _ => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for WordRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Learned-count coercion: anything that is not a non-negative integer is 0
pub fn parse_count(cell: &str) -> u64 {
    cell.trim().parse::<u64>().unwrap_or(0)
}

/// True when every cell is empty or whitespace
pub fn is_blank_row<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().all(|cell| cell.as_ref().trim().is_empty())
}
