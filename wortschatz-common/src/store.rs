//! CSV-backed word lists
//!
//! One file per [`WordKind`] inside the data directory. Reads never fail:
//! a missing or unreadable file is an empty list. Appends and counter
//! updates report failures to the caller.
//!
//! Writers do not lock. Two requests rewriting the same file concurrently
//! can lose an update (last write wins).

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::file_utils::write_atomic;
use crate::words::{is_blank_row, parse_count, WordKind, WordRecord, LEARNED_COUNT};
use crate::{Error, Result};

/// Header plus raw data rows of a word list
type Table = (Vec<String>, Vec<Vec<String>>);

/// Total and learned word counts for one word list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub total: usize,
    pub learned: usize,
}

/// Word lists stored as CSV files in a data directory
#[derive(Debug, Clone)]
pub struct RecordStore {
    data_dir: PathBuf,
}

impl RecordStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.data_dir.clone())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Create the data directory if it does not exist yet
    pub fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    pub fn path_for(&self, kind: WordKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    /// All non-blank records of a word list
    ///
    /// A header without `learned_count` is treated as if the column were
    /// present (every record reports 0); the file itself is not changed.
    pub fn list_records(&self, kind: WordKind) -> Vec<WordRecord> {
        match self.read_records(kind) {
            Ok(records) => records,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Failed to read word list, returning no records");
                Vec::new()
            }
        }
    }

    fn read_records(&self, kind: WordKind) -> Result<Vec<WordRecord>> {
        let path = self.path_for(kind);
        let table = read_table(&path)
            .map_err(|e| Error::StorageRead(format!("{}: {}", path.display(), e)))?;
        let Some((mut header, rows)) = table else {
            debug!(path = %path.display(), "Word list missing or empty");
            return Ok(Vec::new());
        };

        if !header.iter().any(|h| h == LEARNED_COUNT) {
            header.push(LEARNED_COUNT.to_string());
        }

        Ok(rows
            .iter()
            .filter(|row| !is_blank_row(row.as_slice()))
            .map(|row| WordRecord::from_row(&header, row.as_slice()))
            .collect())
    }

    /// Append a new word at the end of its list
    ///
    /// Every required field of `kind` must be present and non-empty; the first
    /// missing one (in column order) is reported. No duplicate check is made.
    pub fn append_record(&self, kind: WordKind, fields: &HashMap<String, String>) -> Result<()> {
        let mut row = Vec::with_capacity(kind.required_fields().len() + 1);
        for &name in kind.required_fields() {
            match fields.get(name) {
                Some(value) if !value.is_empty() => row.push(value.clone()),
                _ => return Err(Error::missing_field(name)),
            }
        }

        let path = self.path_for(kind);
        let header = match read_table(&path).map_err(|e| write_error(&path, e))? {
            Some((header, _)) => header,
            None => {
                let header = kind.default_header();
                info!(path = %path.display(), "Creating word list");
                write_atomic(&path, &encode_rows(&header, &[])?)
                    .map_err(|e| write_error(&path, e))?;
                header
            }
        };

        if header.iter().any(|h| h == LEARNED_COUNT) {
            row.push("0".to_string());
        }

        append_row(&path, &row).map_err(|e| write_error(&path, e))?;
        debug!(kind = %kind, word = %row[kind.identity_index()], "Appended word");
        Ok(())
    }

    /// Bump `learned_count` on every row whose identity column equals `word`
    ///
    /// Adds the `learned_count` column if the header lacks it and rewrites the
    /// whole file. Returns the number of rows updated; zero is not an error.
    pub fn increment_learned(&self, kind: WordKind, word: &str) -> Result<usize> {
        let path = self.path_for(kind);
        let (mut header, mut rows) = read_table(&path)
            .map_err(|e| write_error(&path, e))?
            .ok_or_else(|| write_error(&path, "word list is missing or has no header row"))?;

        let learned_idx = match header.iter().position(|h| h == LEARNED_COUNT) {
            Some(idx) => idx,
            None => {
                header.push(LEARNED_COUNT.to_string());
                header.len() - 1
            }
        };
        let identity_idx = kind.identity_index();

        let mut updated = 0;
        for row in rows.iter_mut() {
            pad_row(row, header.len(), learned_idx);
            if row.get(identity_idx).map(String::as_str) == Some(word) {
                let count = parse_count(&row[learned_idx]).saturating_add(1);
                row[learned_idx] = count.to_string();
                updated += 1;
            }
        }

        let contents = encode_rows(&header, &rows)?;
        write_atomic(&path, &contents).map_err(|e| write_error(&path, e))?;

        if updated == 0 {
            warn!(kind = %kind, word = %word, "No matching word to mark as learned");
        } else {
            debug!(kind = %kind, word = %word, rows = updated, "Incremented learned count");
        }
        Ok(updated)
    }

    /// Number of words and number with a learned count above zero
    pub fn count_progress(&self, kind: WordKind) -> ProgressSummary {
        let records = self.list_records(kind);
        ProgressSummary {
            total: records.len(),
            learned: records.iter().filter(|r| r.learned_count() > 0).count(),
        }
    }
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::StorageWrite(format!("{}: {}", path.display(), e))
}

/// Read header and rows; `None` when the file is absent or has no header
fn read_table(path: &Path) -> Result<Option<Table>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut records = reader.records();
    let header: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => return Ok(None),
    };

    let mut rows = Vec::new();
    for record in records {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(Some((header, rows)))
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer)
}

fn encode_rows(header: &[String], rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = csv_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::StorageWrite(e.to_string()))
}

/// Pad a short row; a missing counter cell becomes "0", anything else ""
fn pad_row(row: &mut Vec<String>, len: usize, learned_idx: usize) {
    while row.len() < len {
        let cell = if row.len() == learned_idx { "0" } else { "" };
        row.push(cell.to_string());
    }
}

fn append_row(path: &Path, row: &[String]) -> Result<()> {
    let needs_newline = !ends_with_newline(path)?;
    let mut file = OpenOptions::new().append(true).open(path)?;
    if needs_newline {
        file.write_all(b"\r\n")?;
    }

    let mut writer = csv_writer(file);
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::words::FieldValue;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RecordStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::new(temp_dir.path());
        (temp_dir, store)
    }

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn gehen() -> HashMap<String, String> {
        fields(&[
            ("infinitiv", "gehen"),
            ("präteritum", "ging"),
            ("perfekt", "ist gegangen"),
            ("english", "to go"),
        ])
    }

    #[test]
    fn test_list_missing_file_is_empty() {
        let (_dir, store) = setup();
        assert!(store.list_records(WordKind::Verb).is_empty());
        assert_eq!(store.count_progress(WordKind::Noun), ProgressSummary::default());
    }

    #[test]
    fn test_list_empty_file_is_empty() {
        let (_dir, store) = setup();
        fs::write(store.path_for(WordKind::Verb), "").unwrap();
        assert!(store.list_records(WordKind::Verb).is_empty());
    }

    #[test]
    fn test_list_undecodable_file_is_empty() {
        let (_dir, store) = setup();
        fs::write(store.path_for(WordKind::Verb), b"infinitiv,english\n\xff\xfe,bad\n").unwrap();
        assert!(store.list_records(WordKind::Verb).is_empty());
    }

    #[test]
    fn test_list_normalizes_rows() {
        let (_dir, store) = setup();
        fs::write(
            store.path_for(WordKind::Noun),
            "article,nomen,plural,english\n\
             der, Hund ,Hunde,dog\n\
             ,,,\n\
             die,Katze\n\
             das,Haus,Häuser,\"house, home\"\n",
        )
        .unwrap();

        let records = store.list_records(WordKind::Noun);
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].text("nomen"), Some("Hund"));
        assert_eq!(records[0].learned_count(), 0);
        assert_eq!(records[0].len(), 5);

        assert_eq!(records[1].text("plural"), Some(""));
        assert_eq!(records[1].text("english"), Some(""));

        assert_eq!(records[2].text("english"), Some("house, home"));

        // Header without the counter column is left as is on disk
        let on_disk = fs::read_to_string(store.path_for(WordKind::Noun)).unwrap();
        assert!(!on_disk.contains(LEARNED_COUNT));
    }

    #[test]
    fn test_list_coerces_bad_counts() {
        let (_dir, store) = setup();
        fs::write(
            store.path_for(WordKind::Verb),
            "infinitiv,präteritum,perfekt,english,learned_count\n\
             gehen,ging,ist gegangen,to go,abc\n\
             sehen,sah,hat gesehen,to see, 4 \n",
        )
        .unwrap();

        let records = store.list_records(WordKind::Verb);
        assert_eq!(records[0].get(LEARNED_COUNT), Some(&FieldValue::Count(0)));
        assert_eq!(records[1].learned_count(), 4);
    }

    #[test]
    fn test_append_then_list() {
        let (_dir, store) = setup();
        store.append_record(WordKind::Verb, &gehen()).unwrap();

        let records = store.list_records(WordKind::Verb);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.text("infinitiv"), Some("gehen"));
        assert_eq!(record.text("präteritum"), Some("ging"));
        assert_eq!(record.text("perfekt"), Some("ist gegangen"));
        assert_eq!(record.text("english"), Some("to go"));
        assert_eq!(record.learned_count(), 0);
    }

    #[test]
    fn test_append_missing_field_reports_first_in_order() {
        let (_dir, store) = setup();
        let input = fields(&[("article", "das"), ("nomen", "Haus"), ("english", "")]);

        let err = store.append_record(WordKind::Noun, &input).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: plural");
        assert!(err.is_validation());
        assert!(!store.path_for(WordKind::Noun).exists());
    }

    #[test]
    fn test_append_without_counter_column() {
        let (_dir, store) = setup();
        let path = store.path_for(WordKind::Verb);
        fs::write(&path, "infinitiv,präteritum,perfekt,english").unwrap();

        store.append_record(WordKind::Verb, &gehen()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "infinitiv,präteritum,perfekt,english\r\ngehen,ging,ist gegangen,to go\r\n"
        );
    }

    #[test]
    fn test_append_does_not_deduplicate() {
        let (_dir, store) = setup();
        store.append_record(WordKind::Verb, &gehen()).unwrap();
        store.append_record(WordKind::Verb, &gehen()).unwrap();
        assert_eq!(store.list_records(WordKind::Verb).len(), 2);
    }

    #[test]
    fn test_increment_counts_matched_words() {
        let (_dir, store) = setup();
        store.append_record(WordKind::Verb, &gehen()).unwrap();

        for _ in 0..3 {
            assert_eq!(store.increment_learned(WordKind::Verb, "gehen").unwrap(), 1);
        }

        assert_eq!(
            store.count_progress(WordKind::Verb),
            ProgressSummary { total: 1, learned: 1 }
        );
        assert_eq!(store.list_records(WordKind::Verb)[0].learned_count(), 3);
    }

    #[test]
    fn test_increment_adds_counter_column() {
        let (_dir, store) = setup();
        let path = store.path_for(WordKind::Noun);
        fs::write(&path, "article,nomen,plural,english\nder,Hund,Hunde,dog\ndie,Katze\n").unwrap();

        assert_eq!(store.increment_learned(WordKind::Noun, "Katze").unwrap(), 1);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "article,nomen,plural,english,learned_count\r\n\
             der,Hund,Hunde,dog,0\r\n\
             die,Katze,,,1\r\n"
        );
    }

    #[test]
    fn test_increment_updates_every_duplicate() {
        let (_dir, store) = setup();
        store.append_record(WordKind::Verb, &gehen()).unwrap();
        store.append_record(WordKind::Verb, &gehen()).unwrap();

        assert_eq!(store.increment_learned(WordKind::Verb, "gehen").unwrap(), 2);
        assert_eq!(store.count_progress(WordKind::Verb).learned, 2);
    }

    #[test]
    fn test_increment_unknown_word_is_not_an_error() {
        let (_dir, store) = setup();
        store.append_record(WordKind::Verb, &gehen()).unwrap();

        assert_eq!(store.increment_learned(WordKind::Verb, "laufen").unwrap(), 0);
        assert_eq!(store.count_progress(WordKind::Verb).learned, 0);
    }

    #[test]
    fn test_increment_saturates_at_max_count() {
        let (_dir, store) = setup();
        fs::write(
            store.path_for(WordKind::Verb),
            format!(
                "infinitiv,präteritum,perfekt,english,learned_count\ngehen,ging,ist gegangen,to go,{}\n",
                u64::MAX
            ),
        )
        .unwrap();

        assert_eq!(store.increment_learned(WordKind::Verb, "gehen").unwrap(), 1);
        assert_eq!(store.list_records(WordKind::Verb)[0].learned_count(), u64::MAX);
        assert_eq!(store.count_progress(WordKind::Verb).learned, 1);
    }

    #[test]
    fn test_concurrent_increments_never_fail() {
        let (_dir, store) = setup();
        let mut contents = String::from("infinitiv,präteritum,perfekt,english,learned_count\n");
        for i in 0..2000 {
            contents.push_str(&format!("verb{i},prät{i},perf{i},english {i},0\n"));
        }
        fs::write(store.path_for(WordKind::Verb), contents).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| store.increment_learned(WordKind::Verb, "verb7").is_err())
                        .count()
                })
            })
            .collect();
        let errors: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // Updates may be lost to concurrent rewrites, but none may fail
        assert_eq!(errors, 0);
        let records = store.list_records(WordKind::Verb);
        assert_eq!(records.len(), 2000);
        let count = records[7].learned_count();
        assert!((1..=200).contains(&count));
    }

    #[test]
    fn test_increment_missing_file_fails() {
        let (_dir, store) = setup();
        let err = store.increment_learned(WordKind::Noun, "Haus").unwrap_err();
        assert!(matches!(err, Error::StorageWrite(_)));
    }

    #[test]
    fn test_increment_matches_raw_identity_cell() {
        let (_dir, store) = setup();
        fs::write(
            store.path_for(WordKind::Verb),
            "infinitiv,präteritum,perfekt,english,learned_count\n gehen,ging,ist gegangen,to go,0\n",
        )
        .unwrap();

        // Exact comparison against the untrimmed cell
        assert_eq!(store.increment_learned(WordKind::Verb, "gehen").unwrap(), 0);
        assert_eq!(store.increment_learned(WordKind::Verb, " gehen").unwrap(), 1);
    }

    #[test]
    fn test_append_after_file_without_trailing_newline() {
        let (_dir, store) = setup();
        let path = store.path_for(WordKind::Verb);
        fs::write(
            &path,
            "infinitiv,präteritum,perfekt,english,learned_count\nsehen,sah,hat gesehen,to see,2",
        )
        .unwrap();

        store.append_record(WordKind::Verb, &gehen()).unwrap();

        let records = store.list_records(WordKind::Verb);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].learned_count(), 2);
        assert_eq!(records[1].text("infinitiv"), Some("gehen"));
    }
}
