//! Reconstructing prior run state from the run log.
//!
//! The log is a sequence of `YYYY-MM-DD HH:MM:SS - LEVEL - message` records.
//! Lines that do not start with a timestamp are continuations of the record
//! above them, which is how multi-line JSON payloads end up in the file.
//!
//! Two things are recovered without contacting the model again:
//! - the metadata cache, from `Processing file: X` / `Model output:` pairs;
//! - the last placement plan, from any JSON object with a `placements` key.

use std::path::Path;

use crate::extract;
use crate::library::model::{DocumentMetadata, MetadataCache, OrganizationPlan};

const PROCESSING_MARKER: &str = "Processing file: ";
const MODEL_OUTPUT_MARKER: &str = "Model output:";

/// Text encodings tried in order when decoding a log file.
///
/// Windows-1252 (as defined by the WHATWG encoding standard, a superset of
/// ISO-8859-1) assigns every byte, so it is the permissive last resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEncoding {
    Utf8,
    Windows1252,
}

/// Strict first, permissive last.
pub const ENCODING_FALLBACKS: &[LogEncoding] = &[LogEncoding::Utf8, LogEncoding::Windows1252];

impl LogEncoding {
    /// Decode `bytes`, or `None` if they are not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        let (encoding, bytes) = match self {
            Self::Utf8 => (
                encoding_rs::UTF_8,
                bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes),
            ),
            Self::Windows1252 => (encoding_rs::WINDOWS_1252, bytes),
        };
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
    }
}

/// Decode log bytes with the first encoding in [`ENCODING_FALLBACKS`] that accepts them.
pub fn decode_log(bytes: &[u8]) -> Option<(String, LogEncoding)> {
    ENCODING_FALLBACKS
        .iter()
        .find_map(|encoding| encoding.decode(bytes).map(|text| (text, *encoding)))
}

/// Read and decode a log file. `None` when it is missing or unreadable.
pub fn read_log(path: &Path) -> Option<String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Failed to read log file {}: {e}", path.display());
            return None;
        }
    };

    match decode_log(&bytes) {
        Some((text, encoding)) => {
            if encoding != LogEncoding::Utf8 {
                tracing::debug!(?encoding, "decoded run log with fallback encoding");
            }
            Some(text)
        }
        None => {
            tracing::error!(
                "Failed to read log file with encodings: {:?}",
                ENCODING_FALLBACKS
            );
            None
        }
    }
}

/// Whether `line` opens a new record (starts with a four-digit year and `-`).
pub fn is_record_start(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= 5 && bytes[..4].iter().all(u8::is_ascii_digit) && bytes[4] == b'-'
}

/// The message part of a record line (everything after `timestamp - LEVEL - `).
pub fn record_message(line: &str) -> Option<&str> {
    line.splitn(3, " - ").nth(2)
}

/// A `Model output:` payload that is a placement plan rather than file metadata.
fn is_plan_payload(value: &serde_json::Value) -> bool {
    value.get("placements").is_some()
        && value.get("title").is_none()
        && value.get("author").is_none()
}

/// Rebuild the metadata cache from log text.
pub fn replay_cache(text: &str) -> MetadataCache {
    let lines: Vec<&str> = text.lines().collect();
    let mut cache = MetadataCache::new();
    let mut pending: Option<String> = None;

    for (index, line) in lines.iter().enumerate() {
        if !is_record_start(line) {
            continue;
        }
        let Some(message) = record_message(line) else {
            continue;
        };

        if let Some((_, filename)) = message.split_once(PROCESSING_MARKER) {
            pending = Some(filename.trim().to_string());
            continue;
        }

        let Some((_, inline)) = message.split_once(MODEL_OUTPUT_MARKER) else {
            continue;
        };
        let Some(filename) = pending.take() else {
            continue;
        };

        let mut payload: Vec<&str> = Vec::new();
        if !inline.trim().is_empty() {
            payload.push(inline.trim());
        }
        payload.extend(
            lines[index + 1..]
                .iter()
                .take_while(|next| !is_record_start(next))
                .copied(),
        );

        match serde_json::from_str::<serde_json::Value>(&payload.join("\n")) {
            Ok(value) if is_plan_payload(&value) => {}
            Ok(value) => cache.insert(filename, DocumentMetadata::from_json(&value)),
            Err(_) => {}
        }
    }

    cache
}

/// Rebuild the metadata cache from the log at `path`.
///
/// A missing or undecodable log yields an empty cache.
pub fn rebuild_cache(path: &Path) -> MetadataCache {
    let cache = read_log(path)
        .map(|text| replay_cache(&text))
        .unwrap_or_default();
    tracing::debug!(entries = cache.len(), log = %path.display(), "replayed metadata cache");
    cache
}

/// Raw text of the last valid placement plan in `text`.
pub fn last_placement_json(text: &str) -> Option<&str> {
    extract::placement_blobs(text)
        .into_iter()
        .rev()
        .find(|blob| OrganizationPlan::from_json(blob).is_ok())
}

/// Raw text of the most recent valid placement plan in the log at `path`.
pub fn find_last_placement_json(path: &Path) -> Option<String> {
    let text = read_log(path)?;
    last_placement_json(&text).map(str::to_string)
}

/// The most recent valid placement plan in the log at `path`.
pub fn find_last_placement_plan(path: &Path) -> Option<OrganizationPlan> {
    find_last_placement_json(path).and_then(|json| OrganizationPlan::from_json(&json).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
2025-03-01 10:00:00 - INFO - Starting file organization in folder: /docs
2025-03-01 10:00:00 - INFO - Processing file: smith_relativity_1916.pdf
2025-03-01 10:00:00 - INFO - Extracting document info from: /docs/smith_relativity_1916.pdf
2025-03-01 10:00:00 - INFO - === Starting API Query ===
2025-03-01 10:00:00 - INFO - Prompt sent to model:
I will give you a filename ... smith_relativity_1916.pdf
2025-03-01 10:00:05 - INFO - Model output:
{
  \"title\": \"Relativity\",
  \"author\": \"Smith\",
  \"document_type\": \"article\"
}
2025-03-01 10:00:05 - INFO - Successfully extracted document info - Title: Relativity, Authors: Smith
2025-03-01 10:00:05 - INFO - Processing file: scan0001.pdf
2025-03-01 10:00:09 - INFO - Model output:
{\"title\": \"\", \"author\": \"\", \"document_type\": \"\"}
2025-03-01 10:00:09 - INFO - Processing file: garbled.pdf
2025-03-01 10:00:12 - INFO - Model output:
I am sorry, I cannot help with that.
2025-03-01 10:00:12 - ERROR - Failed to parse filename info response for: /docs/garbled.pdf
";

    #[test]
    fn record_start_detection() {
        assert!(is_record_start("2025-03-01 10:00:00 - INFO - x"));
        assert!(is_record_start("1999-12-31 23:59:59 - INFO - x"));
        assert!(!is_record_start("  \"title\": \"2025-03-01\""));
        assert!(!is_record_start("2025"));
        assert!(!is_record_start("20250301"));
        assert!(!is_record_start("{\"placements\": {}}"));
    }

    #[test]
    fn replays_processing_and_output_pairs() {
        let cache = replay_cache(LOG);
        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.get("smith_relativity_1916.pdf"),
            Some(&DocumentMetadata::new("Relativity", "Smith"))
        );
        assert_eq!(cache.get("scan0001.pdf"), Some(&DocumentMetadata::unresolved()));
        assert!(!cache.contains("garbled.pdf"));
    }

    #[test]
    fn replay_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        std::fs::write(&path, LOG).unwrap();
        assert_eq!(rebuild_cache(&path), rebuild_cache(&path));
    }

    #[test]
    fn output_without_pending_file_is_ignored() {
        let log = "\
2025-03-01 10:00:00 - INFO - Model output:
{\"title\": \"Orphan\", \"author\": \"Nobody\"}
";
        assert!(replay_cache(log).is_empty());
    }

    #[test]
    fn plan_payload_does_not_poison_pending_file() {
        let log = "\
2025-03-01 10:00:00 - INFO - Processing file: cached.pdf
2025-03-01 10:00:00 - INFO - Using cached metadata - Title: T, Authors: A
2025-03-01 10:00:01 - INFO - Model output:
{\"placements\": {\"T by A\": \"Misc\"}}
";
        assert!(!replay_cache(log).contains("cached.pdf"));
    }

    #[test]
    fn inline_payload_on_record_line() {
        let log = "2025-03-01 10:00:00 - INFO - Processing file: a.pdf\n\
                   2025-03-01 10:00:01 - INFO - Model output: {\"title\":\"T\",\"author\":\"A\"}\n";
        assert_eq!(
            replay_cache(log).get("a.pdf"),
            Some(&DocumentMetadata::new("T", "A"))
        );
    }

    #[test]
    fn crlf_logs_replay() {
        let log = LOG.replace('\n', "\r\n");
        assert_eq!(replay_cache(&log), replay_cache(LOG));
    }

    #[test]
    fn missing_log_is_empty_cache() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(rebuild_cache(&dir.path().join("absent.log")).is_empty());
        assert!(find_last_placement_plan(&dir.path().join("absent.log")).is_none());
    }

    #[test]
    fn encoding_fallbacks() {
        let utf8 = "2025-03-01 10:00:00 - INFO - Processing file: Gödel.pdf".as_bytes();
        assert_eq!(decode_log(utf8).unwrap().1, LogEncoding::Utf8);

        let with_bom = [b"\xEF\xBB\xBF".as_slice(), b"abc"].concat();
        assert_eq!(decode_log(&with_bom).unwrap(), ("abc".to_string(), LogEncoding::Utf8));

        // "Gödel" in Windows-1252 is not valid UTF-8.
        let cp1252 = b"Processing file: G\xF6del.pdf";
        let (text, encoding) = decode_log(cp1252).unwrap();
        assert_eq!(encoding, LogEncoding::Windows1252);
        assert_eq!(text, "Processing file: Gödel.pdf");

        // Bytes that are C1 controls in ISO-8859-1 still decode.
        let (text, encoding) = decode_log(b"a\x81b").unwrap();
        assert_eq!(encoding, LogEncoding::Windows1252);
        assert_eq!(text.chars().count(), 3);
    }

    #[test]
    fn non_utf8_log_replays() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        let mut bytes = b"2025-03-01 10:00:00 - INFO - Processing file: G\xF6del.pdf\n".to_vec();
        bytes.extend_from_slice(
            b"2025-03-01 10:00:01 - INFO - Model output:\n{\"title\": \"Unvollst\xE4ndigkeit\", \"author\": \"G\xF6del\"}\n",
        );
        std::fs::write(&path, bytes).unwrap();

        let cache = rebuild_cache(&path);
        assert_eq!(
            cache.get("Gödel.pdf"),
            Some(&DocumentMetadata::new("Unvollständigkeit", "Gödel"))
        );
    }

    #[test]
    fn last_plan_wins_byte_for_byte() {
        let first = r#"{"placements": {"A by B": "Old"}}"#;
        let second = "{\n  \"placements\": {\n    \"A by B\": \"New/Nested\"\n  }\n}";
        let log = format!(
            "2025-03-01 10:00:00 - INFO - Model output:\n{first}\n\
             2025-03-01 10:00:01 - INFO - Model output:\n{second}\n\
             2025-03-01 10:00:02 - INFO - Model output:\n{{\"placements\": [\"bad\"]}}\n"
        );
        assert_eq!(last_placement_json(&log), Some(second));

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        std::fs::write(&path, &log).unwrap();
        assert_eq!(find_last_placement_json(&path).as_deref(), Some(second));

        let plan = find_last_placement_plan(&path).unwrap();
        assert_eq!(plan, OrganizationPlan::from_json(second).unwrap());
        assert_eq!(plan.folder_for("A by B"), Some("New/Nested"));
    }

    #[test]
    fn stray_brace_in_log_does_not_hide_later_plan() {
        let plan = r#"{"placements": {"Relativity by Smith": "Physics"}}"#;
        let log = format!(
            "2025-03-01 10:00:00 - INFO - Processing file: notes{{draft.pdf\n\
             2025-03-01 10:00:05 - INFO - Model output:\n{plan}\n"
        );
        assert_eq!(last_placement_json(&log), Some(plan));
    }
}
