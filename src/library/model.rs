//! Core data types: resolved documents, the metadata cache, and placement plans.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::library::error::{LibraryError, LibraryResult};

/// Bibliographic metadata inferred for one file.
///
/// An empty title or author is the "attempted but unresolved" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
}

impl DocumentMetadata {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
        }
    }

    /// The empty pair.
    pub fn unresolved() -> Self {
        Self::default()
    }

    /// Read `title` / `author` from a model reply. Missing or non-string
    /// values become empty strings.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            title: field("title"),
            author: field("author"),
        }
    }

    /// Both title and author are present.
    pub fn is_resolved(&self) -> bool {
        !self.title.is_empty() && !self.author.is_empty()
    }

    /// The identity string used as a plan key: `"{title} by {author}"`.
    pub fn work_key(&self) -> String {
        format!("{} by {}", self.title, self.author)
    }
}

/// A file whose metadata has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Where the file currently lives.
    pub source: PathBuf,
    /// Sanitized filename (stable key and prompt token).
    pub filename: String,
    pub metadata: DocumentMetadata,
}

impl DocumentRecord {
    pub fn work_key(&self) -> String {
        self.metadata.work_key()
    }
}

/// Resolved documents keyed by work key.
///
/// Two files with the same title and author collapse into one entry; the
/// later insert wins.
#[derive(Debug, Clone, Default)]
pub struct ResolvedDocuments {
    by_work: BTreeMap<String, DocumentRecord>,
}

impl ResolvedDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the one it displaced, if any.
    pub fn insert(&mut self, record: DocumentRecord) -> Option<DocumentRecord> {
        self.by_work.insert(record.work_key(), record)
    }

    pub fn get(&self, work_key: &str) -> Option<&DocumentRecord> {
        self.by_work.get(work_key)
    }

    pub fn len(&self) -> usize {
        self.by_work.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_work.is_empty()
    }

    pub fn work_keys(&self) -> impl Iterator<Item = &str> {
        self.by_work.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.by_work.values()
    }
}

/// Raw filename -> metadata, rebuilt from the run log.
///
/// An entry holding the empty pair means the file was attempted and failed;
/// it must not be re-queried automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataCache {
    entries: HashMap<String, DocumentMetadata>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, filename: &str) -> Option<&DocumentMetadata> {
        self.entries.get(filename)
    }

    pub fn insert(&mut self, filename: impl Into<String>, metadata: DocumentMetadata) {
        self.entries.insert(filename.into(), metadata);
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains_key(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by filename.
    pub fn sorted(&self) -> Vec<(&str, &DocumentMetadata)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(name, meta)| (name.as_str(), meta))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Work key -> forward-slash folder path, as proposed by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationPlan {
    pub placements: BTreeMap<String, String>,
}

impl OrganizationPlan {
    /// Validate and parse plan JSON.
    ///
    /// The top level must be an object with a `placements` object. Entries
    /// whose folder is not a string are dropped with a warning.
    pub fn from_json(text: &str) -> LibraryResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| LibraryError::PlanMalformed {
                message: e.to_string(),
            })?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &serde_json::Value) -> LibraryResult<Self> {
        let object = value.as_object().ok_or(LibraryError::PlanNotObject)?;
        let placements = object
            .get("placements")
            .and_then(|p| p.as_object())
            .ok_or(LibraryError::MissingPlacements)?;

        let mut plan = Self::default();
        for (work, folder) in placements {
            match folder.as_str() {
                Some(folder) => {
                    plan.placements.insert(work.clone(), folder.to_string());
                }
                None => {
                    tracing::warn!("Ignoring non-string folder for '{work}' in organization plan");
                }
            }
        }
        Ok(plan)
    }

    /// Folder assigned to a work, if any.
    pub fn folder_for(&self, work_key: &str) -> Option<&str> {
        self.placements.get(work_key).map(String::as_str)
    }

    /// Distinct folder paths the plan requests.
    pub fn folders(&self) -> BTreeSet<&str> {
        self.placements.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
