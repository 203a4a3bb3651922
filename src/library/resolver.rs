//! Filename -> (title, author) resolution.
//!
//! The cache is always consulted first and wins unconditionally, including
//! its empty "attempted and failed" entries. Only a cache miss reaches the
//! completion service, and whatever comes back (even nothing) is cached so
//! the same file is never queried twice in one process.

use std::path::Path;

use crate::library::model::{DocumentMetadata, MetadataCache};
use crate::library::naming::sanitize_filename;
use crate::library::scan::raw_filename;
use crate::llm::{CompletionService, LlmError};

/// How a resolution attempt ended.
#[derive(Debug)]
pub enum Resolution {
    /// Served from the cache; may be the empty sentinel.
    Cached(DocumentMetadata),
    /// The model produced both a title and an author.
    Resolved(DocumentMetadata),
    /// The model replied with valid JSON lacking a title or an author.
    Unresolved(DocumentMetadata),
    /// The request itself failed.
    TransportFailed(LlmError),
    /// The reply contained no parseable JSON.
    MalformedReply { output: String, message: String },
}

impl Resolution {
    /// The pair to hand back to callers; empty unless something was obtained.
    pub fn metadata(&self) -> DocumentMetadata {
        match self {
            Self::Cached(meta) | Self::Resolved(meta) | Self::Unresolved(meta) => meta.clone(),
            Self::TransportFailed(_) | Self::MalformedReply { .. } => DocumentMetadata::unresolved(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.metadata().is_resolved()
    }

    /// Whether the completion service was contacted.
    pub fn queried_model(&self) -> bool {
        !matches!(self, Self::Cached(_))
    }
}

/// The instructional prompt for one filename.
pub fn metadata_prompt(sanitized_filename: &str) -> String {
    format!(
        "I will give you a filename of a file which is an academic work. \
         I want you to use the data in the filename to look in the web for the full title \
         of the academic work and its author's surname. Also, find out if it is an article \
         or a book. I want you to return ONLY a JSON object with the title (the key will be \
         named title) and author's surname (the key will be named author) obtained, and also \
         with the document type (article or book, the key will be named document_type). \
         The response must contain ONLY the JSON, no other text. Do not give me responses \
         with code blocks! Use empty strings if you can't determine both values clearly. \
         {sanitized_filename}"
    )
}

/// Resolve the metadata for `file_path`, consulting and updating `cache`.
pub fn resolve(
    service: &dyn CompletionService,
    cache: &mut MetadataCache,
    file_path: &Path,
) -> Resolution {
    tracing::info!("Extracting document info from: {}", file_path.display());
    let filename = raw_filename(file_path);

    if let Some(cached) = cache.get(&filename) {
        if cached.is_resolved() {
            tracing::info!(
                "Using cached metadata - Title: {}, Authors: {}",
                cached.title,
                cached.author
            );
        } else {
            tracing::info!("Cached metadata not found for {filename}");
        }
        return Resolution::Cached(cached.clone());
    }

    let prompt = metadata_prompt(&sanitize_filename(&filename));
    let resolution = match service.complete_json(&prompt) {
        Err(e) => Resolution::TransportFailed(e),
        Ok(output) => match serde_json::from_str::<serde_json::Value>(&output) {
            Ok(value) => {
                let meta = DocumentMetadata::from_json(&value);
                if meta.is_resolved() {
                    Resolution::Resolved(meta)
                } else {
                    Resolution::Unresolved(meta)
                }
            }
            Err(e) => Resolution::MalformedReply {
                output,
                message: e.to_string(),
            },
        },
    };

    match &resolution {
        Resolution::Resolved(meta) => tracing::info!(
            "Successfully extracted document info - Title: {}, Authors: {}",
            meta.title,
            meta.author
        ),
        Resolution::Unresolved(_) => {
            tracing::warn!("Could not extract title and authors from filename: {filename}")
        }
        Resolution::TransportFailed(e) => {
            tracing::error!("Failed to query metadata for {filename}: {e}")
        }
        Resolution::MalformedReply { message, .. } => tracing::error!(
            "Failed to parse filename info response for: {} ({message})",
            file_path.display()
        ),
        Resolution::Cached(_) => {}
    }

    cache.insert(filename, resolution.metadata());
    resolution
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    struct Scripted {
        reply: Result<&'static str, ()>,
        calls: Cell<usize>,
        prompts: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn ok(reply: &'static str) -> Self {
            Self {
                reply: Ok(reply),
                calls: Cell::new(0),
                prompts: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                calls: Cell::new(0),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl CompletionService for Scripted {
        fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.calls.set(self.calls.get() + 1);
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply
                .map(str::to_string)
                .map_err(|()| LlmError::RequestFailed {
                    message: "connection refused".into(),
                })
        }
    }

    #[test]
    fn cache_hit_skips_the_model() {
        let service = Scripted::ok("{}");
        let mut cache = MetadataCache::new();
        cache.insert("smith_relativity_1916.pdf", DocumentMetadata::new("Relativity", "Smith"));

        let res = resolve(&service, &mut cache, Path::new("/docs/smith_relativity_1916.pdf"));
        assert!(matches!(res, Resolution::Cached(_)));
        assert_eq!(res.metadata(), DocumentMetadata::new("Relativity", "Smith"));
        assert_eq!(service.calls.get(), 0);
    }

    #[test]
    fn empty_cache_entry_is_not_retried() {
        let service = Scripted::ok(r#"{"title":"T","author":"A"}"#);
        let mut cache = MetadataCache::new();
        cache.insert("failed.pdf", DocumentMetadata::unresolved());

        let res = resolve(&service, &mut cache, Path::new("failed.pdf"));
        assert!(!res.is_resolved());
        assert!(!res.queried_model());
        assert_eq!(service.calls.get(), 0);
    }

    #[test]
    fn model_reply_resolves_and_is_cached() {
        let service =
            Scripted::ok(r#"{"title":"Relativity","author":"Smith","document_type":"article"}"#);
        let mut cache = MetadataCache::new();

        let res = resolve(&service, &mut cache, Path::new("smith_relativity_1916.pdf"));
        assert!(matches!(res, Resolution::Resolved(_)));
        assert_eq!(res.metadata(), DocumentMetadata::new("Relativity", "Smith"));
        assert!(service.prompts.borrow()[0].ends_with("smith_relativity_1916.pdf"));

        let again = resolve(&service, &mut cache, Path::new("smith_relativity_1916.pdf"));
        assert!(matches!(again, Resolution::Cached(_)));
        assert_eq!(service.calls.get(), 1);
    }

    #[test]
    fn prompt_uses_sanitized_name_cache_uses_raw_name() {
        let service = Scripted::ok(r#"{"title":"","author":""}"#);
        let mut cache = MetadataCache::new();

        let res = resolve(&service, &mut cache, Path::new("Kant Critique (1781).pdf"));
        assert!(matches!(res, Resolution::Unresolved(_)));
        assert!(service.prompts.borrow()[0].ends_with(" Kant_Critique_1781.pdf"));
        assert_eq!(
            cache.get("Kant Critique (1781).pdf"),
            Some(&DocumentMetadata::unresolved())
        );
    }

    #[test]
    fn failures_degrade_to_empty_pair() {
        let mut cache = MetadataCache::new();

        let down = Scripted::failing();
        let res = resolve(&down, &mut cache, Path::new("a.pdf"));
        assert!(matches!(res, Resolution::TransportFailed(_)));
        assert_eq!(res.metadata(), DocumentMetadata::unresolved());

        let garbled = Scripted::ok("I could not find anything, sorry.");
        let res = resolve(&garbled, &mut cache, Path::new("b.pdf"));
        assert!(matches!(res, Resolution::MalformedReply { .. }));
        assert_eq!(res.metadata(), DocumentMetadata::unresolved());

        // Neither is retried in-process.
        assert!(cache.contains("a.pdf"));
        assert!(cache.contains("b.pdf"));
    }
}
