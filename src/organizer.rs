//! The organizer: one explicit context value per process.
//!
//! `Organizer` owns the configuration, the metadata cache replayed from the
//! run log, and the completion service. It is created once at startup and
//! threaded through every operation; nothing lives in globals.

use std::path::Path;

use crate::config::OrganizerConfig;
use crate::library::apply::{OrganizeReport, apply_plan, build_and_apply_plan};
use crate::library::error::LibraryResult;
use crate::library::model::{DocumentRecord, MetadataCache, OrganizationPlan, ResolvedDocuments};
use crate::library::naming::sanitize_filename;
use crate::library::resolver::{self, Resolution};
use crate::library::scan::{list_documents, raw_filename};
use crate::llm::CompletionService;
use crate::replay;

/// Documents found in a folder, split by resolution outcome.
#[derive(Debug, Default)]
pub struct ResolutionPass {
    /// Number of files considered.
    pub total_files: usize,
    pub resolved: ResolvedDocuments,
    /// Raw filenames that did not resolve.
    pub unresolved: Vec<String>,
}

/// Run context for organizing one or more folders.
pub struct Organizer {
    config: OrganizerConfig,
    cache: MetadataCache,
    service: Box<dyn CompletionService>,
}

impl Organizer {
    /// Create an organizer, replaying the configured run log into the cache.
    pub fn new(config: OrganizerConfig, service: Box<dyn CompletionService>) -> Self {
        let cache = replay::rebuild_cache(&config.log_file);
        Self::with_cache(config, service, cache)
    }

    /// Create an organizer with an explicit cache.
    pub fn with_cache(
        config: OrganizerConfig,
        service: Box<dyn CompletionService>,
        cache: MetadataCache,
    ) -> Self {
        Self {
            config,
            cache,
            service,
        }
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Resolve one file's metadata (cache first).
    pub fn resolve(&mut self, file_path: &Path) -> Resolution {
        resolver::resolve(self.service.as_ref(), &mut self.cache, file_path)
    }

    /// Resolve every document directly inside `root`.
    pub fn resolve_folder(&mut self, root: &Path) -> LibraryResult<ResolutionPass> {
        let files = list_documents(root, &self.config.extension)?;
        let total = files.len();
        println!("\nFound {total} {} files to process", self.config.extension.to_uppercase());

        let mut pass = ResolutionPass {
            total_files: total,
            ..Default::default()
        };

        for (idx, path) in files.iter().enumerate() {
            let filename = raw_filename(path);
            println!("\nProcessing file {}/{total}: {filename}", idx + 1);
            tracing::info!("Processing file: {filename}");

            let metadata = self.resolve(path).metadata();
            if !metadata.is_resolved() {
                println!("  ✗ Could not extract title/authors from filename");
                tracing::warn!("Skipping file due to missing title/authors: {filename}");
                pass.unresolved.push(filename);
                continue;
            }

            println!(
                "  ✓ Extracted metadata - Title: {}, Authors: {}",
                metadata.title, metadata.author
            );
            let record = DocumentRecord {
                source: path.clone(),
                filename: sanitize_filename(&filename),
                metadata,
            };
            if let Some(displaced) = pass.resolved.insert(record) {
                tracing::warn!(
                    "Duplicate work '{}': {} replaces {}",
                    displaced.work_key(),
                    filename,
                    displaced.source.display()
                );
            }
        }

        Ok(pass)
    }

    /// Fresh run: resolve every document, request a plan, and apply it.
    pub fn organize(&mut self, root: &Path) -> LibraryResult<OrganizeReport> {
        tracing::info!("Starting file organization in folder: {}", root.display());
        let pass = self.resolve_folder(root)?;
        if !pass.resolved.is_empty() {
            println!("\n=== Creating Organization Plan ===");
        }
        let mut report = build_and_apply_plan(self.service.as_ref(), &pass.resolved, root)?;
        report.total_files = pass.total_files;
        Ok(report)
    }

    /// Resume: apply a previously obtained plan without requesting a new one.
    ///
    /// Documents are resolved again (normally all from the cache) and moved
    /// according to `plan`. Folders are created even when nothing resolves.
    pub fn resume(&mut self, root: &Path, plan: &OrganizationPlan) -> LibraryResult<OrganizeReport> {
        tracing::info!("Resuming organization with provided placements JSON");
        let pass = self.resolve_folder(root)?;

        let mut report = apply_plan(root, plan, &pass.resolved)?;
        report.total_files = pass.total_files;
        Ok(report)
    }

    /// The most recent plan recorded in the run log.
    pub fn recover_plan(&self) -> Option<OrganizationPlan> {
        replay::find_last_placement_plan(&self.config.log_file)
    }
}

impl std::fmt::Debug for Organizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Organizer")
            .field("config", &self.config)
            .field("cached_files", &self.cache.len())
            .finish_non_exhaustive()
    }
}
