//! Folder creation and file moves for an organization plan.
//!
//! Nothing here is transactional: every directory and every move is attempted
//! independently, failures are recorded per item, and files already moved
//! stay moved.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::library::error::{LibraryError, LibraryResult};
use crate::library::model::{OrganizationPlan, ResolvedDocuments};
use crate::library::naming::{folder_segments, target_filename};
use crate::library::plan::request_plan;
use crate::llm::CompletionService;

/// Plan folder path -> directory on disk, for every path fully created.
#[derive(Debug, Default)]
pub struct FolderMap {
    created: BTreeMap<String, PathBuf>,
    failures: Vec<String>,
}

impl FolderMap {
    pub fn get(&self, folder_path: &str) -> Option<&Path> {
        self.created.get(folder_path).map(PathBuf::as_path)
    }

    pub fn created(&self) -> usize {
        self.created.len()
    }

    /// Human-readable descriptions of the directories that failed.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Moved { from: PathBuf, to: PathBuf },
    /// The plan has no entry for this work.
    NoPlacement { work_key: String },
    /// The assigned folder could not be created.
    FolderUnavailable { work_key: String, folder: String },
    MoveFailed { from: PathBuf, to: PathBuf, message: String },
}

/// Summary of an apply pass.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    /// Files considered (resolved or not).
    pub total_files: usize,
    /// Documents with both title and author.
    pub total_resolved: usize,
    pub folders_created: usize,
    pub folder_failures: Vec<String>,
    pub outcomes: Vec<FileOutcome>,
}

impl OrganizeReport {
    pub fn moved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Moved { .. }))
            .count()
    }
}

/// Create every folder path in `plan` under `root`, one segment at a time.
///
/// Segments are sanitized independently; existing directories count as
/// success. A path is usable only when all of its segments were created.
pub fn create_folders(root: &Path, plan: &OrganizationPlan) -> FolderMap {
    let mut map = FolderMap::default();

    for folder_path in plan.folders() {
        let segments = folder_segments(folder_path);
        if segments.is_empty() {
            tracing::error!("Folder path '{folder_path}' has no usable segments");
            map.failures
                .push(format!("{folder_path}: no usable path segments"));
            continue;
        }

        let mut current = root.to_path_buf();
        let mut complete = true;
        for segment in &segments {
            current.push(segment);
            match std::fs::create_dir(&current) {
                Ok(()) => tracing::info!("Created folder: {}", current.display()),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && current.is_dir() => {}
                Err(e) => {
                    tracing::error!("Error creating folder {}: {e}", current.display());
                    map.failures.push(format!("{}: {e}", current.display()));
                    complete = false;
                    break;
                }
            }
        }

        if complete {
            map.created.insert(folder_path.to_string(), current);
        }
    }

    map
}

/// Rename `from` to `to`, copying across filesystems when a plain rename
/// cannot. Refuses to overwrite an existing destination.
pub fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if to.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("destination already exists: {}", to.display()),
        ));
    }
    match std::fs::rename(from, to) {
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
        other => other,
    }
}

/// Copy `from` to `to`, then remove `from`.
///
/// On failure the destination is removed again, so a failed move leaves
/// exactly the source file behind.
fn copy_then_remove(from: &Path, to: &Path) -> std::io::Result<()> {
    let result = std::fs::copy(from, to).and_then(|_| std::fs::remove_file(from));
    if let Err(e) = &result {
        tracing::warn!("Copy of {} failed ({e}), removing {}", from.display(), to.display());
        match std::fs::remove_file(to) {
            Err(cleanup) if cleanup.kind() != std::io::ErrorKind::NotFound => {
                tracing::error!("Could not remove partial copy {}: {cleanup}", to.display());
            }
            _ => {}
        }
    }
    result
}

/// Create the plan's folders and move every resolved document into place.
///
/// Aborts with [`LibraryError::NoFolders`] before touching any file when not a
/// single folder path could be created.
pub fn apply_plan(
    root: &Path,
    plan: &OrganizationPlan,
    documents: &ResolvedDocuments,
) -> LibraryResult<OrganizeReport> {
    let folders = create_folders(root, plan);
    if folders.created() == 0 {
        tracing::error!("No folders were created");
        return Err(LibraryError::NoFolders {
            root: root.display().to_string(),
        });
    }

    let mut report = OrganizeReport {
        total_files: documents.len(),
        total_resolved: documents.len(),
        folders_created: folders.created(),
        folder_failures: folders.failures().to_vec(),
        outcomes: Vec::with_capacity(documents.len()),
    };

    for record in documents.records() {
        let work_key = record.work_key();
        let Some(folder) = plan.folder_for(&work_key) else {
            tracing::error!("No matching placement found for '{}'", record.metadata.title);
            report.outcomes.push(FileOutcome::NoPlacement { work_key });
            continue;
        };
        let Some(target_dir) = folders.get(folder) else {
            tracing::error!("Folder '{folder}' for '{}' was not created", record.metadata.title);
            report.outcomes.push(FileOutcome::FolderUnavailable {
                work_key,
                folder: folder.to_string(),
            });
            continue;
        };

        let new_name = target_filename(
            &record.metadata.author,
            &record.metadata.title,
            &record.source,
        );
        let destination = target_dir.join(&new_name);

        match move_file(&record.source, &destination) {
            Ok(()) => {
                tracing::info!("Successfully moved and renamed file to: {}", destination.display());
                report.outcomes.push(FileOutcome::Moved {
                    from: record.source.clone(),
                    to: destination,
                });
            }
            Err(e) => {
                tracing::error!("Error moving file to {}: {e}", destination.display());
                report.outcomes.push(FileOutcome::MoveFailed {
                    from: record.source.clone(),
                    to: destination,
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Organization complete! Moved {} out of {} files",
        report.moved(),
        report.total_resolved
    );
    Ok(report)
}

/// Request a plan for `documents` and apply it under `root`.
pub fn build_and_apply_plan(
    service: &dyn CompletionService,
    documents: &ResolvedDocuments,
    root: &Path,
) -> LibraryResult<OrganizeReport> {
    if documents.is_empty() {
        tracing::error!("No documents with valid metadata found. Stopping organization process.");
        return Err(LibraryError::NoDocuments);
    }
    let plan = request_plan(service, documents)?;
    apply_plan(root, &plan, documents)
}
