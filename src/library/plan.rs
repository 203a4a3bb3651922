//! Folder-taxonomy requests.
//!
//! The plan is one best-effort batch call per run: no retry and no partial
//! acceptance. Anything other than an object with a `placements` object
//! aborts the run.

use crate::extract;
use crate::library::error::{LibraryError, LibraryResult};
use crate::library::model::{OrganizationPlan, ResolvedDocuments};
use crate::llm::CompletionService;

/// Prompt listing every work as a `"{title} by {author}"` line.
pub fn plan_prompt(documents: &ResolvedDocuments) -> String {
    let works = documents.work_keys().collect::<Vec<_>>().join("\n");
    format!(
        "I will give you a list of academic works. Based on it, create a simple organization \
         scheme that best fits these works.\n\
         \n\
         Return ONLY a JSON object with a single property 'placements' that maps each work \
         title to its designated folder path. The folder paths should use forward slashes and \
         can be nested (e.g. 'Science/Physics').\n\
         \n\
         Works to organize:\n{works}"
    )
}

/// Ask the completion service for a placement plan covering `documents`.
pub fn request_plan(
    service: &dyn CompletionService,
    documents: &ResolvedDocuments,
) -> LibraryResult<OrganizationPlan> {
    if documents.is_empty() {
        return Err(LibraryError::NoDocuments);
    }

    let output = service
        .complete_json(&plan_prompt(documents))
        .map_err(|source| LibraryError::PlanRequest { source })?;

    OrganizationPlan::from_json(&output).inspect_err(|e| {
        tracing::error!("Invalid organization plan format received: {e}");
    })
}

/// Parse a plan supplied by hand (pasted or read from a file).
///
/// Goes through the same extraction as live replies, so a plan copied
/// together with surrounding log text or fences still parses.
pub fn parse_plan(text: &str) -> LibraryResult<OrganizationPlan> {
    let cleaned = extract::strip_artifacts(text);
    let candidate = extract::placement_blobs(&cleaned)
        .into_iter()
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| extract::extract_json(&cleaned));
    OrganizationPlan::from_json(&candidate)
}
