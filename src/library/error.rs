//! Rich diagnostic error types for the document library.

use miette::Diagnostic;
use thiserror::Error;

use crate::llm::LlmError;

/// Errors from planning and applying an organization run.
#[derive(Debug, Error, Diagnostic)]
pub enum LibraryError {
    #[error("no documents with valid metadata found")]
    #[diagnostic(
        code(shelver::library::no_documents),
        help(
            "None of the files resolved to a title and an author. Files that failed \
             before are not retried automatically; delete their entries from the run \
             log to query them again."
        )
    )]
    NoDocuments,

    #[error("failed to parse organization plan: {message}")]
    #[diagnostic(
        code(shelver::library::plan_malformed),
        help("The model reply was not valid JSON. Run again, or resume with a plan pasted by hand.")
    )]
    PlanMalformed { message: String },

    #[error("organization plan is not a JSON object")]
    #[diagnostic(
        code(shelver::library::plan_not_object),
        help("A plan must look like {{\"placements\": {{\"Title by Author\": \"Folder/Sub\"}}}}.")
    )]
    PlanNotObject,

    #[error("organization plan has no 'placements' object")]
    #[diagnostic(
        code(shelver::library::missing_placements),
        help("A plan must look like {{\"placements\": {{\"Title by Author\": \"Folder/Sub\"}}}}.")
    )]
    MissingPlacements,

    #[error("organization plan request failed")]
    #[diagnostic(
        code(shelver::library::plan_request),
        help("The plan is requested once per run and never retried. Check the run log, then run again.")
    )]
    PlanRequest {
        #[source]
        source: LlmError,
    },

    #[error("failed to create any folders under {root}")]
    #[diagnostic(
        code(shelver::library::no_folders),
        help("Check that the folder is writable and that the plan names usable folder paths.")
    )]
    NoFolders { root: String },

    #[error("failed to list documents in {path}")]
    #[diagnostic(
        code(shelver::library::scan),
        help("Check that the folder exists and is readable.")
    )]
    Scan {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for library operation results.
pub type LibraryResult<T> = std::result::Result<T, LibraryError>;
