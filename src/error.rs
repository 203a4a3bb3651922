//! Rich diagnostic error types for shelver.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. `ShelverError` composes them so the CLI
//! can render any failure with its full diagnostic chain.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::library::error::LibraryError;
use crate::llm::LlmError;
use crate::paths::PathError;

/// Top-level error type.
#[derive(Debug, Error, Diagnostic)]
pub enum ShelverError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Paths(#[from] PathError),

    #[error("failed to open run log: {path}")]
    #[diagnostic(
        code(shelver::journal::open),
        help(
            "The run log is appended on every run and replayed on the next one. \
             Check that its directory exists and is writable, or pass --log-file."
        )
    )]
    LogOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("folder does not exist: {path}")]
    #[diagnostic(
        code(shelver::root::missing),
        help("Pass the directory that directly contains the PDF files to organize.")
    )]
    RootMissing { path: String },

    #[error("an API key is required")]
    #[diagnostic(
        code(shelver::credential::missing),
        help("Pass --api-key, set OPENROUTER_API_KEY, or enter it when prompted.")
    )]
    MissingApiKey,

    #[error("failed to read plan file: {path}")]
    #[diagnostic(
        code(shelver::plan::file),
        help("Pass a file containing the placements JSON, e.g. copied from the run log.")
    )]
    PlanFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read user input: {source}")]
    #[diagnostic(code(shelver::prompt::io))]
    Prompt {
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for top-level results.
pub type ShelverResult<T> = std::result::Result<T, ShelverError>;
