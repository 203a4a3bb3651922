// thiserror's #[error("...{field}...")] format strings reference struct fields,
// which the compiler reports as unused assignments through the derive.
#![allow(unused_assignments)]

//! # shelver
//!
//! Organizes a folder of academic PDFs into a subject taxonomy. Bibliographic
//! metadata is inferred from each filename by a text-completion model, the
//! model proposes a folder tree for the whole batch, and every file is renamed
//! `Surname-Title.pdf` and moved into its folder.
//!
//! ## Architecture
//!
//! - **Extraction** (`extract`): recovers JSON from free-form model replies
//! - **Completion** (`llm`): the text-completion seam and its OpenRouter client
//! - **Library** (`library`): metadata resolution, plan requests, folder creation and moves
//! - **Run log** (`journal`, `replay`): the append-only log that doubles as the
//!   persisted cache; replayed at startup and scanned for the last plan
//! - **Organizer** (`organizer`): the run context tying the pieces together
//!
//! ## Library usage
//!
//! ```no_run
//! use shelver::config::OrganizerConfig;
//! use shelver::llm::OpenRouterClient;
//! use shelver::organizer::Organizer;
//!
//! let config = OrganizerConfig::default();
//! let client = OpenRouterClient::new(config.completion_config(), "sk-or-...");
//! let mut organizer = Organizer::new(config, Box::new(client));
//! let report = organizer.organize(std::path::Path::new("papers")).unwrap();
//! println!("moved {} files", report.moved());
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod journal;
pub mod library;
pub mod llm;
pub mod organizer;
pub mod paths;
pub mod prompt;
pub mod replay;
