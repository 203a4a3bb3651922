//! The document library: resolving metadata for academic PDFs, requesting a
//! folder taxonomy, and moving each file into place.
//!
//! Files are identified by their raw filename (the run-log key) and, once
//! resolved, by their work key `"{title} by {author}"` (the plan key).

pub mod apply;
pub mod error;
pub mod model;
pub mod naming;
pub mod plan;
pub mod resolver;
pub mod scan;

pub use apply::{FileOutcome, OrganizeReport, apply_plan, build_and_apply_plan};
pub use error::{LibraryError, LibraryResult};
pub use model::{
    DocumentMetadata, DocumentRecord, MetadataCache, OrganizationPlan, ResolvedDocuments,
};
pub use resolver::{Resolution, resolve};
