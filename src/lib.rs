#![deny(rust_2018_idioms)]
//! Editing core for game mod configuration documents.
//!
//! A mod is a single record tree edited in two ways: directly through
//! dot-notation paths ("expert" mode), or through a five-step wizard that
//! stages its edits in a second document and merges them back on finish.

pub mod catalog;
pub mod document;
pub mod domain;
pub mod io;
pub mod merge;
pub mod session;
pub mod wizard;

pub use catalog::{CatalogEntry, DataType, HttpCatalog, ReferenceCatalog};
pub use document::{CrossRefs, DirtyTracker, Document, DocumentError, MutationMode, NodeKind};
pub use domain::{FieldClass, FieldPath, IntoFieldPath, Section, Segment};
pub use io::{
    DocumentFormat, OutputDestination, OutputOptions, emit, parse_document_map,
    parse_document_str,
};
pub use merge::{FieldOutcome, MergeConfig, MergeEngine, MergeReport};
pub use session::{EditorMode, EditorSession, SessionError, SessionOptions, StatusLine};
pub use wizard::{WizardError, WizardState, WizardStepMachine};

pub mod prelude {
    pub use super::{
        Document, DocumentError, EditorMode, EditorSession, FieldPath, MergeConfig,
        MutationMode, SessionError, SessionOptions, WizardError, WizardState,
    };
}
