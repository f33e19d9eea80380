//! Reading and writing whole mod documents. The editing core never calls
//! into this module; hosts use it around a session.

mod format;
mod input;
mod output;

pub use format::DocumentFormat;
pub use input::{parse_document_map, parse_document_str};
pub use output::{OutputDestination, OutputOptions, emit, render};
