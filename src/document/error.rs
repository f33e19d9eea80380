use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::domain::{FieldPath, Segment};

/// Coarse node kind used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Record,
    List,
    Scalar,
}

impl NodeKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => NodeKind::Record,
            Value::Array(_) => NodeKind::List,
            _ => NodeKind::Scalar,
        }
    }

    /// Container kind a segment needs to traverse into.
    pub fn expected_by(segment: &Segment) -> Self {
        match segment {
            Segment::Key(_) => NodeKind::Record,
            Segment::Index(_) => NodeKind::List,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Record => write!(f, "record"),
            NodeKind::List => write!(f, "list"),
            NodeKind::Scalar => write!(f, "scalar"),
        }
    }
}

/// Recoverable failures of the document API. The document is left
/// untouched whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("type conflict at `{path}`: expected {expected}, found {found}")]
    TypeConflict {
        path: String,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("index {index} out of range at `{path}` (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },
}

impl DocumentError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DocumentError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Conflict found while stepping through `path.segments()[depth]`.
    pub(crate) fn conflict_at(path: &FieldPath, depth: usize, found: &Value) -> Self {
        let segments = path.segments();
        DocumentError::TypeConflict {
            path: prefix(segments, depth),
            expected: NodeKind::expected_by(&segments[depth]),
            found: NodeKind::of(found),
        }
    }

    pub(crate) fn out_of_range(path: &FieldPath, depth: usize, index: usize, len: usize) -> Self {
        DocumentError::IndexOutOfRange {
            path: prefix(path.segments(), depth),
            index,
            len,
        }
    }
}

/// Dotted text of the container addressed by the first `depth` segments.
fn prefix(segments: &[Segment], depth: usize) -> String {
    if depth == 0 {
        return "<root>".to_string();
    }
    segments[..depth]
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
