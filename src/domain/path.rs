use std::fmt;
use std::str::FromStr;

use crate::document::DocumentError;

/// One step of a [`FieldPath`]. Decided once at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Dot-notation address into a document, e.g. `units.0.unit_type`.
///
/// Every segment made only of ASCII digits becomes [`Segment::Index`], even
/// where a record happens to use a numeric-looking key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, DocumentError> {
        if raw.is_empty() {
            return Err(DocumentError::invalid_path(raw, "path is empty"));
        }
        let mut segments = Vec::new();
        for (position, token) in raw.split('.').enumerate() {
            if token.is_empty() {
                return Err(DocumentError::invalid_path(
                    raw,
                    format!("segment {position} is empty"),
                ));
            }
            segments.push(parse_segment(raw, token)?);
        }
        Ok(Self { segments })
    }

    pub fn from_segments(segments: Vec<Segment>) -> Result<Self, DocumentError> {
        if segments.is_empty() {
            return Err(DocumentError::invalid_path("", "path is empty"));
        }
        if segments
            .iter()
            .any(|segment| matches!(segment, Segment::Key(key) if key.is_empty()))
        {
            return Err(DocumentError::invalid_path("", "empty key segment"));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.into()));
        Self { segments }
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    pub fn parent(&self) -> Option<FieldPath> {
        let (_, rest) = self.segments.split_last()?;
        (!rest.is_empty()).then(|| FieldPath {
            segments: rest.to_vec(),
        })
    }
}

/// All-digit tokens are indices, so `01` and `1` address the same element
/// and display as `1`.
fn parse_segment(raw: &str, token: &str) -> Result<Segment, DocumentError> {
    if token.bytes().all(|b| b.is_ascii_digit()) {
        let index = token
            .parse::<usize>()
            .map_err(|_| DocumentError::invalid_path(raw, format!("index `{token}` is too large")))?;
        Ok(Segment::Index(index))
    } else {
        Ok(Segment::Key(token.to_string()))
    }
}

impl FromStr for FieldPath {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

/// Anything the document API accepts as an address: raw dot strings are
/// parsed on the way in, already-parsed paths pass through.
pub trait IntoFieldPath {
    fn into_field_path(self) -> Result<FieldPath, DocumentError>;
}

impl IntoFieldPath for &str {
    fn into_field_path(self) -> Result<FieldPath, DocumentError> {
        FieldPath::parse(self)
    }
}

impl IntoFieldPath for &String {
    fn into_field_path(self) -> Result<FieldPath, DocumentError> {
        FieldPath::parse(self)
    }
}

impl IntoFieldPath for FieldPath {
    fn into_field_path(self) -> Result<FieldPath, DocumentError> {
        Ok(self)
    }
}

impl IntoFieldPath for &FieldPath {
    fn into_field_path(self) -> Result<FieldPath, DocumentError> {
        Ok(self.clone())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
