mod array;
mod dirty;
mod error;

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::{FieldPath, IntoFieldPath, Segment};

pub use array::CrossRefs;
pub use dirty::DirtyTracker;
pub use error::{DocumentError, NodeKind};

/// How `set` treats an existing intermediate node of the wrong kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationMode {
    /// Report a [`DocumentError::TypeConflict`].
    #[default]
    Strict,
    /// Replace the offending node with a fresh container. The root record
    /// is never replaced.
    Coerce,
}

/// A schema-less record/list/scalar tree whose root is always a record.
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
    mode: MutationMode,
    cross_refs: CrossRefs,
    dirty: DirtyTracker,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DirtyTracker::new())
    }
}

impl Document {
    pub fn new(dirty: DirtyTracker) -> Self {
        Self {
            root: Value::Object(Map::new()),
            mode: MutationMode::default(),
            cross_refs: CrossRefs::default(),
            dirty,
        }
    }

    pub fn from_map(map: Map<String, Value>, dirty: DirtyTracker) -> Self {
        let mut document = Self::new(dirty);
        document.root = Value::Object(map);
        document
    }

    pub fn with_mode(mut self, mode: MutationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cross_refs(mut self, cross_refs: CrossRefs) -> Self {
        self.cross_refs = cross_refs;
        self
    }

    pub fn mode(&self) -> MutationMode {
        self.mode
    }

    pub fn tracker(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn to_value(&self) -> Value {
        self.root.clone()
    }

    pub fn root(&self) -> &Map<String, Value> {
        match &self.root {
            Value::Object(map) => map,
            _ => unreachable!("document root is always a record"),
        }
    }

    pub(crate) fn root_mut(&mut self) -> &mut Map<String, Value> {
        match &mut self.root {
            Value::Object(map) => map,
            _ => unreachable!("document root is always a record"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root().is_empty()
    }

    /// Swaps in a whole new tree without touching the dirty flag.
    pub fn replace_root(&mut self, map: Map<String, Value>) {
        self.root = Value::Object(map);
    }

    pub fn clear(&mut self) {
        self.root = Value::Object(Map::new());
    }

    /// Returns the addressed node, or `None` when any step is absent.
    ///
    /// A stored `null` comes back as `Some(Value::Null)`.
    pub fn get(&self, path: impl IntoFieldPath) -> Result<Option<&Value>, DocumentError> {
        let path = path.into_field_path()?;
        let mut node = &self.root;
        for (depth, segment) in path.segments().iter().enumerate() {
            let child = match (segment, node) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(index), Value::Array(items)) => items.get(*index),
                (_, other) => return Err(DocumentError::conflict_at(&path, depth, other)),
            };
            match child {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }

    pub fn contains(&self, path: impl IntoFieldPath) -> bool {
        matches!(self.get(path), Ok(Some(_)))
    }

    /// Text at `path` when it is a non-blank string.
    pub fn get_str(&self, path: impl IntoFieldPath) -> Option<&str> {
        match self.get(path) {
            Ok(Some(Value::String(text))) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    pub(crate) fn get_mut(
        &mut self,
        path: &FieldPath,
    ) -> Result<Option<&mut Value>, DocumentError> {
        let mut node = &mut self.root;
        for (depth, segment) in path.segments().iter().enumerate() {
            let child = match (segment, node) {
                (Segment::Key(key), Value::Object(map)) => map.get_mut(key),
                (Segment::Index(index), Value::Array(items)) => items.get_mut(*index),
                (_, other) => return Err(DocumentError::conflict_at(path, depth, other)),
            };
            match child {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }

    /// Writes `value` at `path`, creating missing records and lists on the
    /// way. Lists only grow by appending at index `len`.
    pub fn set(&mut self, path: impl IntoFieldPath, value: Value) -> Result<(), DocumentError> {
        let path = path.into_field_path()?;
        self.check_writable(&path)?;
        write_at(&mut self.root, &path, 0, value, self.mode)?;
        debug!(path = %path, "document field set");
        self.dirty.mark_dirty();
        Ok(())
    }

    /// Deletes the addressed record key or list element. List removal
    /// shifts later elements down and rewrites registered cross-references.
    pub fn remove(&mut self, path: impl IntoFieldPath) -> Result<Option<Value>, DocumentError> {
        let path = path.into_field_path()?;
        match (path.parent(), path.last()) {
            (parent, Some(Segment::Index(index))) => {
                let Some(parent) = parent else {
                    return Err(DocumentError::conflict_at(&path, 0, &self.root));
                };
                self.remove_at(&parent, *index).map(Some)
            }
            (parent, Some(Segment::Key(key))) => {
                let container = match &parent {
                    Some(parent) => self.get_mut(parent)?,
                    None => Some(&mut self.root),
                };
                let removed = match container {
                    Some(Value::Object(map)) => map.shift_remove(key),
                    Some(other) => {
                        return Err(DocumentError::conflict_at(
                            &path,
                            path.len() - 1,
                            other,
                        ));
                    }
                    None => None,
                };
                if removed.is_some() {
                    debug!(path = %path, "document field removed");
                    self.dirty.mark_dirty();
                }
                Ok(removed)
            }
            (_, None) => Err(DocumentError::invalid_path("", "path is empty")),
        }
    }

    /// Walks `path` without mutating, proving the write in `set` cannot
    /// fail halfway through.
    fn check_writable(&self, path: &FieldPath) -> Result<(), DocumentError> {
        // `None` once the walk has left the existing tree: every container
        // from there on is created fresh with the kind its segment needs.
        let mut node = Some(&self.root);
        for (depth, segment) in path.segments().iter().enumerate() {
            let current = match node {
                Some(current) if fits(segment, current) => current,
                Some(current) if depth == 0 || self.mode == MutationMode::Strict => {
                    return Err(DocumentError::conflict_at(path, depth, current));
                }
                _ => {
                    if let Segment::Index(index) = segment
                        && *index != 0
                    {
                        return Err(DocumentError::out_of_range(path, depth, *index, 0));
                    }
                    node = None;
                    continue;
                }
            };
            node = match (segment, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(index), Value::Array(items)) => {
                    if *index > items.len() {
                        return Err(DocumentError::out_of_range(
                            path,
                            depth,
                            *index,
                            items.len(),
                        ));
                    }
                    items.get(*index)
                }
                _ => None,
            };
        }
        Ok(())
    }
}

fn fits(segment: &Segment, node: &Value) -> bool {
    matches!(
        (segment, node),
        (Segment::Key(_), Value::Object(_)) | (Segment::Index(_), Value::Array(_))
    )
}

fn empty_container_for(segment: &Segment) -> Value {
    match segment {
        Segment::Key(_) => Value::Object(Map::new()),
        Segment::Index(_) => Value::Array(Vec::new()),
    }
}

fn write_at(
    node: &mut Value,
    path: &FieldPath,
    depth: usize,
    value: Value,
    mode: MutationMode,
) -> Result<(), DocumentError> {
    let segments = path.segments();
    let segment = &segments[depth];
    if !fits(segment, node) {
        if depth == 0 || mode == MutationMode::Strict {
            return Err(DocumentError::conflict_at(path, depth, node));
        }
        *node = empty_container_for(segment);
    }
    let is_last = depth + 1 == segments.len();
    match (segment, node) {
        (Segment::Key(key), Value::Object(map)) => {
            if is_last {
                map.insert(key.clone(), value);
                return Ok(());
            }
            let child = map
                .entry(key.clone())
                .or_insert_with(|| empty_container_for(&segments[depth + 1]));
            write_at(child, path, depth + 1, value, mode)
        }
        (Segment::Index(index), Value::Array(items)) => {
            let index = *index;
            if index > items.len() {
                return Err(DocumentError::out_of_range(path, depth, index, items.len()));
            }
            if is_last {
                if index == items.len() {
                    items.push(value);
                } else {
                    items[index] = value;
                }
                return Ok(());
            }
            if index == items.len() {
                items.push(empty_container_for(&segments[depth + 1]));
            }
            write_at(&mut items[index], path, depth + 1, value, mode)
        }
        (_, other) => Err(DocumentError::conflict_at(path, depth, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => Document::from_map(map, DirtyTracker::new()),
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn set_creates_lists_for_index_segments() {
        let mut document = Document::default();
        document.set("units.0.id", json!("u1")).unwrap();
        document.set("units.0.unit_type", json!("UNIT_X")).unwrap();
        assert_eq!(
            document.to_value(),
            json!({"units": [{"id": "u1", "unit_type": "UNIT_X"}]})
        );
    }

    #[test]
    fn get_distinguishes_null_from_absent() {
        let document = doc(json!({"metadata": {"description": null}}));
        assert_eq!(
            document.get("metadata.description").unwrap(),
            Some(&Value::Null)
        );
        assert_eq!(document.get("metadata.name").unwrap(), None);
        assert_eq!(document.get("missing.deeply.nested.0").unwrap(), None);
    }

    #[test]
    fn get_reports_kind_mismatch() {
        let document = doc(json!({"units": [{"id": "u1"}], "metadata": {"id": "m"}}));
        let err = document.get("units.id").unwrap_err();
        assert_eq!(
            err,
            DocumentError::TypeConflict {
                path: "units".into(),
                expected: NodeKind::Record,
                found: NodeKind::List,
            }
        );
        assert!(matches!(
            document.get("metadata.0"),
            Err(DocumentError::TypeConflict { .. })
        ));
        assert!(matches!(
            document.get("metadata.id.deeper"),
            Err(DocumentError::TypeConflict { .. })
        ));
    }

    #[test]
    fn strict_mode_rejects_overwriting_containers() {
        let mut document = doc(json!({"civilization": "oops"}));
        let err = document.set("civilization.name", json!("Rome")).unwrap_err();
        assert!(matches!(err, DocumentError::TypeConflict { .. }));
        assert_eq!(document.to_value(), json!({"civilization": "oops"}));
        assert!(!document.tracker().is_dirty());
    }

    #[test]
    fn coerce_mode_replaces_wrong_kinds() {
        let mut document = doc(json!({"civilization": "oops", "units": {"a": 1}}))
            .with_mode(MutationMode::Coerce);
        document.set("civilization.name", json!("Rome")).unwrap();
        document.set("units.0", json!("u")).unwrap();
        assert_eq!(
            document.to_value(),
            json!({"civilization": {"name": "Rome"}, "units": ["u"]})
        );
    }

    #[test]
    fn coerce_mode_never_replaces_root() {
        let mut document = Document::default().with_mode(MutationMode::Coerce);
        assert!(matches!(
            document.set("0", json!(1)),
            Err(DocumentError::TypeConflict { .. })
        ));
    }

    #[test]
    fn set_refuses_sparse_indices_atomically() {
        let mut document = Document::default();
        let err = document.set("progression_trees.0.nodes.3.id", json!("n")).unwrap_err();
        assert_eq!(
            err,
            DocumentError::IndexOutOfRange {
                path: "progression_trees.0.nodes".into(),
                index: 3,
                len: 0,
            }
        );
        assert!(document.is_empty());
        assert!(!document.tracker().is_dirty());
    }

    #[test]
    fn set_replaces_and_appends_within_bounds() {
        let mut document = doc(json!({"tags": ["a", "b"]}));
        document.set("tags.1", json!("B")).unwrap();
        document.set("tags.2", json!("c")).unwrap();
        assert_eq!(document.get("tags").unwrap(), Some(&json!(["a", "B", "c"])));
        assert!(matches!(
            document.set("tags.9", json!("z")),
            Err(DocumentError::IndexOutOfRange { index: 9, len: 3, .. })
        ));
    }

    #[test]
    fn successful_set_marks_tracker() {
        let tracker = DirtyTracker::new();
        let mut document = Document::new(tracker.clone());
        document.set("metadata.id", json!("my-mod")).unwrap();
        assert!(tracker.is_dirty());
    }

    #[test]
    fn remove_deletes_keys_and_ignores_absent_ones() {
        let mut document = doc(json!({"metadata": {"id": "m", "name": "n"}}));
        assert_eq!(document.remove("metadata.name").unwrap(), Some(json!("n")));
        assert_eq!(document.remove("metadata.name").unwrap(), None);
        assert_eq!(document.remove("absent.key").unwrap(), None);
        assert_eq!(document.to_value(), json!({"metadata": {"id": "m"}}));
    }
}
