use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use super::{Document, DocumentError};
use crate::domain::{FieldPath, IntoFieldPath};

/// Element fields that store indices into their own list.
///
/// Keyed by the dotted list path. A registered field may hold a single
/// integer or a list of integers; anything else in it is left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossRefs {
    fields: IndexMap<String, Vec<String>>,
}

impl Default for CrossRefs {
    fn default() -> Self {
        Self::empty().with("progression_tree_nodes", ["prerequisites"])
    }
}

impl CrossRefs {
    pub fn empty() -> Self {
        Self {
            fields: IndexMap::new(),
        }
    }

    pub fn with<I, S>(mut self, list_path: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.fields.entry(list_path.into()).or_default();
        for field in fields {
            let field = field.into();
            if !entry.contains(&field) {
                entry.push(field);
            }
        }
        self
    }

    pub fn fields_for(&self, list_path: &FieldPath) -> &[String] {
        self.fields
            .get(&list_path.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Document {
    pub fn list_len(&self, list_path: impl IntoFieldPath) -> Result<usize, DocumentError> {
        let list_path = list_path.into_field_path()?;
        match self.get(&list_path)? {
            None => Ok(0),
            Some(Value::Array(items)) => Ok(items.len()),
            Some(other) => Err(list_conflict(&list_path, other)),
        }
    }

    /// Pushes `item` onto the list, creating it when absent. Returns the
    /// new element's index.
    pub fn append(
        &mut self,
        list_path: impl IntoFieldPath,
        item: Value,
    ) -> Result<usize, DocumentError> {
        let list_path = list_path.into_field_path()?;
        let index = self.list_len(&list_path)?;
        self.set(list_path.child_index(index), item)?;
        Ok(index)
    }

    pub fn remove_at(
        &mut self,
        list_path: impl IntoFieldPath,
        index: usize,
    ) -> Result<Value, DocumentError> {
        let list_path = list_path.into_field_path()?;
        let ref_fields = self.cross_refs.fields_for(&list_path).to_vec();
        let items = self.list_mut(&list_path, index)?;
        let removed = items.remove(index);
        for item in items.iter_mut() {
            for field in &ref_fields {
                rewrite_refs(item, field, |target| match target {
                    t if t == index => None,
                    t if t > index => Some(t - 1),
                    t => Some(t),
                });
            }
        }
        debug!(list = %list_path, index, "list element removed");
        self.dirty.mark_dirty();
        Ok(removed)
    }

    pub fn move_up(
        &mut self,
        list_path: impl IntoFieldPath,
        index: usize,
    ) -> Result<(), DocumentError> {
        let list_path = list_path.into_field_path()?;
        if index == 0 {
            let len = self.list_len(&list_path)?;
            return Err(DocumentError::IndexOutOfRange {
                path: list_path.to_string(),
                index,
                len,
            });
        }
        self.swap(&list_path, index - 1, index)
    }

    pub fn move_down(
        &mut self,
        list_path: impl IntoFieldPath,
        index: usize,
    ) -> Result<(), DocumentError> {
        let list_path = list_path.into_field_path()?;
        let Some(next) = index.checked_add(1) else {
            let len = self.list_len(&list_path)?;
            return Err(DocumentError::IndexOutOfRange {
                path: list_path.to_string(),
                index,
                len,
            });
        };
        self.swap(&list_path, index, next)
    }

    /// Swaps two elements and retargets every registered reference so it
    /// keeps naming the same logical element.
    fn swap(&mut self, list_path: &FieldPath, a: usize, b: usize) -> Result<(), DocumentError> {
        let ref_fields = self.cross_refs.fields_for(list_path).to_vec();
        let items = self.list_mut(list_path, a.max(b))?;
        items.swap(a, b);
        for item in items.iter_mut() {
            for field in &ref_fields {
                rewrite_refs(item, field, |target| match target {
                    t if t == a => Some(b),
                    t if t == b => Some(a),
                    t => Some(t),
                });
            }
        }
        debug!(list = %list_path, from = a, to = b, "list elements swapped");
        self.dirty.mark_dirty();
        Ok(())
    }

    /// Mutable list at `list_path`, checked to contain `index`.
    fn list_mut(
        &mut self,
        list_path: &FieldPath,
        index: usize,
    ) -> Result<&mut Vec<Value>, DocumentError> {
        let out_of_range = |len| DocumentError::IndexOutOfRange {
            path: list_path.to_string(),
            index,
            len,
        };
        match self.get_mut(list_path)? {
            Some(Value::Array(items)) => {
                if index < items.len() {
                    Ok(items)
                } else {
                    Err(out_of_range(items.len()))
                }
            }
            Some(other) => Err(list_conflict(list_path, other)),
            None => Err(out_of_range(0)),
        }
    }
}

fn list_conflict(list_path: &FieldPath, found: &Value) -> DocumentError {
    DocumentError::TypeConflict {
        path: list_path.to_string(),
        expected: super::NodeKind::List,
        found: super::NodeKind::of(found),
    }
}

/// Applies `remap` to every integer stored under `field`. `None` drops the
/// reference: the key for a scalar field, the entry for a list field.
fn rewrite_refs(item: &mut Value, field: &str, remap: impl Fn(usize) -> Option<usize>) {
    let Some(record) = item.as_object_mut() else {
        return;
    };
    let Some(slot) = record.get_mut(field) else {
        return;
    };
    match slot {
        Value::Array(entries) => {
            entries.retain_mut(|entry| match as_index(entry) {
                Some(target) => match remap(target) {
                    Some(next) => {
                        *entry = Value::from(next);
                        true
                    }
                    None => false,
                },
                None => true,
            });
        }
        other => {
            if let Some(target) = as_index(other) {
                match remap(target) {
                    Some(next) => *other = Value::from(next),
                    None => {
                        record.shift_remove(field);
                    }
                }
            }
        }
    }
}

fn as_index(value: &Value) -> Option<usize> {
    value.as_u64().and_then(|n| usize::try_from(n).ok())
}
