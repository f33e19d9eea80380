//! Staging → main reconciliation.
//!
//! Every top-level key of the staging document is folded into main
//! according to its [`FieldClass`]. The policy is total: there is no
//! conflict outcome, and merging the same staging document twice leaves
//! main unchanged the second time.

mod bindings;
mod imports;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::document::Document;
use crate::domain::{FieldClass, Section};

use bindings::is_owned;
pub use bindings::{BindingDelta, push_identity, union_bindings};
pub use imports::{ImportClass, ImportKind, classify, merge_imports};

pub const BINDINGS_KEY: &str = "bindings";
pub const MODIFIER_ID_KEY: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    /// Binding prefixes the wizard manages. When staging defines
    /// `civilization.bindings`, main entries under these prefixes that
    /// staging was seeded with and no longer lists are dropped.
    pub owned_binding_prefixes: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            owned_binding_prefixes: vec!["MOD_".to_string()],
        }
    }
}

impl MergeConfig {
    pub fn with_owned_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.owned_binding_prefixes = prefixes;
        self
    }

    pub fn add_owned_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.owned_binding_prefixes.push(prefix.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Replaced,
    /// Staging held nothing usable; main's value stands.
    Kept,
    Merged {
        fields: usize,
        bindings: BindingDelta,
    },
    Reclassified {
        superseded: usize,
        appended: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub fields: IndexMap<String, FieldOutcome>,
    /// Modifier ids bound to the civilization after the field pass.
    pub modifier_bindings: Vec<String>,
    pub changed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    config: MergeConfig,
}

impl MergeEngine {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Owned bindings currently listed in `document`'s civilization. Taken
    /// from staging right after seeding, this is the baseline handed to
    /// [`MergeEngine::merge_seeded`].
    pub fn owned_bindings(&self, document: &Document) -> Vec<String> {
        let Some(Value::Object(civilization)) = document.root().get(Section::Civilization.key())
        else {
            return Vec::new();
        };
        civilization
            .get(BINDINGS_KEY)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .filter(|identity| is_owned(identity, &self.config.owned_binding_prefixes))
            .map(str::to_string)
            .collect()
    }

    /// Merges with no seed baseline: bindings are only ever added.
    pub fn merge(&self, staging: &Document, main: &mut Document) -> MergeReport {
        self.merge_seeded(staging, main, &[])
    }

    /// Merges `staging` into `main`. `seeded` lists the owned bindings
    /// staging held when it was seeded; of main's owned bindings only those
    /// may be dropped.
    pub fn merge_seeded(
        &self,
        staging: &Document,
        main: &mut Document,
        seeded: &[String],
    ) -> MergeReport {
        let before = main.to_value();
        let mut report = MergeReport::default();
        let target = main.root_mut();

        for (key, staged) in staging.root() {
            let outcome = match Section::class_of_key(key) {
                FieldClass::Replace => {
                    target.insert(key.clone(), staged.clone());
                    FieldOutcome::Replaced
                }
                FieldClass::EntityList => match staged {
                    Value::Array(items) if !items.is_empty() => {
                        target.insert(key.clone(), staged.clone());
                        FieldOutcome::Replaced
                    }
                    _ => FieldOutcome::Kept,
                },
                FieldClass::ClassifiedList => match staged {
                    Value::Array(items) => {
                        let existing = match target.get(key) {
                            Some(Value::Array(current)) => current.as_slice(),
                            _ => &[][..],
                        };
                        let (merged, superseded) = merge_imports(existing, items);
                        target.insert(key.clone(), Value::Array(merged));
                        FieldOutcome::Reclassified {
                            superseded,
                            appended: items.len(),
                        }
                    }
                    _ => FieldOutcome::Kept,
                },
                FieldClass::FlatRecord => self.merge_flat_record(target, key, staged, seeded),
            };
            debug!(field = %key, ?outcome, "merged staging field");
            report.fields.insert(key.clone(), outcome);
        }

        report.modifier_bindings = bind_staged_modifiers(staging, target);

        report.changed = main.as_value() != &before;
        if report.changed {
            main.tracker().mark_dirty();
        }
        report
    }

    fn merge_flat_record(
        &self,
        target: &mut Map<String, Value>,
        key: &str,
        staged: &Value,
        seeded: &[String],
    ) -> FieldOutcome {
        let Value::Object(staged_fields) = staged else {
            target.insert(key.to_string(), staged.clone());
            return FieldOutcome::Replaced;
        };
        let record = target
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !record.is_object() {
            *record = Value::Object(Map::new());
        }
        let Value::Object(record) = record else {
            return FieldOutcome::Kept;
        };

        let mut bindings = BindingDelta::default();
        for (field, value) in staged_fields {
            if field == BINDINGS_KEY
                && let Value::Array(staged_bindings) = value
            {
                let (merged, delta) = union_bindings(
                    record.get(BINDINGS_KEY),
                    staged_bindings,
                    &self.config.owned_binding_prefixes,
                    seeded,
                );
                record.insert(BINDINGS_KEY.to_string(), Value::Array(merged));
                bindings = delta;
            } else {
                record.insert(field.clone(), value.clone());
            }
        }
        FieldOutcome::Merged {
            fields: staged_fields.len(),
            bindings,
        }
    }
}

/// Binds every staged modifier with a usable id to main's civilization.
fn bind_staged_modifiers(staging: &Document, target: &mut Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(modifiers)) = staging.root().get(Section::Modifiers.key()) else {
        return Vec::new();
    };
    let Some(Value::Object(civilization)) = target.get_mut(Section::Civilization.key()) else {
        return Vec::new();
    };
    let slot = civilization
        .entry(BINDINGS_KEY.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(bindings) = slot else {
        return Vec::new();
    };

    modifiers
        .iter()
        .filter_map(|modifier| modifier.get(MODIFIER_ID_KEY).and_then(Value::as_str))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| push_identity(bindings, id))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DirtyTracker;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        let Value::Object(map) = value else {
            panic!("fixture must be an object")
        };
        Document::from_map(map, DirtyTracker::new())
    }

    #[test]
    fn replace_fields_win_wholesale() {
        let staging = doc(json!({"metadata": {"id": "new"}}));
        let mut main = doc(json!({"metadata": {"id": "old", "name": "kept?"}, "build": {"x": 1}}));
        let report = MergeEngine::default().merge(&staging, &mut main);
        assert_eq!(
            main.to_value(),
            json!({"metadata": {"id": "new"}, "build": {"x": 1}})
        );
        assert_eq!(report.fields["metadata"], FieldOutcome::Replaced);
        assert!(report.changed);
    }

    #[test]
    fn empty_entity_lists_keep_main() {
        let staging = doc(json!({"units": [], "constructibles": [{"id": "c2"}]}));
        let mut main = doc(json!({"units": [{"id": "u1"}], "constructibles": [{"id": "c1"}]}));
        MergeEngine::default().merge(&staging, &mut main);
        assert_eq!(
            main.to_value(),
            json!({"units": [{"id": "u1"}], "constructibles": [{"id": "c2"}]})
        );
    }

    #[test]
    fn civilization_merges_field_by_field() {
        let staging = doc(json!({"civilization": {"name": "Rome", "bindings": ["tree_x"]}}));
        let mut main = doc(json!({
            "civilization": {"name": "Old", "civilization_type": "CIV_ROME", "bindings": ["unit_a"]}
        }));
        let report = MergeEngine::default().merge(&staging, &mut main);
        assert_eq!(
            main.to_value(),
            json!({"civilization": {
                "name": "Rome",
                "civilization_type": "CIV_ROME",
                "bindings": ["unit_a", "tree_x"]
            }})
        );
        assert!(matches!(
            &report.fields["civilization"],
            FieldOutcome::Merged { fields: 2, bindings } if bindings.added == ["tree_x"]
        ));
    }

    #[test]
    fn modifiers_are_bound_after_merge() {
        let staging = doc(json!({"modifiers": [{"id": "MOD_X"}, {"id": ""}, {"effect": "E"}]}));
        let mut main = doc(json!({"civilization": {"bindings": ["unit_a"]}}));
        let report = MergeEngine::default().merge(&staging, &mut main);
        assert_eq!(
            main.get("civilization.bindings").unwrap(),
            Some(&json!(["unit_a", "MOD_X"]))
        );
        assert_eq!(report.modifier_bindings, vec!["MOD_X".to_string()]);
    }

    #[test]
    fn modifiers_without_civilization_bind_nothing() {
        let staging = doc(json!({"modifiers": [{"id": "MOD_X"}]}));
        let mut main = Document::default();
        let report = MergeEngine::default().merge(&staging, &mut main);
        assert!(main.get("civilization").unwrap().is_none());
        assert!(report.modifier_bindings.is_empty());
    }

    #[test]
    fn second_merge_changes_nothing() {
        let staging = doc(json!({
            "metadata": {"id": "m"},
            "civilization": {"name": "Rome", "bindings": ["MOD_A", "unit_a"]},
            "modifiers": [{"id": "MOD_A"}, {"id": "MOD_B"}],
            "imports": [{"id": "civ_icon", "source_path": "x.png", "target_name": "x"}]
        }));
        let mut main = doc(json!({
            "civilization": {"bindings": ["MOD_OLD", "building_b"]},
            "imports": [{"id": "civ_icon_old", "source_path": "y.png", "target_name": "y"}]
        }));
        let engine = MergeEngine::default();
        let first = engine.merge(&staging, &mut main);
        let snapshot = main.to_value();
        main.tracker().mark_clean();
        let second = engine.merge(&staging, &mut main);
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(main.to_value(), snapshot);
        assert!(!main.tracker().is_dirty());
        assert_eq!(
            main.get("civilization.bindings").unwrap(),
            Some(&json!(["MOD_OLD", "building_b", "MOD_A", "unit_a", "MOD_B"]))
        );
    }

    #[test]
    fn seeded_baseline_limits_drops() {
        let engine = MergeEngine::default();
        let seeded_from = doc(json!({"civilization": {"bindings": ["MOD_GONE", "unit_a"]}}));
        let seeded = engine.owned_bindings(&seeded_from);
        assert_eq!(seeded, vec!["MOD_GONE".to_string()]);

        let staging = doc(json!({
            "civilization": {"bindings": ["unit_a"]},
            "modifiers": [{"id": "MOD_A"}]
        }));
        let mut main = doc(json!({
            "civilization": {"bindings": ["unit_a", "MOD_GONE", "MOD_MANUAL"]}
        }));
        let report = engine.merge_seeded(&staging, &mut main, &seeded);
        assert_eq!(
            main.get("civilization.bindings").unwrap(),
            Some(&json!(["unit_a", "MOD_MANUAL", "MOD_A"]))
        );
        let FieldOutcome::Merged { bindings, .. } = &report.fields["civilization"] else {
            panic!("civilization should merge field by field")
        };
        assert_eq!(bindings.dropped, vec!["MOD_GONE".to_string()]);
    }
}
