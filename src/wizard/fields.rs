use std::sync::LazyLock;

use indexmap::IndexMap;
use serde_json::Value;

use crate::document::{Document, DocumentError};
use crate::domain::{FieldPath, Segment};

/// Where a wizard field lives in the document and which step shows it.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub label: &'static str,
    pub path: FieldPath,
    pub step: u8,
    /// Message reported by `finish` while the field is empty.
    pub required: Option<&'static str>,
}

impl FieldBinding {
    pub fn read<'a>(&self, document: &'a Document) -> Option<&'a Value> {
        document.get(&self.path).ok().flatten()
    }

    pub fn write(&self, document: &mut Document, value: Value) -> Result<(), DocumentError> {
        document.set(&self.path, value)
    }

    pub fn is_filled(&self, document: &Document) -> bool {
        self.read(document).is_some_and(is_filled)
    }
}

/// Non-blank strings, non-empty lists and records, and any number or bool.
pub fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

pub type FieldTable = IndexMap<&'static str, FieldBinding>;

macro_rules! field {
    ($table:ident, $name:literal, $label:literal, $path:literal, $step:literal) => {
        field!($table, $name, $label, $path, $step, None)
    };
    ($table:ident, $name:literal, $label:literal, $path:literal, $step:literal, $required:expr) => {
        $table.insert(
            $name,
            FieldBinding {
                label: $label,
                path: FieldPath::parse($path).expect("wizard field paths are valid"),
                step: $step,
                required: $required,
            },
        );
    };
}

static FIELDS: LazyLock<FieldTable> = LazyLock::new(|| {
    let mut table = FieldTable::new();
    field!(table, "mod_id", "Mod ID", "metadata.id", 1, Some("Mod ID is required"));
    field!(table, "mod_name", "Mod name", "metadata.name", 1, Some("Mod name is required"));
    field!(table, "mod_description", "Description", "metadata.description", 1);
    field!(table, "mod_authors", "Authors", "metadata.authors", 1);
    field!(table, "package", "Package", "metadata.package", 1, Some("Package is required"));
    field!(
        table,
        "starting_age",
        "Starting age",
        "action_group.age",
        1,
        Some("Starting age is required")
    );
    field!(
        table,
        "civilization_type",
        "Civilization type",
        "civilization.civilization_type",
        2,
        Some("Civilization type is required")
    );
    field!(
        table,
        "civilization_name",
        "Display name",
        "civilization.name",
        2,
        Some("Civilization display name is required")
    );
    field!(
        table,
        "civilization_description",
        "Civilization description",
        "civilization.description",
        2
    );
    field!(table, "capital_names", "City names", "civilization.city_names", 2);
    field!(
        table,
        "traits",
        "Traits",
        "civilization.traits",
        3,
        Some("At least one civilization trait is required")
    );
    field!(table, "bindings", "Bindings", "civilization.bindings", 3);
    field!(table, "units", "Units", "units", 4);
    field!(table, "constructibles", "Constructibles", "constructibles", 4);
    field!(table, "modifiers", "Modifiers", "modifiers", 4);
    field!(table, "imports", "Imports", "imports", 5);
    table
});

pub fn wizard_fields() -> &'static FieldTable {
    &FIELDS
}

pub fn field(name: &str) -> Option<&'static FieldBinding> {
    FIELDS.get(name)
}

pub fn fields_for_step(step: u8) -> impl Iterator<Item = (&'static str, &'static FieldBinding)> {
    FIELDS
        .iter()
        .filter(move |(_, binding)| binding.step == step)
        .map(|(name, binding)| (*name, binding))
}

/// Top-level sections the wizard edits, in table order.
pub fn wizard_sections() -> Vec<&'static str> {
    let mut sections: Vec<&'static str> = Vec::new();
    for binding in FIELDS.values() {
        if let Some(Segment::Key(key)) = binding.path.segments().first()
            && !sections.contains(&key.as_str())
        {
            sections.push(key.as_str());
        }
    }
    sections
}

/// Copies each wizard section present in `source` into `target` whole, so
/// that replacing a section on merge never loses keys the table does not
/// map.
pub fn seed_sections(source: &Document, target: &mut Document) -> Result<usize, DocumentError> {
    let mut copied = 0;
    for section in wizard_sections() {
        if let Some(value) = source.root().get(section) {
            target.set(section, value.clone())?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Messages for every required field that is still empty.
pub fn missing_requirements(document: &Document) -> Vec<String> {
    FIELDS
        .values()
        .filter_map(|binding| {
            let message = binding.required?;
            (!binding.is_filled(document)).then(|| message.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_step_has_fields() {
        for step in 1..=5 {
            assert!(fields_for_step(step).next().is_some(), "step {step}");
        }
    }

    #[test]
    fn blank_values_are_not_filled() {
        assert!(!is_filled(&json!("   ")));
        assert!(!is_filled(&json!([])));
        assert!(!is_filled(&Value::Null));
        assert!(is_filled(&json!(0)));
        assert!(is_filled(&json!(["TRAIT_A"])));
    }

    #[test]
    fn reports_all_missing_requirements_in_table_order() {
        let document = Document::default();
        let missing = missing_requirements(&document);
        assert_eq!(missing.len(), 7);
        assert_eq!(missing[0], "Mod ID is required");
        assert_eq!(missing[6], "At least one civilization trait is required");
    }

    #[test]
    fn seed_copies_whole_wizard_sections_only() {
        let mut source = Document::default();
        source.set("metadata.id", json!("m")).unwrap();
        source.set("metadata.version", json!("1.2")).unwrap();
        source.set("units.0.id", json!("u1")).unwrap();
        source.set("constants.speed", json!(2)).unwrap();
        let mut target = Document::default();
        assert_eq!(seed_sections(&source, &mut target).unwrap(), 2);
        assert_eq!(
            target.to_value(),
            json!({"metadata": {"id": "m", "version": "1.2"}, "units": [{"id": "u1"}]})
        );
    }

    #[test]
    fn sections_follow_table_order() {
        assert_eq!(
            wizard_sections(),
            [
                "metadata",
                "action_group",
                "civilization",
                "units",
                "constructibles",
                "modifiers",
                "imports"
            ]
        );
    }
}
