use std::fmt;

/// Top-level sections of a mod document, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Metadata,
    ModuleLocalization,
    ActionGroup,
    Civilization,
    Units,
    Constructibles,
    Modifiers,
    Traditions,
    ProgressionTreeNodes,
    ProgressionTrees,
    Constants,
    Imports,
    Build,
}

/// How a section's value is reconciled when staging merges into main.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Staging's value replaces main's wholesale when present.
    Replace,
    /// Record merged key by key; `bindings` is an identity-keyed list.
    FlatRecord,
    /// Replaced wholesale when staging holds a non-empty list.
    EntityList,
    /// Entries superseded by classification.
    ClassifiedList,
}

impl Section {
    pub const ALL: [Section; 13] = [
        Section::Metadata,
        Section::ModuleLocalization,
        Section::ActionGroup,
        Section::Civilization,
        Section::Units,
        Section::Constructibles,
        Section::Modifiers,
        Section::Traditions,
        Section::ProgressionTreeNodes,
        Section::ProgressionTrees,
        Section::Constants,
        Section::Imports,
        Section::Build,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Section::Metadata => "metadata",
            Section::ModuleLocalization => "module_localization",
            Section::ActionGroup => "action_group",
            Section::Civilization => "civilization",
            Section::Units => "units",
            Section::Constructibles => "constructibles",
            Section::Modifiers => "modifiers",
            Section::Traditions => "traditions",
            Section::ProgressionTreeNodes => "progression_tree_nodes",
            Section::ProgressionTrees => "progression_trees",
            Section::Constants => "constants",
            Section::Imports => "imports",
            Section::Build => "build",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Section::ALL.into_iter().find(|section| section.key() == key)
    }

    pub fn field_class(self) -> FieldClass {
        match self {
            Section::Civilization => FieldClass::FlatRecord,
            Section::Imports => FieldClass::ClassifiedList,
            Section::Units
            | Section::Constructibles
            | Section::Modifiers
            | Section::Traditions
            | Section::ProgressionTreeNodes
            | Section::ProgressionTrees => FieldClass::EntityList,
            Section::Metadata
            | Section::ModuleLocalization
            | Section::ActionGroup
            | Section::Constants
            | Section::Build => FieldClass::Replace,
        }
    }

    /// Class for any top-level key, known or not.
    pub fn class_of_key(key: &str) -> FieldClass {
        Section::from_key(key)
            .map(Section::field_class)
            .unwrap_or(FieldClass::Replace)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
