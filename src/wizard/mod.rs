mod fields;

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::document::Document;

pub use fields::{
    FieldBinding, FieldTable, field, fields_for_step, is_filled, missing_requirements,
    seed_sections, wizard_fields, wizard_sections,
};

pub const FIRST_STEP: u8 = 1;
pub const FINAL_STEP: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Step(u8),
    /// Terminal: staging has been folded into main.
    Merged,
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardState::Step(step) => write!(f, "step {step}/{FINAL_STEP}"),
            WizardState::Merged => write!(f, "merged"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("cannot {action} from {from}")]
    InvalidTransition {
        from: WizardState,
        action: &'static str,
    },

    #[error("wizard is incomplete: {}", .0.join("; "))]
    Incomplete(Vec<String>),
}

/// Linear five-step flow; only `finish` on the last step leaves it.
#[derive(Debug, Clone)]
pub struct WizardStepMachine {
    state: WizardState,
}

impl Default for WizardStepMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardStepMachine {
    pub fn new() -> Self {
        Self {
            state: WizardState::Step(FIRST_STEP),
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn current_step(&self) -> Option<u8> {
        match self.state {
            WizardState::Step(step) => Some(step),
            WizardState::Merged => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = WizardState::Step(FIRST_STEP);
    }

    pub fn next(&mut self) -> Result<WizardState, WizardError> {
        match self.state {
            WizardState::Step(step) if step < FINAL_STEP => {
                self.state = WizardState::Step(step + 1);
                Ok(self.state)
            }
            from => Err(WizardError::InvalidTransition {
                from,
                action: "advance",
            }),
        }
    }

    pub fn prev(&mut self) -> Result<WizardState, WizardError> {
        match self.state {
            WizardState::Step(step) if step > FIRST_STEP => {
                self.state = WizardState::Step(step - 1);
                Ok(self.state)
            }
            from => Err(WizardError::InvalidTransition {
                from,
                action: "go back",
            }),
        }
    }

    /// Moves to [`WizardState::Merged`] when every required field is filled
    /// in `staging`. On failure the machine stays on the final step.
    pub fn finish(&mut self, staging: &Document) -> Result<(), WizardError> {
        if self.state != WizardState::Step(FINAL_STEP) {
            return Err(WizardError::InvalidTransition {
                from: self.state,
                action: "finish",
            });
        }
        let missing = missing_requirements(staging);
        if !missing.is_empty() {
            return Err(WizardError::Incomplete(missing));
        }
        self.state = WizardState::Merged;
        Ok(())
    }

    /// Current values of a step's fields, read straight from `staging`.
    pub fn step_view(staging: &Document, step: u8) -> IndexMap<&'static str, Option<Value>> {
        fields_for_step(step)
            .map(|(name, binding)| (name, binding.read(staging).cloned()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_staging() -> Document {
        let mut staging = Document::default();
        for (path, value) in [
            ("metadata.name", json!("Rome Mod")),
            ("metadata.package", json!("rome")),
            ("action_group.age", json!("AGE_ANTIQUITY")),
            ("civilization.civilization_type", json!("CIVILIZATION_ROME")),
            ("civilization.name", json!("Rome")),
            ("civilization.traits.0", json!("TRAIT_ROME")),
        ] {
            staging.set(path, value).unwrap();
        }
        staging
    }

    #[test]
    fn walks_forward_and_back_linearly() {
        let mut machine = WizardStepMachine::new();
        assert!(matches!(
            machine.prev(),
            Err(WizardError::InvalidTransition { .. })
        ));
        for expected in 2..=5 {
            assert_eq!(machine.next().unwrap(), WizardState::Step(expected));
        }
        assert!(machine.next().is_err());
        assert_eq!(machine.prev().unwrap(), WizardState::Step(4));
    }

    #[test]
    fn finish_only_from_final_step() {
        let mut machine = WizardStepMachine::new();
        let staging = complete_staging();
        assert!(matches!(
            machine.finish(&staging),
            Err(WizardError::InvalidTransition { action: "finish", .. })
        ));
    }

    #[test]
    fn finish_blocks_until_mod_id_is_set() {
        let mut machine = WizardStepMachine::new();
        for _ in 0..4 {
            machine.next().unwrap();
        }
        let mut staging = complete_staging();
        match machine.finish(&staging) {
            Err(WizardError::Incomplete(missing)) => {
                assert_eq!(missing, vec!["Mod ID is required".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(machine.state(), WizardState::Step(FINAL_STEP));

        staging.set("metadata.id", json!("rome-mod")).unwrap();
        machine.finish(&staging).unwrap();
        assert_eq!(machine.state(), WizardState::Merged);
        assert!(machine.next().is_err());
        assert!(machine.prev().is_err());
    }

    #[test]
    fn step_view_reads_live_values() {
        let mut staging = complete_staging();
        let view = WizardStepMachine::step_view(&staging, 2);
        assert_eq!(view["civilization_name"], Some(json!("Rome")));
        assert_eq!(view["capital_names"], None);

        staging.set("civilization.name", json!("Roma")).unwrap();
        let view = WizardStepMachine::step_view(&staging, 2);
        assert_eq!(view["civilization_name"], Some(json!("Roma")));
    }
}
