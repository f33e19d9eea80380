//! Editing session: the canonical main document, the wizard's staging
//! document, and the rules that move data between them.

mod status;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::document::{CrossRefs, DirtyTracker, Document, DocumentError, MutationMode};
use crate::domain::IntoFieldPath;
use crate::merge::{MergeConfig, MergeEngine, MergeReport};
use crate::wizard::{FINAL_STEP, WizardError, WizardState, WizardStepMachine, seed_sections};

pub use status::{READY_STATUS, StatusLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    /// Edits go straight to the main document.
    Expert,
    /// Edits go to the staging document until the wizard is finished.
    Wizard,
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub mutation_mode: MutationMode,
    pub merge: MergeConfig,
    pub cross_refs: CrossRefs,
}

impl SessionOptions {
    pub fn with_mutation_mode(mut self, mode: MutationMode) -> Self {
        self.mutation_mode = mode;
        self
    }

    pub fn with_merge_config(mut self, merge: MergeConfig) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_cross_refs(mut self, cross_refs: CrossRefs) -> Self {
        self.cross_refs = cross_refs;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Wizard(#[from] WizardError),
}

#[derive(Debug)]
pub struct EditorSession {
    main: Document,
    staging: Document,
    tracker: DirtyTracker,
    mode: EditorMode,
    wizard: WizardStepMachine,
    merge: MergeEngine,
    /// Owned bindings staging held when it was last seeded.
    seeded_bindings: Vec<String>,
    status: StatusLine,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl EditorSession {
    pub fn new(options: SessionOptions) -> Self {
        let tracker = DirtyTracker::new();
        let document = || {
            Document::new(tracker.clone())
                .with_mode(options.mutation_mode)
                .with_cross_refs(options.cross_refs.clone())
        };
        Self {
            main: document(),
            staging: document(),
            tracker: tracker.clone(),
            mode: EditorMode::Expert,
            wizard: WizardStepMachine::new(),
            merge: MergeEngine::new(options.merge.clone()),
            seeded_bindings: Vec::new(),
            status: StatusLine::new(),
        }
    }

    pub fn main(&self) -> &Document {
        &self.main
    }

    pub fn staging(&self) -> &Document {
        &self.staging
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn wizard_state(&self) -> WizardState {
        self.wizard.state()
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty()
    }

    /// Call once the main document has been handed to a serializer.
    pub fn mark_saved(&mut self) {
        self.tracker.mark_clean();
        self.status.set_raw("Saved");
    }

    /// Replaces the main document wholesale, e.g. after reading a file.
    pub fn load(&mut self, document: Map<String, Value>) {
        self.main.replace_root(document);
        self.staging.clear();
        self.seeded_bindings.clear();
        self.wizard.reset();
        self.mode = EditorMode::Expert;
        self.tracker.mark_clean();
        self.status.ready();
        info!(sections = self.main.root().len(), "document loaded");
    }

    /// Discards both documents and starts from an empty mod.
    pub fn new_mod(&mut self) {
        let discarded = self.tracker.is_dirty();
        self.main.clear();
        self.staging.clear();
        self.seeded_bindings.clear();
        self.wizard.reset();
        self.mode = EditorMode::Expert;
        self.tracker.mark_clean();
        if discarded {
            self.status.pending_discard();
        } else {
            self.status.ready();
        }
    }

    /// Resets staging from main and opens the wizard at its first step.
    pub fn start_wizard(&mut self) -> Result<(), SessionError> {
        self.reseed_staging()?;
        self.wizard.reset();
        self.mode = EditorMode::Wizard;
        self.status.wizard_step(1, FINAL_STEP);
        Ok(())
    }

    /// Returns to the wizard, re-syncing staging with any expert edits.
    pub fn switch_to_wizard(&mut self) -> Result<(), SessionError> {
        if self.mode == EditorMode::Wizard {
            return Ok(());
        }
        self.reseed_staging()?;
        if self.wizard.state() == WizardState::Merged {
            self.wizard.reset();
        }
        self.mode = EditorMode::Wizard;
        if let Some(step) = self.wizard.current_step() {
            self.status.wizard_step(step, FINAL_STEP);
        }
        Ok(())
    }

    /// Leaves the wizard, folding staging into main.
    pub fn switch_to_expert(&mut self) -> MergeReport {
        if self.mode == EditorMode::Expert {
            return MergeReport::default();
        }
        let report = self.run_merge();
        self.mode = EditorMode::Expert;
        report
    }

    pub fn next_step(&mut self) -> Result<WizardState, SessionError> {
        self.require_wizard("advance")?;
        let state = self.wizard.next()?;
        self.report_step();
        Ok(state)
    }

    pub fn prev_step(&mut self) -> Result<WizardState, SessionError> {
        self.require_wizard("go back")?;
        let state = self.wizard.prev()?;
        self.report_step();
        Ok(state)
    }

    /// Validates staging, merges it into main and switches to expert mode.
    pub fn finish_wizard(&mut self) -> Result<MergeReport, SessionError> {
        self.require_wizard("finish")?;
        if let Err(err) = self.wizard.finish(&self.staging) {
            if let WizardError::Incomplete(missing) = &err {
                self.status.issues_remaining(missing.len());
            }
            return Err(err.into());
        }
        let report = self.run_merge();
        self.mode = EditorMode::Expert;
        Ok(report)
    }

    /// Field values of the current wizard step, read live from staging.
    pub fn step_view(&self) -> IndexMap<&'static str, Option<Value>> {
        match self.wizard.current_step() {
            Some(step) => WizardStepMachine::step_view(&self.staging, step),
            None => IndexMap::new(),
        }
    }

    /// The document edits are routed to in the current mode.
    pub fn active(&self) -> &Document {
        match self.mode {
            EditorMode::Expert => &self.main,
            EditorMode::Wizard => &self.staging,
        }
    }

    pub fn active_mut(&mut self) -> &mut Document {
        match self.mode {
            EditorMode::Expert => &mut self.main,
            EditorMode::Wizard => &mut self.staging,
        }
    }

    pub fn get(&self, path: impl IntoFieldPath) -> Result<Option<&Value>, SessionError> {
        Ok(self.active().get(path)?)
    }

    pub fn set(&mut self, path: impl IntoFieldPath, value: Value) -> Result<(), SessionError> {
        let path = path.into_field_path()?;
        self.active_mut().set(&path, value)?;
        self.status.value_updated(&path.to_string());
        Ok(())
    }

    pub fn unset(&mut self, path: impl IntoFieldPath) -> Result<Option<Value>, SessionError> {
        let path = path.into_field_path()?;
        let removed = self.active_mut().remove(&path)?;
        if removed.is_some() {
            self.status.value_updated(&path.to_string());
        }
        Ok(removed)
    }

    pub fn append(&mut self, list: impl IntoFieldPath, item: Value) -> Result<usize, SessionError> {
        let list = list.into_field_path()?;
        let index = self.active_mut().append(&list, item)?;
        self.status.entry_added(&list.to_string(), index);
        Ok(index)
    }

    pub fn remove_at(
        &mut self,
        list: impl IntoFieldPath,
        index: usize,
    ) -> Result<Value, SessionError> {
        let list = list.into_field_path()?;
        let removed = self.active_mut().remove_at(&list, index)?;
        let remaining = self.active().list_len(&list)?;
        self.status.entry_removed(&list.to_string(), remaining);
        Ok(removed)
    }

    pub fn move_up(&mut self, list: impl IntoFieldPath, index: usize) -> Result<(), SessionError> {
        let list = list.into_field_path()?;
        self.active_mut().move_up(&list, index)?;
        self.status.entry_moved(&list.to_string(), index - 1);
        Ok(())
    }

    pub fn move_down(&mut self, list: impl IntoFieldPath, index: usize) -> Result<(), SessionError> {
        let list = list.into_field_path()?;
        self.active_mut().move_down(&list, index)?;
        self.status.entry_moved(&list.to_string(), index + 1);
        Ok(())
    }

    fn run_merge(&mut self) -> MergeReport {
        let report = self
            .merge
            .merge_seeded(&self.staging, &mut self.main, &self.seeded_bindings);
        debug!(
            fields = report.fields.len(),
            changed = report.changed,
            "staging merged into main"
        );
        self.status.merged(report.changed);
        report
    }

    /// Rebuilds staging from main. Seeding is bookkeeping, not an edit, so
    /// the dirty flag keeps whatever state it had.
    fn reseed_staging(&mut self) -> Result<(), SessionError> {
        let was_dirty = self.tracker.is_dirty();
        self.staging.clear();
        let seeded = seed_sections(&self.main, &mut self.staging)?;
        self.seeded_bindings = self.merge.owned_bindings(&self.staging);
        if !was_dirty {
            self.tracker.mark_clean();
        }
        debug!(sections = seeded, "staging seeded from main");
        Ok(())
    }

    fn require_wizard(&self, action: &'static str) -> Result<(), WizardError> {
        if self.mode == EditorMode::Wizard {
            Ok(())
        } else {
            Err(WizardError::InvalidTransition {
                from: self.wizard.state(),
                action,
            })
        }
    }

    fn report_step(&mut self) {
        if let Some(step) = self.wizard.current_step() {
            self.status.wizard_step(step, FINAL_STEP);
        }
    }
}
