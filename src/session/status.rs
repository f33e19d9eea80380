#[derive(Debug, Clone)]
pub struct StatusLine {
    message: String,
}

pub const READY_STATUS: &str = "Ready. Start the wizard or edit fields directly.";

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            message: READY_STATUS.to_string(),
        }
    }
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_raw(&mut self, msg: impl Into<String>) {
        self.message = msg.into();
    }

    pub fn ready(&mut self) {
        self.message = READY_STATUS.to_string();
    }

    pub fn value_updated(&mut self, path: &str) {
        self.message = format!("Updated {path}");
    }

    pub fn entry_added(&mut self, path: &str, index: usize) {
        self.message = format!("Added entry #{} to {path}", index + 1);
    }

    pub fn entry_removed(&mut self, path: &str, remaining: usize) {
        self.message = if remaining == 0 {
            format!("Removed entry • {path} is now empty")
        } else {
            format!("Removed entry • {remaining} left in {path}")
        };
    }

    pub fn entry_moved(&mut self, path: &str, index: usize) {
        self.message = format!("Moved entry to #{} in {path}", index + 1);
    }

    pub fn wizard_step(&mut self, step: u8, total: u8) {
        self.message = format!("Wizard step {step} of {total}");
    }

    pub fn issues_remaining(&mut self, count: usize) {
        self.message = format!("{count} issue(s) remaining");
    }

    pub fn merged(&mut self, changed: bool) {
        self.message = if changed {
            "Wizard changes merged".to_string()
        } else {
            "Wizard changes already up to date".to_string()
        };
    }

    pub fn pending_discard(&mut self) {
        self.message = "Unsaved changes discarded.".to_string();
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
