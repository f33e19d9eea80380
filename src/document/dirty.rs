use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "unsaved changes" flag.
///
/// Cloning hands out another handle to the same flag, so the main and
/// staging documents of one session report into a single tracker.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    flag: Arc<AtomicBool>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn mark_clean(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
