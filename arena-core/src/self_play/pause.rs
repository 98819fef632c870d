use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared flag asking the self-play loop to stop at the next match boundary.
///
/// Clones share the flag, so a handle can be moved to another task (a
/// signal handler, for example) while the loop runs.
#[derive(Clone, Debug, Default)]
pub struct PauseHandle(Arc<AtomicBool>);

impl PauseHandle {
    /// Creates a handle that is not paused.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a pause.
    pub fn pause(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Withdraws a pending request.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Returns `true` if a pause was requested and not yet taken.
    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consumes a pending request, returning whether there was one.
    pub(crate) fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}
