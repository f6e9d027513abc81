use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Requests a running scan session to stop at its next cycle.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clears a request left over from an earlier session.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}
