//! Run control flags shared between the GUI thread and the worker.

use std::sync::atomic::{AtomicBool, Ordering};

/// Stop and pause flags for a run.
///
/// Stop is honored only at safe points in the state machine (between
/// monitoring reads), never mid-purchase, so a stop request can never leave
/// a half-finished click sequence behind.
#[derive(Debug, Default)]
pub struct RunControl {
    running: AtomicBool,
    paused: AtomicBool,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a run as active and clears any stale pause.
    pub fn arm(&self) {
        self.running.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
