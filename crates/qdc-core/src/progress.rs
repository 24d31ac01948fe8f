//! Progress reporting and cancellation hooks.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Stage of a conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Walking the input folder.
    Scanning,
    /// Reading tile headers for the dataset extent.
    ResolvingBounds,
    /// Decoding tiles into the grid.
    Assembling,
    /// Writing output rows.
    Writing,
}

impl Phase {
    /// Stable name of the phase.
    pub const fn name(&self) -> &'static str {
        match self {
            Phase::Scanning => "scanning",
            Phase::ResolvingBounds => "resolving bounds",
            Phase::Assembling => "calculating depth map",
            Phase::Writing => "writing output",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Callback receiving `(phase, current, total)` progress updates.
pub type ProgressCallback = Box<dyn Fn(Phase, usize, usize) + Send + Sync>;

pub(crate) fn report(progress: Option<&ProgressCallback>, phase: Phase, current: usize, total: usize) {
    if let Some(cb) = progress {
        cb(phase, current, total);
    }
}

/// Shared abort flag, set from outside the run (e.g. a Ctrl-C handler).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_report_invokes_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressCallback = Box::new(move |phase, cur, total| {
            sink.lock().unwrap().push((phase, cur, total));
        });
        report(Some(&cb), Phase::Assembling, 1, 4);
        report(None, Phase::Writing, 2, 4);
        assert_eq!(*seen.lock().unwrap(), vec![(Phase::Assembling, 1, 4)]);
        assert_eq!(Phase::Writing.to_string(), "writing output");
    }
}
