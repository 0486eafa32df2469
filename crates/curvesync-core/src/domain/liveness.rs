//! Liveness predicate for timestamped peer records.
//!
//! A peer record (heartbeat file mtime, or the moment a probe connection
//! completed) is trusted only while its age is strictly inside the window.
//! The predicate is pure: callers supply both timestamps, so the rule can be
//! tested without clocks or I/O and is re-evaluated at every read, never
//! cached across polls.

use std::time::{Duration, SystemTime};

/// Default maximum age for a peer to count as currently running.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(2);

/// Decides whether a last-seen timestamp is recent enough to trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessPolicy {
    window: Duration,
}

impl LivenessPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// `true` while `now - last_seen < window` (strict).
    ///
    /// A `last_seen` in the future (clock skew, just-written file) counts as
    /// live rather than producing an error.
    pub fn is_live(&self, last_seen: SystemTime, now: SystemTime) -> bool {
        match now.duration_since(last_seen) {
            Ok(age) => age < self.window,
            Err(_) => true,
        }
    }
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_WINDOW)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
