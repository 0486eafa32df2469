//! Shared snapshot of the UI state, published for peers to fetch.
//!
//! The transports' server side answers requests from whatever snapshot is
//! currently stored here, never by calling into the UI.  The publish loop
//! replaces the snapshot on its cadence, so peers observe a value at most
//! one period old.

use std::sync::{Arc, Mutex, PoisonError};

use curvesync_core::{CurveDescriptor, ShareSnapshot};

/// Thread-safe holder of the latest [`ShareSnapshot`].
///
/// Reads and writes copy the whole snapshot; holders never retain the lock
/// across I/O.  A poisoned lock is recovered rather than propagated, because
/// a snapshot is valid at every point in time (writers replace it wholesale).
#[derive(Clone, Default)]
pub struct StateStore {
    inner: Arc<Mutex<ShareSnapshot>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored snapshot.
    pub fn publish(&self, snapshot: ShareSnapshot) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = snapshot;
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> ShareSnapshot {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Merges `incoming` names into `local`, keeping `local` entries untouched
/// and appending only names not already present.  Order of survivors is
/// locals first, then new arrivals in their incoming order.
pub fn union_names(local: &[String], incoming: Vec<String>) -> Vec<String> {
    let mut merged = local.to_vec();
    for name in incoming {
        if !merged.contains(&name) {
            merged.push(name);
        }
    }
    merged
}

/// Merges `incoming` curves into `local` by name.  On a name collision the
/// local curve wins; remote data never overwrites local data.
pub fn union_curves(
    local: &[CurveDescriptor],
    incoming: Vec<CurveDescriptor>,
) -> Vec<CurveDescriptor> {
    let mut merged = local.to_vec();
    for curve in incoming {
        if !merged.iter().any(|c| c.name == curve.name) {
            merged.push(curve);
        }
    }
    merged
}

// ── Tests ─────────────────────────────────────────────────────────────────────
