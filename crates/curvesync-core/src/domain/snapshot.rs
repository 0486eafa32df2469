//! The shareable state of one instance at one publish tick.

use serde::{Deserialize, Serialize};

use crate::domain::curve::CurveDescriptor;

/// Deep copy of everything an instance is willing to share with its peers.
///
/// Rebuilt from the host UI every publish cycle and never persisted; the
/// selection is only meaningful while the window that produced it is alive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareSnapshot {
    /// Names of the curves currently marked visible in the host UI.
    pub selected: Vec<String>,
    /// Full definitions of the instance's user-authored curves.
    pub curves: Vec<CurveDescriptor>,
}

impl ShareSnapshot {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.curves.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
