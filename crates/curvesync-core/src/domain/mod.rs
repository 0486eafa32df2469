//! Pure domain entities: curves, snapshots, peers, identity, liveness.
//!
//! Nothing in this module performs I/O; timestamps are passed in by callers
//! so every rule here is deterministic and unit-testable.

pub mod curve;
pub mod identity;
pub mod liveness;
pub mod peer;
pub mod snapshot;
