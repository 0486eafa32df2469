//! Application layer: the publish/fetch orchestration around the transports.
//!
//! - [`state_store`] – the lock-guarded snapshot the server hands out, plus
//!   the union-by-name merge rules.
//! - [`publish_loop`] – the 500 ms cadence that copies UI state into the
//!   store and republishes it.
//! - [`sync_service`] – the per-instance lifecycle state machine tying
//!   transport, publish loop, and UI bridge together.

pub mod publish_loop;
pub mod state_store;
pub mod sync_service;
