//! # curvesync-core
//!
//! Shared library for CurveSync containing the domain entities exchanged
//! between plotting-application instances and the codecs that put them on
//! the wire: the line-oriented rendezvous protocol and the `x:y;...` point
//! text format.
//!
//! This crate is used by every transport the agent offers.  It has zero
//! dependencies on sockets, the filesystem, or UI frameworks, so all of its
//! logic is testable without I/O.
//!
//! - **`domain`** – curves, selection snapshots, peer records, the instance
//!   identity token, and the liveness predicate that decides whether a peer's
//!   last-seen timestamp still counts as "running".
//!
//! - **`protocol`** – the request/response tokens spoken between instances
//!   and the locale-invariant point serialization shared by both the socket
//!   and the heartbeat-file transports.

pub mod domain;
pub mod protocol;

pub use domain::curve::{CurveDescriptor, Point, DEFAULT_POWER, X_EPSILON};
pub use domain::identity::InstanceId;
pub use domain::liveness::{LivenessPolicy, DEFAULT_LIVENESS_WINDOW};
pub use domain::peer::{PeerEndpoint, PeerRecord};
pub use domain::snapshot::ShareSnapshot;
pub use protocol::points::{deserialize_points, serialize_points};
pub use protocol::wire::{Request, WireError};
