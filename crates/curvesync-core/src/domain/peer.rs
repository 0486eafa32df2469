//! Ephemeral records describing discovered sibling instances.
//!
//! A [`PeerRecord`] lives for exactly one discovery cycle; the next call to
//! `find_peers` rebuilds the set from scratch, so stale records can never be
//! carried across polls.

use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::SystemTime;

/// Where a discovered peer can be reached, depending on the transport that
/// found it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeerEndpoint {
    /// Loopback TCP address of the peer's rendezvous server.
    Tcp(SocketAddr),
    /// Path to the peer's heartbeat descriptor file.
    Heartbeat(PathBuf),
}

impl Display for PeerEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PeerEndpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            PeerEndpoint::Heartbeat(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// One currently-reachable sibling instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerRecord {
    pub endpoint: PeerEndpoint,
    /// When the peer was last observed alive: probe completion time for the
    /// socket transport, file modification time for the heartbeat transport.
    pub last_seen: SystemTime,
}

impl PeerRecord {
    pub fn new(endpoint: PeerEndpoint, last_seen: SystemTime) -> Self {
        Self { endpoint, last_seen }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
