//! Rendezvous transports: how instances find each other and exchange state.
//!
//! Two interchangeable strategies sit behind [`PeerTransport`]:
//!
//! - [`socket`] – each instance serves a loopback TCP port from a shared
//!   range; discovery is a timed connect scan across the range.
//! - [`heartbeat`] – each instance writes a descriptor file into a shared
//!   directory; discovery is a directory scan filtered by file age.
//!
//! Both express liveness the same way: a peer counts as running only while
//! its signal (open port, fresh file) is current.  Fetch failures are soft;
//! a peer that vanished between discovery and fetch simply yields `None`.

pub mod heartbeat;
pub mod socket;

use async_trait::async_trait;
use thiserror::Error;

use curvesync_core::{CurveDescriptor, PeerRecord};

use crate::application::state_store::StateStore;
use crate::infrastructure::storage::config::{AgentConfig, TransportKind};

/// Error type for transport lifecycle operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The serving side could not be brought up.
    #[error("failed to start transport: {0}")]
    Startup(#[source] std::io::Error),

    /// Publishing the local snapshot failed.
    #[error("failed to publish snapshot: {0}")]
    Publish(#[source] std::io::Error),

    /// Tearing the transport down failed.
    #[error("failed to shut transport down: {0}")]
    Shutdown(#[source] std::io::Error),
}

/// A peer rendezvous strategy.
///
/// `start` and `shutdown` bracket the serving side; `publish` refreshes what
/// peers see; `find_peers` and the two fetch methods are the consuming side.
/// Fetches return `None` when the peer did not answer usably, never an
/// error, so one dead peer cannot abort a sync pass over the others.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Brings up the serving side.  Implementations that can still consume
    /// without serving downgrade internal failures to a warning.
    async fn start(&self) -> Result<(), TransportError>;

    /// Discovers currently-live sibling instances, excluding this one.
    async fn find_peers(&self) -> Vec<PeerRecord>;

    /// Fetches the peer's selected curve names, or `None` if the peer did
    /// not answer.
    async fn fetch_names(&self, peer: &PeerRecord) -> Option<Vec<String>>;

    /// Fetches the peer's full curve descriptors, or `None` if the peer did
    /// not answer.
    async fn fetch_curves(&self, peer: &PeerRecord) -> Option<Vec<CurveDescriptor>>;

    /// Makes the latest local snapshot visible to peers.
    async fn publish(&self) -> Result<(), TransportError>;

    /// Tears the serving side down and withdraws this instance's presence
    /// signal.
    async fn shutdown(&self) -> Result<(), TransportError>;
}

/// Builds the transport selected by `config.agent.transport`.
///
/// # Errors
///
/// Returns [`TransportError::Startup`] when the heartbeat directory cannot
/// be resolved from the platform environment.
pub fn make_transport(
    config: &AgentConfig,
    store: StateStore,
) -> Result<Box<dyn PeerTransport>, TransportError> {
    match config.agent.transport {
        TransportKind::Socket => Ok(Box::new(socket::SocketTransport::new(
            config.socket.clone(),
            store,
        ))),
        TransportKind::Heartbeat => {
            let dir = config.heartbeat.resolved_dir().map_err(|e| {
                TransportError::Startup(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    e.to_string(),
                ))
            })?;
            Ok(Box::new(heartbeat::HeartbeatTransport::new(
                dir,
                config.heartbeat.liveness_window(),
                store,
            )))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_transport_builds_socket_by_default() {
        // Arrange
        let config = AgentConfig::default();
        let store = StateStore::new();

        // Act
        let result = make_transport(&config, store);

        // Assert
        assert!(result.is_ok());
    }

    #[test]
    fn test_make_transport_builds_heartbeat_with_explicit_dir() {
        // Arrange
        let mut config = AgentConfig::default();
        config.agent.transport = TransportKind::Heartbeat;
        config.heartbeat.dir = std::env::temp_dir()
            .join("curvesync-factory-test")
            .display()
            .to_string();
        let store = StateStore::new();

        // Act
        let result = make_transport(&config, store);

        // Assert
        assert!(result.is_ok());
    }
}
