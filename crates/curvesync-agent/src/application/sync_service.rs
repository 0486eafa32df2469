//! Per-instance sync lifecycle and the peer fetch operations.
//!
//! [`SyncService`] ties one transport, one [`PublishLoop`], and one UI
//! bridge together behind a small state machine:
//!
//! ```text
//! Stopped → Starting → Running → Stopping → Stopped
//! ```
//!
//! `start` and `stop` drive the serving side; the `fetch_*_from_peers`
//! operations are the consuming side and work in any state, since peers can
//! be queried even while this instance serves nothing.  Stop is idempotent
//! and bounded: the publish loop ends first, then the transport withdraws
//! its presence signal, so peers never fetch from a half-dead instance.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use curvesync_core::CurveDescriptor;

use crate::application::publish_loop::PublishLoop;
use crate::application::state_store::{union_curves, union_names, StateStore};
use crate::infrastructure::transport::{PeerTransport, TransportError};
use crate::infrastructure::ui_bridge::UiBridge;

/// Where the service is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct Inner {
    state: LifecycleState,
    publish_loop: Option<PublishLoop>,
}

/// Orchestrates serving, publishing, and fetching for one instance.
pub struct SyncService {
    transport: Arc<dyn PeerTransport>,
    bridge: UiBridge,
    store: StateStore,
    publish_period: Duration,
    inner: Mutex<Inner>,
}

impl SyncService {
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        bridge: UiBridge,
        store: StateStore,
        publish_period: Duration,
    ) -> Self {
        Self {
            transport,
            bridge,
            store,
            publish_period,
            inner: Mutex::new(Inner {
                state: LifecycleState::Stopped,
                publish_loop: None,
            }),
        }
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.lock().await.state
    }

    /// Brings up the transport's serving side and the publish loop.
    ///
    /// # Errors
    ///
    /// Returns the transport's startup error; the service is back in
    /// `Stopped` when it does.
    pub async fn start(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().await;
        if inner.state != LifecycleState::Stopped {
            debug!(state = ?inner.state, "start ignored");
            return Ok(());
        }
        inner.state = LifecycleState::Starting;

        if let Err(e) = self.transport.start().await {
            inner.state = LifecycleState::Stopped;
            return Err(e);
        }

        inner.publish_loop = Some(PublishLoop::spawn(
            self.publish_period,
            self.bridge.clone(),
            self.store.clone(),
            Arc::clone(&self.transport),
        ));
        inner.state = LifecycleState::Running;
        info!("sync service running");
        Ok(())
    }

    /// Stops publishing, then withdraws this instance's presence signal.
    /// Safe to call in any state, any number of times.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if matches!(
            inner.state,
            LifecycleState::Stopped | LifecycleState::Stopping
        ) {
            return;
        }
        inner.state = LifecycleState::Stopping;

        if let Some(publish_loop) = inner.publish_loop.take() {
            publish_loop.stop().await;
        }
        if let Err(e) = self.transport.shutdown().await {
            warn!(error = %e, "transport shutdown failed");
        }
        inner.state = LifecycleState::Stopped;
        info!("sync service stopped");
    }

    /// Collects every live peer's selected curve names, unions them
    /// first-seen-wins, and hands the result to the UI for merging.
    pub async fn fetch_selected_from_peers(&self) -> Vec<String> {
        let peers = self.transport.find_peers().await;
        let mut merged: Vec<String> = Vec::new();
        for peer in &peers {
            if let Some(names) = self.transport.fetch_names(peer).await {
                merged = union_names(&merged, names);
            }
        }
        if !merged.is_empty() && self.bridge.merge_discovered_names(merged.clone()).is_err() {
            debug!("UI gone, discovered names dropped");
        }
        merged
    }

    /// Collects every live peer's curve definitions, unions them by name
    /// first-seen-wins, and hands the result to the UI for merging.
    pub async fn fetch_curves_from_peers(&self) -> Vec<CurveDescriptor> {
        let peers = self.transport.find_peers().await;
        let mut merged: Vec<CurveDescriptor> = Vec::new();
        for peer in &peers {
            if let Some(curves) = self.transport.fetch_curves(peer).await {
                merged = union_curves(&merged, curves);
            }
        }
        if !merged.is_empty() && self.bridge.merge_discovered_curves(merged.clone()).is_err() {
            debug!("UI gone, discovered curves dropped");
        }
        merged
    }

    /// Whether at least one sibling instance is currently reachable.
    pub async fn has_running_sibling(&self) -> bool {
        !self.transport.find_peers().await.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
