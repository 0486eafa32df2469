//! Periodic republication of the UI state.
//!
//! Each tick copies the host's selection and curves through the UI bridge
//! into the [`StateStore`] and then asks the transport to publish.  The tick
//! is best-effort end to end: a torn-down UI or a failed publish is logged
//! and the loop simply tries again next period.  Peers therefore observe a
//! snapshot at most one period stale while the instance is healthy.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use curvesync_core::ShareSnapshot;

use crate::application::state_store::StateStore;
use crate::infrastructure::transport::PeerTransport;
use crate::infrastructure::ui_bridge::UiBridge;

/// Handle to the running publish task.
pub struct PublishLoop {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PublishLoop {
    /// Starts the periodic task.  The first tick fires immediately so peers
    /// see a fresh snapshot as soon as the instance comes up.
    pub fn spawn(
        period: Duration,
        bridge: UiBridge,
        store: StateStore,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // A delayed tick must not cause a burst of catch-up publishes.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        let _ = changed;
                        break;
                    }
                    _ = ticker.tick() => {
                        run_tick(&bridge, &store, transport.as_ref()).await;
                    }
                }
            }
            debug!("publish loop exited");
        });
        Self { stop_tx, task }
    }

    /// Stops the task and waits for the in-progress tick, if any.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                warn!(error = %e, "publish loop ended abnormally");
            }
        }
    }
}

/// One publish pass: UI → store → transport.
async fn run_tick(bridge: &UiBridge, store: &StateStore, transport: &dyn PeerTransport) {
    let Ok(selected) = bridge.selected_curve_names().await else {
        debug!("UI gone, skipping publish tick");
        return;
    };
    let Ok(curves) = bridge.all_curves().await else {
        debug!("UI gone, skipping publish tick");
        return;
    };

    store.publish(ShareSnapshot { selected, curves });
    if let Err(e) = transport.publish().await {
        warn!(error = %e, "publish failed, retrying next tick");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::MockPeerTransport;
    use crate::infrastructure::ui_bridge::{spawn_ui_thread, UiHost};
    use curvesync_core::CurveDescriptor;

    struct FixedHost;

    impl UiHost for FixedHost {
        fn selected_curve_names(&mut self) -> Vec<String> {
            vec!["sine".to_string()]
        }
        fn all_curves(&mut self) -> Vec<CurveDescriptor> {
            vec![CurveDescriptor::new("sine")]
        }
        fn merge_discovered_names(&mut self, _names: Vec<String>) {}
        fn merge_discovered_curves(&mut self, _curves: Vec<CurveDescriptor>) {}
    }

    #[tokio::test]
    async fn test_tick_copies_ui_state_into_store_and_publishes() {
        // Arrange
        let (bridge, handle) = spawn_ui_thread(FixedHost);
        let store = StateStore::new();
        let mut mock = MockPeerTransport::new();
        mock.expect_publish().times(1..).returning(|| Ok(()));

        // Act
        let publish_loop = PublishLoop::spawn(
            Duration::from_millis(10),
            bridge.clone(),
            store.clone(),
            Arc::new(mock),
        );
        tokio::time::sleep(Duration::from_millis(60)).await;
        publish_loop.stop().await;

        // Assert
        let snapshot = store.snapshot();
        assert_eq!(snapshot.selected, vec!["sine".to_string()]);
        assert_eq!(snapshot.curves.len(), 1);
        drop(bridge);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_tick_with_gone_ui_leaves_store_untouched() {
        // Arrange
        let bridge = UiBridge::disconnected();
        let store = StateStore::new();
        let mut mock = MockPeerTransport::new();
        mock.expect_publish().times(0);

        // Act
        let publish_loop = PublishLoop::spawn(
            Duration::from_millis(10),
            bridge,
            store.clone(),
            Arc::new(mock),
        );
        tokio::time::sleep(Duration::from_millis(40)).await;
        publish_loop.stop().await;

        // Assert
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_kill_the_loop() {
        // Arrange: every publish fails; ticks must keep coming regardless.
        let (bridge, handle) = spawn_ui_thread(FixedHost);
        let store = StateStore::new();
        let mut mock = MockPeerTransport::new();
        mock.expect_publish().times(2..).returning(|| {
            Err(crate::infrastructure::transport::TransportError::Publish(
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ))
        });

        // Act
        let publish_loop = PublishLoop::spawn(
            Duration::from_millis(10),
            bridge.clone(),
            store.clone(),
            Arc::new(mock),
        );
        tokio::time::sleep(Duration::from_millis(80)).await;
        publish_loop.stop().await;

        // Assert: the store still received the snapshot each tick.
        assert_eq!(store.snapshot().selected, vec!["sine".to_string()]);
        drop(bridge);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_stop_completes_promptly_with_long_period() {
        // Arrange
        let (bridge, handle) = spawn_ui_thread(FixedHost);
        let mut mock = MockPeerTransport::new();
        mock.expect_publish().returning(|| Ok(()));
        let publish_loop = PublishLoop::spawn(
            Duration::from_secs(3600),
            bridge.clone(),
            StateStore::new(),
            Arc::new(mock),
        );

        // Act / Assert: stop returns well before the next scheduled tick.
        tokio::time::timeout(Duration::from_secs(1), publish_loop.stop())
            .await
            .expect("stop timed out");
        drop(bridge);
        handle.join().unwrap();
    }
}
