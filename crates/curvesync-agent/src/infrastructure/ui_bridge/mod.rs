//! Marshals UI-state access onto the single thread that owns it.
//!
//! GUI toolkits require that their widget state be touched only from the
//! thread that created it.  The sync machinery runs on Tokio worker threads,
//! so it never touches the host directly.  Instead every read or merge is
//! sent as a [`UiRequest`] over a channel to one dedicated thread which owns
//! the [`UiHost`] and applies requests sequentially in arrival order.
//!
//! [`UiBridge`] is the cheap, cloneable handle the rest of the agent holds.
//! Reads (`selected_curve_names`, `all_curves`) await a oneshot reply;
//! merges are fire-and-forget.  If the UI thread has exited, every call
//! fails with [`UiGone`] rather than panicking, so a sync tick in flight
//! during shutdown degrades to a skipped tick.

use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use curvesync_core::CurveDescriptor;

/// The UI thread has exited and its request channel is closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("UI host is no longer running")]
pub struct UiGone;

/// The surface the sync machinery needs from the hosting application.
///
/// Implemented by whatever owns the plotted curves and the user's selection.
/// All methods take `&mut self`; the owning thread serialises access, so no
/// internal locking is needed.
#[cfg_attr(test, mockall::automock)]
pub trait UiHost {
    /// Names of the curves the user currently has selected.
    fn selected_curve_names(&mut self) -> Vec<String>;

    /// Full descriptors for every curve the host currently holds.
    fn all_curves(&mut self) -> Vec<CurveDescriptor>;

    /// Incorporates curve names discovered from a peer.  Names already
    /// present locally must be left untouched.
    fn merge_discovered_names(&mut self, names: Vec<String>);

    /// Incorporates full curve descriptors discovered from a peer.  Curves
    /// whose name is already present locally must be left untouched.
    fn merge_discovered_curves(&mut self, curves: Vec<CurveDescriptor>);
}

/// One marshalled operation against the UI host.
enum UiRequest {
    SelectedNames(oneshot::Sender<Vec<String>>),
    AllCurves(oneshot::Sender<Vec<CurveDescriptor>>),
    MergeNames(Vec<String>),
    MergeCurves(Vec<CurveDescriptor>),
}

/// Cloneable handle for submitting [`UiRequest`]s to the UI thread.
#[derive(Clone)]
pub struct UiBridge {
    tx: mpsc::UnboundedSender<UiRequest>,
}

impl UiBridge {
    /// Fetches the current selection from the UI thread.
    ///
    /// # Errors
    ///
    /// Returns [`UiGone`] if the UI thread has exited.
    pub async fn selected_curve_names(&self) -> Result<Vec<String>, UiGone> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(UiRequest::SelectedNames(reply_tx))
            .map_err(|_| UiGone)?;
        reply_rx.await.map_err(|_| UiGone)
    }

    /// Fetches every curve descriptor from the UI thread.
    ///
    /// # Errors
    ///
    /// Returns [`UiGone`] if the UI thread has exited.
    pub async fn all_curves(&self) -> Result<Vec<CurveDescriptor>, UiGone> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(UiRequest::AllCurves(reply_tx))
            .map_err(|_| UiGone)?;
        reply_rx.await.map_err(|_| UiGone)
    }

    /// Queues discovered names for merging.  Fire-and-forget; a closed
    /// channel is reported but not fatal.
    pub fn merge_discovered_names(&self, names: Vec<String>) -> Result<(), UiGone> {
        self.tx.send(UiRequest::MergeNames(names)).map_err(|_| UiGone)
    }

    /// Queues discovered curves for merging.  Fire-and-forget; a closed
    /// channel is reported but not fatal.
    pub fn merge_discovered_curves(&self, curves: Vec<CurveDescriptor>) -> Result<(), UiGone> {
        self.tx
            .send(UiRequest::MergeCurves(curves))
            .map_err(|_| UiGone)
    }

    /// A bridge whose UI thread is already gone.  Every call returns
    /// [`UiGone`]; used to exercise degraded-mode paths.
    #[cfg(test)]
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }
}

/// Starts the dedicated UI thread owning `host` and returns the bridge plus
/// the thread's join handle.
///
/// The thread drains requests in arrival order until every [`UiBridge`]
/// clone has been dropped, then returns the host so callers can inspect its
/// final state.
pub fn spawn_ui_thread<H: UiHost + Send + 'static>(mut host: H) -> (UiBridge, JoinHandle<H>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<UiRequest>();

    let handle = std::thread::Builder::new()
        .name("curvesync-ui".to_string())
        .spawn(move || {
            while let Some(request) = rx.blocking_recv() {
                match request {
                    UiRequest::SelectedNames(reply) => {
                        // A dropped receiver means the caller gave up; the
                        // host state is unaffected either way.
                        let _ = reply.send(host.selected_curve_names());
                    }
                    UiRequest::AllCurves(reply) => {
                        let _ = reply.send(host.all_curves());
                    }
                    UiRequest::MergeNames(names) => host.merge_discovered_names(names),
                    UiRequest::MergeCurves(curves) => host.merge_discovered_curves(curves),
                }
            }
            debug!("UI request channel closed, UI thread exiting");
            host
        })
        // Spawn fails only on resource exhaustion.
        .unwrap_or_else(|e| panic!("failed to spawn UI thread: {e}"));

    (UiBridge { tx }, handle)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
