//! Loopback-TCP rendezvous: port-scan discovery plus a line-protocol server.
//!
//! Every instance derives one candidate port from its process id and serves
//! the shared request protocol there.  An open port in the candidate range
//! IS the liveness signal; there is no registration step and no broker.
//! Discovery walks the range with a short connect timeout, so the worst
//! case scan time is `port_range × connect_timeout` with zero peers.
//!
//! The serving side answers from the [`StateStore`] snapshot only.  It never
//! calls into the UI, so a slow or busy UI thread cannot stall a peer's
//! fetch.  Failing to bind (port collision with a non-sibling process)
//! downgrades the instance to consume-only with a warning.

use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use curvesync_core::protocol::wire::{
    encode_graphs_response, encode_selected_response, parse_count, Request, RESP_GRAPHS,
    RESP_SELECTED_GRAPHS,
};
use curvesync_core::{deserialize_points, CurveDescriptor, PeerEndpoint, PeerRecord};

use crate::application::state_store::StateStore;
use crate::infrastructure::storage::config::SocketConfig;
use crate::infrastructure::transport::{PeerTransport, TransportError};

/// How long `stop` waits for in-flight handlers before aborting them.
const HANDLER_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Maps this process id onto one port in the shared candidate range.
///
/// Distinct instances usually land on distinct ports; a collision just means
/// the loser runs consume-only until the winner exits.  A zero-width range
/// from a hand-edited config collapses to the base port.
pub fn derive_own_port(base_port: u16, port_range: u16) -> u16 {
    base_port + (std::process::id() % u32::from(port_range.max(1))) as u16
}

/// Awaits `fut` under `dur`, converting an elapsed timeout into
/// `io::ErrorKind::TimedOut`.
async fn io_with_timeout<T>(
    dur: Duration,
    fut: impl std::future::Future<Output = std::io::Result<T>>,
) -> std::io::Result<T> {
    match tokio::time::timeout(dur, fut).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "I/O deadline elapsed",
        )),
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

/// The serving half: accepts connections and answers one request per
/// connection from the store's current snapshot.
pub struct RendezvousServer {
    local_addr: SocketAddr,
    stop_tx: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl RendezvousServer {
    /// Binds the loopback listener and starts the accept loop.
    ///
    /// # Errors
    ///
    /// Returns the bind error; the caller decides whether that is fatal or
    /// a downgrade to consume-only.
    pub async fn bind(
        port: u16,
        store: StateStore,
        handler_timeout: Duration,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let local_addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = watch::channel(false);

        let accept_task =
            tokio::spawn(accept_loop(listener, stop_rx, store, handler_timeout));

        info!(addr = %local_addr, "rendezvous server listening");
        Ok(Self {
            local_addr,
            stop_tx,
            accept_task,
        })
    }

    /// The bound address; the port differs from the requested one only when
    /// binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting, then waits for in-flight handlers up to a grace
    /// period before aborting them.
    pub async fn stop(self) {
        // A dropped receiver already means the loop is gone.
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.accept_task.await {
            if !e.is_cancelled() {
                warn!(error = %e, "accept loop ended abnormally");
            }
        }
        info!(addr = %self.local_addr, "rendezvous server stopped");
    }
}

async fn accept_loop(
    listener: TcpListener,
    mut stop_rx: watch::Receiver<bool>,
    store: StateStore,
    handler_timeout: Duration,
) {
    let mut handlers = JoinSet::new();
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                // Either stop was requested or the server handle was dropped.
                let _ = changed;
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        let store = store.clone();
                        handlers.spawn(async move {
                            if let Err(e) =
                                serve_one(stream, store, handler_timeout).await
                            {
                                debug!(peer = %peer_addr, error = %e, "handler failed");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }

    // Close the port first so scans stop seeing this instance, then drain.
    drop(listener);
    let drained = tokio::time::timeout(HANDLER_DRAIN_GRACE, async {
        while handlers.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!("handlers still running after grace period, aborting");
        handlers.abort_all();
        while handlers.join_next().await.is_some() {}
    }
}

/// Answers a single connection: one request line in, one response frame out.
///
/// A connection closed without sending anything is a liveness probe and gets
/// no response.  An unrecognised request also gets none; the protocol
/// reserves silence for "I do not speak that".
async fn serve_one(
    stream: TcpStream,
    store: StateStore,
    handler_timeout: Duration,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    let n = io_with_timeout(handler_timeout, reader.read_line(&mut line)).await?;
    if n == 0 {
        // Liveness probe: connect-then-close.
        return Ok(());
    }

    let request = match Request::parse(line.trim_end()) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "closing connection without response");
            return Ok(());
        }
    };

    let snapshot = store.snapshot();
    let frame = match request {
        Request::SelectedGraphs => encode_selected_response(&snapshot.selected),
        Request::Graphs => encode_graphs_response(&snapshot.curves),
    };

    io_with_timeout(handler_timeout, write_half.write_all(frame.as_bytes())).await?;
    io_with_timeout(handler_timeout, write_half.shutdown()).await?;
    Ok(())
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Probes the candidate range and returns records for every port that
/// accepted, excluding `own_port`.
///
/// Probes run sequentially; the caller's cadence tolerates the bounded worst
/// case and sequential probing avoids a connection burst against siblings.
pub async fn scan_ports(
    base_port: u16,
    port_range: u16,
    own_port: u16,
    connect_timeout: Duration,
) -> Vec<PeerRecord> {
    let mut peers = Vec::new();
    for port in base_port..base_port.saturating_add(port_range) {
        if port == own_port {
            continue;
        }
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let probe = tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await;
        if let Ok(Ok(stream)) = probe {
            drop(stream);
            peers.push(PeerRecord {
                endpoint: PeerEndpoint::Tcp(addr),
                last_seen: SystemTime::now(),
            });
        }
    }
    peers
}

/// Performs one request/response exchange and returns the raw response
/// lines, or `None` if the peer did not answer within the timeouts.
async fn exchange(
    addr: SocketAddr,
    request: Request,
    connect_timeout: Duration,
    io_timeout: Duration,
) -> Option<Vec<String>> {
    let connect = tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await;
    let stream = match connect {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            debug!(peer = %addr, error = %e, "connect failed");
            return None;
        }
        Err(_) => {
            debug!(peer = %addr, "connect timed out");
            return None;
        }
    };

    let (read_half, mut write_half) = stream.into_split();
    let mut request_line = request.as_line().to_string();
    request_line.push('\n');
    if let Err(e) = io_with_timeout(io_timeout, write_half.write_all(request_line.as_bytes())).await
    {
        debug!(peer = %addr, error = %e, "request write failed");
        return None;
    }

    let mut reader = BufReader::new(read_half);
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        match io_with_timeout(io_timeout, reader.read_line(&mut line)).await {
            Ok(0) => break,
            Ok(_) => {
                // Strip the terminator but keep interior content verbatim.
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                lines.push(line);
            }
            Err(e) => {
                debug!(peer = %addr, error = %e, "response read failed");
                return None;
            }
        }
    }
    Some(lines)
}

/// Fetches the peer's selected curve names, or `None` on any failure.
pub async fn fetch_selected(
    addr: SocketAddr,
    connect_timeout: Duration,
    io_timeout: Duration,
) -> Option<Vec<String>> {
    let lines = exchange(addr, Request::SelectedGraphs, connect_timeout, io_timeout).await?;
    let mut iter = lines.into_iter();

    if iter.next()? != RESP_SELECTED_GRAPHS {
        return None;
    }
    let count = parse_count(&iter.next()?).ok()?;
    let names: Vec<String> = iter.take(count).collect();
    if names.len() != count {
        debug!(peer = %addr, "truncated selected-names frame");
        return None;
    }
    Some(names)
}

/// Fetches the peer's full curve descriptors, or `None` on any failure.
pub async fn fetch_graphs(
    addr: SocketAddr,
    connect_timeout: Duration,
    io_timeout: Duration,
) -> Option<Vec<CurveDescriptor>> {
    let lines = exchange(addr, Request::Graphs, connect_timeout, io_timeout).await?;
    let mut iter = lines.into_iter();

    if iter.next()? != RESP_GRAPHS {
        return None;
    }
    let count = parse_count(&iter.next()?).ok()?;
    let mut curves = Vec::with_capacity(count);
    for _ in 0..count {
        let name = iter.next()?;
        let points_text = iter.next()?;
        let points = deserialize_points(&points_text);
        curves.push(CurveDescriptor::from_points(
            name,
            points,
            curvesync_core::DEFAULT_POWER,
        ));
    }
    Some(curves)
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// [`PeerTransport`] over loopback TCP.
pub struct SocketTransport {
    config: SocketConfig,
    store: StateStore,
    own_port: u16,
    server: Mutex<Option<RendezvousServer>>,
}

impl SocketTransport {
    /// Transport on the pid-derived port from the configured range.
    pub fn new(config: SocketConfig, store: StateStore) -> Self {
        let own_port = derive_own_port(config.base_port, config.port_range);
        Self::with_port(config, store, own_port)
    }

    /// Transport pinned to an explicit port.  Lets several instances coexist
    /// in one process, where the pid-derived port would collide.
    pub fn with_port(config: SocketConfig, store: StateStore, own_port: u16) -> Self {
        Self {
            config,
            store,
            own_port,
            server: Mutex::new(None),
        }
    }

    pub fn own_port(&self) -> u16 {
        self.own_port
    }
}

#[async_trait]
impl PeerTransport for SocketTransport {
    async fn start(&self) -> Result<(), TransportError> {
        let mut slot = self.server.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        match RendezvousServer::bind(
            self.own_port,
            self.store.clone(),
            self.config.handler_timeout(),
        )
        .await
        {
            Ok(server) => {
                *slot = Some(server);
            }
            Err(e) => {
                // Consume-only mode: fetches still work, peers cannot see us.
                warn!(port = self.own_port, error = %e, "bind failed, serving disabled");
            }
        }
        Ok(())
    }

    async fn find_peers(&self) -> Vec<PeerRecord> {
        scan_ports(
            self.config.base_port,
            self.config.port_range,
            self.own_port,
            self.config.connect_timeout(),
        )
        .await
    }

    async fn fetch_names(&self, peer: &PeerRecord) -> Option<Vec<String>> {
        match peer.endpoint {
            PeerEndpoint::Tcp(addr) => {
                fetch_selected(addr, self.config.connect_timeout(), self.config.io_timeout())
                    .await
            }
            PeerEndpoint::Heartbeat(_) => None,
        }
    }

    async fn fetch_curves(&self, peer: &PeerRecord) -> Option<Vec<CurveDescriptor>> {
        match peer.endpoint {
            PeerEndpoint::Tcp(addr) => {
                fetch_graphs(addr, self.config.connect_timeout(), self.config.io_timeout())
                    .await
            }
            PeerEndpoint::Heartbeat(_) => None,
        }
    }

    async fn publish(&self) -> Result<(), TransportError> {
        // The server answers from the store's live snapshot; nothing to push.
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        let server = self.server.lock().await.take();
        if let Some(server) = server {
            server.stop().await;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
