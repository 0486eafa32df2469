//! CurveSync agent entry point.
//!
//! Headless demonstration instance: a stub [`UiHost`] seeded with a couple
//! of sample curves stands in for the plotting UI.  Run several copies to
//! watch them discover each other and converge on the union of their curve
//! names.
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML config, defaults on first run
//!  └─ spawn_ui_thread()      -- demo host on its own thread
//!  └─ SyncService::start()   -- transport + publish loop
//!  └─ poll loop              -- periodic peer fetch, logs merged names
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use curvesync_agent::application::state_store::StateStore;
use curvesync_agent::application::sync_service::SyncService;
use curvesync_agent::infrastructure::storage::config::load_config;
use curvesync_agent::infrastructure::transport::make_transport;
use curvesync_agent::infrastructure::ui_bridge::{spawn_ui_thread, UiHost};

use curvesync_core::{CurveDescriptor, Point};

/// Stand-in for the plotting UI: a fixed selection plus whatever peers
/// contribute.
struct DemoHost {
    curves: Vec<CurveDescriptor>,
    selected: Vec<String>,
}

impl DemoHost {
    fn seeded() -> Self {
        // Distinct seed data per process so converging instances are visible
        // in the logs.
        let label = format!("demo-{}", std::process::id());
        let curve = CurveDescriptor::from_points(
            label.clone(),
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(2.0, 4.0),
            ],
            2.0,
        );
        Self {
            curves: vec![curve],
            selected: vec![label],
        }
    }
}

impl UiHost for DemoHost {
    fn selected_curve_names(&mut self) -> Vec<String> {
        self.selected.clone()
    }

    fn all_curves(&mut self) -> Vec<CurveDescriptor> {
        self.curves.clone()
    }

    fn merge_discovered_names(&mut self, names: Vec<String>) {
        for name in names {
            if !self.selected.contains(&name) {
                info!(curve = %name, "adopted curve name from peer");
                self.selected.push(name);
            }
        }
    }

    fn merge_discovered_curves(&mut self, curves: Vec<CurveDescriptor>) {
        for curve in curves {
            if !self.curves.iter().any(|c| c.name == curve.name) {
                info!(curve = %curve.name, points = curve.point_count(), "adopted curve from peer");
                self.curves.push(curve);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().unwrap_or_else(|e| {
        eprintln!("config unreadable ({e}), using defaults");
        Default::default()
    });

    // Structured logging.  `RUST_LOG` overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.agent.log_level.clone())),
        )
        .init();

    info!(transport = ?config.agent.transport, "CurveSync agent starting");

    let store = StateStore::new();
    let transport = make_transport(&config, store.clone())?;
    let (bridge, ui_thread) = spawn_ui_thread(DemoHost::seeded());

    let service = Arc::new(SyncService::new(
        Arc::from(transport),
        bridge.clone(),
        store,
        config.agent.publish_period(),
    ));
    service.start().await?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    info!("CurveSync agent ready.  Press Ctrl-C to exit.");

    // ── Peer poll loop ────────────────────────────────────────────────────────
    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                let _ = changed;
                break;
            }
            _ = ticker.tick() => {
                let names = service.fetch_selected_from_peers().await;
                if names.is_empty() {
                    info!("no sibling instances reachable");
                } else {
                    info!(count = names.len(), ?names, "curves visible across siblings");
                    service.fetch_curves_from_peers().await;
                }
            }
        }
    }

    service.stop().await;
    drop(bridge);
    drop(service);
    if ui_thread.join().is_err() {
        warn!("UI thread panicked during shutdown");
    }

    info!("CurveSync agent stopped");
    Ok(())
}
