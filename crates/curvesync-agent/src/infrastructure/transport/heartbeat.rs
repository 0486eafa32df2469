//! Shared-directory rendezvous: one descriptor file per live instance.
//!
//! Each instance writes `<instance-id>.toml` into the shared directory on
//! every publish and deletes it on shutdown.  The file's modification time
//! is the liveness signal; a file older than the liveness window belongs to
//! an instance that stopped publishing, whether or not its process still
//! exists.  Readers therefore never block on a crashed sibling.
//!
//! Writes go through a `.tmp` sibling followed by a rename, so a reader can
//! never observe a half-written descriptor.  Files stale beyond the prune
//! threshold are deleted during scans; crashed instances cannot litter the
//! directory forever.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use curvesync_core::{
    deserialize_points, serialize_points, CurveDescriptor, InstanceId, LivenessPolicy,
    PeerEndpoint, PeerRecord, DEFAULT_POWER,
};

use crate::application::state_store::StateStore;
use crate::infrastructure::transport::{PeerTransport, TransportError};

/// Descriptor files older than this are deleted during scans.
const PRUNE_AFTER: Duration = Duration::from_secs(60);

/// On-disk descriptor of one instance's shared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatDoc {
    /// Identity of the writing instance.
    pub instance: InstanceId,
    /// Wall-clock write time, milliseconds since the Unix epoch.  Recorded
    /// for diagnostics; liveness uses the file's mtime.
    pub timestamp_ms: u64,
    /// One entry per selected curve.
    #[serde(default)]
    pub entries: Vec<HeartbeatEntry>,
}

/// One selected curve in a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatEntry {
    pub name: String,
    /// Serialized point text for the curve, absent when the selection names
    /// a curve the instance holds no definition for.
    pub points: Option<String>,
}

/// [`PeerTransport`] over a shared heartbeat directory.
pub struct HeartbeatTransport {
    dir: PathBuf,
    policy: LivenessPolicy,
    prune_after: Duration,
    store: StateStore,
    instance: InstanceId,
}

impl HeartbeatTransport {
    pub fn new(dir: PathBuf, liveness_window: Duration, store: StateStore) -> Self {
        Self {
            dir,
            policy: LivenessPolicy::new(liveness_window),
            prune_after: PRUNE_AFTER,
            store,
            instance: InstanceId::generate(),
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Path of this instance's own descriptor file.
    pub fn own_file(&self) -> PathBuf {
        self.dir.join(format!("{}.toml", self.instance))
    }

    #[cfg(test)]
    fn with_prune_after(mut self, prune_after: Duration) -> Self {
        self.prune_after = prune_after;
        self
    }

    /// Reads and parses one descriptor, re-checking its mtime first.  A file
    /// that went stale or vanished since discovery yields `None`.
    async fn read_live_doc(&self, path: &Path) -> Option<HeartbeatDoc> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        let mtime = metadata.modified().ok()?;
        if !self.policy.is_live(mtime, SystemTime::now()) {
            debug!(file = %path.display(), "descriptor went stale before fetch");
            return None;
        }
        let text = tokio::fs::read_to_string(path).await.ok()?;
        match toml::from_str::<HeartbeatDoc>(&text) {
            Ok(doc) => Some(doc),
            Err(e) => {
                debug!(file = %path.display(), error = %e, "unparseable descriptor");
                None
            }
        }
    }
}

/// Builds the descriptor entries: every selected name, with point text
/// attached when the snapshot holds a matching curve definition.
fn build_entries(
    selected: &[String],
    curves: &[CurveDescriptor],
) -> Vec<HeartbeatEntry> {
    selected
        .iter()
        .map(|name| HeartbeatEntry {
            name: name.clone(),
            points: curves
                .iter()
                .find(|c| &c.name == name)
                .map(|c| serialize_points(c.points())),
        })
        .collect()
}

fn unix_millis(now: SystemTime) -> u64 {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl PeerTransport for HeartbeatTransport {
    async fn start(&self) -> Result<(), TransportError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(TransportError::Startup)?;
        info!(dir = %self.dir.display(), instance = %self.instance, "heartbeat transport ready");
        Ok(())
    }

    async fn find_peers(&self) -> Vec<PeerRecord> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "heartbeat dir unreadable");
                return Vec::new();
            }
        };

        let own = self.own_file();
        let now = SystemTime::now();
        let mut peers = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path == own || path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let Ok(mtime) = metadata.modified() else {
                continue;
            };
            if self.policy.is_live(mtime, now) {
                peers.push(PeerRecord {
                    endpoint: PeerEndpoint::Heartbeat(path),
                    last_seen: mtime,
                });
            } else if now
                .duration_since(mtime)
                .map(|age| age > self.prune_after)
                .unwrap_or(false)
            {
                // Left behind by a crashed instance.
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    debug!(file = %path.display(), error = %e, "prune failed");
                } else {
                    info!(file = %path.display(), "pruned stale descriptor");
                }
            }
        }
        peers
    }

    async fn fetch_names(&self, peer: &PeerRecord) -> Option<Vec<String>> {
        match &peer.endpoint {
            PeerEndpoint::Heartbeat(path) => {
                let doc = self.read_live_doc(path).await?;
                Some(doc.entries.into_iter().map(|e| e.name).collect())
            }
            PeerEndpoint::Tcp(_) => None,
        }
    }

    async fn fetch_curves(&self, peer: &PeerRecord) -> Option<Vec<CurveDescriptor>> {
        match &peer.endpoint {
            PeerEndpoint::Heartbeat(path) => {
                let doc = self.read_live_doc(path).await?;
                let curves = doc
                    .entries
                    .into_iter()
                    .filter_map(|entry| {
                        entry.points.map(|text| {
                            CurveDescriptor::from_points(
                                entry.name,
                                deserialize_points(&text),
                                DEFAULT_POWER,
                            )
                        })
                    })
                    .collect();
                Some(curves)
            }
            PeerEndpoint::Tcp(_) => None,
        }
    }

    async fn publish(&self) -> Result<(), TransportError> {
        let snapshot = self.store.snapshot();
        let doc = HeartbeatDoc {
            instance: self.instance,
            timestamp_ms: unix_millis(SystemTime::now()),
            entries: build_entries(&snapshot.selected, &snapshot.curves),
        };
        let text = toml::to_string_pretty(&doc).map_err(|e| {
            TransportError::Publish(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })?;

        // Write-then-rename keeps the visible file whole at all times.
        let final_path = self.own_file();
        let tmp_path = final_path.with_extension("toml.tmp");
        tokio::fs::write(&tmp_path, text)
            .await
            .map_err(TransportError::Publish)?;
        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(TransportError::Publish)?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        match tokio::fs::remove_file(self.own_file()).await {
            Ok(()) => {
                info!(instance = %self.instance, "heartbeat descriptor withdrawn");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(error = %e, "failed to remove own descriptor");
                Err(TransportError::Shutdown(e))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
