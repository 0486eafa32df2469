//! TOML-based configuration persistence for the sync agent.
//!
//! Reads and writes [`AgentConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\CurveSync\config.toml`
//! - Linux:    `~/.config/curvesync/config.toml`
//! - macOS:    `~/Library/Application Support/CurveSync/config.toml`
//!
//! Every field carries a serde default so the agent works on first run
//! (before a config file exists) and when upgrading from an older file that
//! is missing newer fields.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Which rendezvous strategy this instance uses.
///
/// Exactly one transport is active per process; the two implementations are
/// interchangeable behind the `PeerTransport` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Loopback TCP with port-scan discovery.
    Socket,
    /// Shared-directory heartbeat descriptor files.
    Heartbeat,
}

/// Top-level agent configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: GeneralConfig,
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// General agent behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Active rendezvous transport.
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
    /// Cadence at which the UI snapshot is republished.
    #[serde(default = "default_publish_period_ms")]
    pub publish_period_ms: u64,
}

/// Settings for the loopback-TCP transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocketConfig {
    /// First port of the candidate range shared by all instances.
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    /// Number of candidate ports; bounds both the instance count and the
    /// worst-case scan time (`port_range × connect_timeout`).
    #[serde(default = "default_port_range")]
    pub port_range: u16,
    /// Per-candidate connect timeout during a port scan.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Per-read/write timeout on the fetching side.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
    /// Per-read/write timeout inside a server connection handler.
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,
}

/// Settings for the heartbeat-file transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatConfig {
    /// Shared directory for descriptor files.  Empty string selects the
    /// platform data dir (`CurveSync/sync`).
    #[serde(default)]
    pub dir: String,
    /// Maximum descriptor age for the owning instance to count as running.
    #[serde(default = "default_liveness_window_ms")]
    pub liveness_window_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_transport() -> TransportKind {
    TransportKind::Socket
}
fn default_publish_period_ms() -> u64 {
    500
}
fn default_base_port() -> u16 {
    38700
}
fn default_port_range() -> u16 {
    32
}
fn default_connect_timeout_ms() -> u64 {
    200
}
fn default_io_timeout_ms() -> u64 {
    1_000
}
fn default_handler_timeout_ms() -> u64 {
    2_000
}
fn default_liveness_window_ms() -> u64 {
    2_000
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            transport: default_transport(),
            publish_period_ms: default_publish_period_ms(),
        }
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            base_port: default_base_port(),
            port_range: default_port_range(),
            connect_timeout_ms: default_connect_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
            handler_timeout_ms: default_handler_timeout_ms(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            liveness_window_ms: default_liveness_window_ms(),
        }
    }
}

// ── Duration accessors ────────────────────────────────────────────────────────

impl GeneralConfig {
    pub fn publish_period(&self) -> Duration {
        Duration::from_millis(self.publish_period_ms)
    }
}

impl SocketConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

impl HeartbeatConfig {
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.liveness_window_ms)
    }

    /// Resolves the heartbeat directory, falling back to the platform data
    /// dir when the config leaves it empty.
    pub fn resolved_dir(&self) -> Result<PathBuf, ConfigError> {
        if !self.dir.is_empty() {
            return Ok(PathBuf::from(&self.dir));
        }
        platform_data_dir()
            .map(|base| base.join("sync"))
            .ok_or(ConfigError::NoPlatformConfigDir)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads [`AgentConfig`] from disk, returning `AgentConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AgentConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: AgentConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AgentConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk, creating the config directory if needed.
pub fn save_config(config: &AgentConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the `CurveSync`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("CurveSync"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("curvesync"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("CurveSync")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// Resolves the platform data base directory for runtime artifacts such as
/// heartbeat files.
fn platform_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("CurveSync"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share"))
            })?;
        Some(base.join("curvesync"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("CurveSync")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
