// SPDX-License-Identifier: MIT
//! Daemon configuration.
//!
//! Layered the usual way: CLI flag > environment variable > `config.toml` in
//! the data directory > built-in default.  A missing or unparseable config
//! file falls back to defaults with a logged error — the daemon always
//! starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 0; // OS-assigned
const DEFAULT_DEBOUNCE_MS: u64 = 200;
const DEFAULT_RESYNC_MS: u64 = 500;
const DEFAULT_RELOAD_COLLAPSE_MS: u64 = 250;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── SidebarConfig ────────────────────────────────────────────────────────────

/// Sidebar sync timing configuration (`[sidebar]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SidebarConfig {
    /// Window after the last caret/content change before querying (milliseconds). Default: 200.
    pub debounce_ms: u64,
    /// Delay before re-querying after an edit or reload (milliseconds). Default: 500.
    pub resync_ms: u64,
    /// Window that merges rapid edits into one save + reload (milliseconds). Default: 250.
    pub reload_collapse_ms: u64,
}

impl Default for SidebarConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            resync_ms: DEFAULT_RESYNC_MS,
            reload_collapse_ms: DEFAULT_RELOAD_COLLAPSE_MS,
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Socket transport port.  0 requests an OS-assigned ephemeral port.
    pub port: u16,
    /// Bind address for the socket transport.  Loopback unless explicitly
    /// overridden.
    pub bind_address: String,
    /// Data directory holding config.toml.
    pub data_dir: PathBuf,
    /// Log level filter (trace, debug, info, warn, error).
    pub log: String,
    /// Sidebar sync timings.
    pub sidebar: SidebarConfig,
}

/// Optional-everything mirror of the config file.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    port: Option<u16>,
    bind_address: Option<String>,
    log: Option<String>,
    sidebar: Option<SidebarConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

impl DaemonConfig {
    /// Resolve the configuration from CLI-provided overrides plus the config
    /// file in `data_dir`.
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // TOML is the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());
        let bind_address = bind_address
            .or(std::env::var("INSPECTORD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);
        let sidebar = toml.sidebar.unwrap_or_default();

        Self {
            port,
            bind_address,
            data_dir,
            log,
            sidebar,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::new(None, None, None, None)
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/inspectord
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("inspectord");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/inspectord or ~/.local/share/inspectord
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("inspectord");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("inspectord");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\inspectord
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("inspectord");
        }
    }
    // Fallback
    PathBuf::from(".inspectord")
}

// ─── Tests ────────────────────────────────────────────────────────────────────
