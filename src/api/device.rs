// SPDX-License-Identifier: MIT
//! Device selection state shared with the editor capability provider.
//!
//! Device-list management itself is owned by the host; the provider only
//! needs a read-only projection of the currently selected device and a way to
//! hear about selection changes.  Both ride on a `tokio::sync::watch`
//! channel: the host keeps the [`DeviceRegistry`] feed side, providers clone
//! [`DeviceWatcher`] handles off it.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Read-only projection of a runtime/device descriptor, passed opaquely
/// through the router.  `None` at the watcher level means no device selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub category: Option<String>,
    pub emulator: bool,
    pub ephemeral: bool,
    pub id: String,
    pub name: String,
    pub platform: String,
    pub platform_type: Option<String>,
}

/// Feed side held by the externally owned device manager.
#[derive(Debug)]
pub struct DeviceRegistry {
    tx: watch::Sender<Option<DeviceSnapshot>>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Record a new selection (or deselection) and notify all watchers.
    pub fn select(&self, device: Option<DeviceSnapshot>) {
        // send_replace never fails even with zero live watchers.
        self.tx.send_replace(device);
    }

    pub fn watcher(&self) -> DeviceWatcher {
        DeviceWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read handle cloned into capability providers.
#[derive(Debug, Clone)]
pub struct DeviceWatcher {
    rx: watch::Receiver<Option<DeviceSnapshot>>,
}

impl DeviceWatcher {
    /// The currently selected device, or `None`.
    pub fn current(&self) -> Option<DeviceSnapshot> {
        self.rx.borrow().clone()
    }

    /// Wait for the next selection change and return the new value.
    /// Resolves to `None` permanently once the registry is dropped.
    pub async fn changed(&mut self) -> Option<Option<DeviceSnapshot>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
