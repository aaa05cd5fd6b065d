// SPDX-License-Identifier: MIT
//! Rendering-surface channel used by the sync controller.
//!
//! The surface's single message channel has two directions: the controller
//! pushes `setWidget` notifications toward the panel, and the panel posts
//! edit-request events back.  Edit events ride a broadcast channel so the
//! controller can drop its subscription wholesale when a new description
//! supersedes the displayed one.  Only one logical writer should be active on
//! a given surface channel at a time.

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::protocol::Envelope;

/// Handle to one rendering surface instance.
#[derive(Clone)]
pub struct SurfaceConnection {
    outbound: mpsc::UnboundedSender<Envelope>,
    edits: broadcast::Sender<Envelope>,
}

impl SurfaceConnection {
    /// Build the connection plus the receiver drained by whatever hosts the
    /// panel (the web-view glue, or a test standing in for it).
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let (edits, _) = broadcast::channel(64);
        (Self { outbound, edits }, rx)
    }

    /// Push an envelope toward the panel.
    pub fn post(&self, envelope: Envelope) {
        let _ = self.outbound.send(envelope);
    }

    /// Subscribe to edit-request events posted by the panel.  Each new
    /// subscription starts from the next event; dropping the receiver ends
    /// the subscription.
    pub fn subscribe_edits(&self) -> broadcast::Receiver<Envelope> {
        self.edits.subscribe()
    }

    /// Called by the panel host when the surface posts an event back.
    pub fn emit_edit(&self, envelope: Envelope) {
        if self.edits.send(envelope).is_err() {
            // No live subscription — the controller is between displays.
            debug!("surface edit event with no subscriber — dropped");
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
