// SPDX-License-Identifier: MIT
//! In-process bridge between a rendering surface and its router.
//!
//! Models the embedded web-view's postMessage boundary as a channel pair: the
//! host side feeds the router's inbound channel and drains its outbound sink;
//! the surface side is what the embedded panel (or a test standing in for it)
//! holds.  One router is bound per surface instance and recreated whenever
//! the surface is torn down and recreated.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{outbound_channel, Outbound};
use crate::api::{ApiRouter, ToolApi};
use crate::protocol::Envelope;

/// Router-facing half of the bridge.
pub struct BridgeHost {
    /// Envelopes posted by the surface, in arrival order.
    pub inbound: mpsc::UnboundedReceiver<Envelope>,
    /// Sink the router (and its providers) write through.
    pub outbound: Outbound,
}

impl BridgeHost {
    /// Bind a router over this bridge.  Consumes the host side; the router
    /// lives as long as the surface does.
    pub fn bind(self, providers: Vec<Arc<dyn ToolApi>>) -> ApiRouter {
        ApiRouter::bind(self.inbound, self.outbound, providers)
    }
}

/// Surface-facing half of the bridge.
pub struct BridgeSurface {
    to_host: mpsc::UnboundedSender<Envelope>,
    from_host: mpsc::UnboundedReceiver<Envelope>,
}

impl BridgeSurface {
    /// Post an envelope to the host, as the surface's native post primitive
    /// would.
    pub fn post(&self, envelope: Envelope) {
        let _ = self.to_host.send(envelope);
    }

    /// Receive the next envelope the host pushed to this surface.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.from_host.recv().await
    }
}

/// Build a connected host/surface pair.
pub fn surface_bridge() -> (BridgeHost, BridgeSurface) {
    let (to_host, inbound) = mpsc::unbounded_channel();
    let (outbound, from_host) = outbound_channel();
    (
        BridgeHost { inbound, outbound },
        BridgeSurface { to_host, from_host },
    )
}

// ─── Tests ────────────────────────────────────────────────────────────────────
