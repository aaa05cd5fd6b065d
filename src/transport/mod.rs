// SPDX-License-Identifier: MIT
//! Transport adapters for the API router.
//!
//! The router is deliberately transport-agnostic: it reads envelopes from an
//! inbound channel and writes envelopes to an [`Outbound`] sink.  The two
//! concrete adapters — the in-process surface bridge and the loopback
//! WebSocket server — only move envelopes between those channels and their
//! native message primitives; no dispatch logic lives here.

pub mod bridge;
pub mod socket;

use tokio::sync::mpsc;

use crate::protocol::Envelope;

/// Outbound sink handle given to a router and its providers.
///
/// Every write stamps the protocol version.  Posting never blocks the caller;
/// a closed receiver means the transport is already torn down and the message
/// has nowhere to go.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Outbound {
    pub fn new(tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { tx }
    }

    pub fn post(&self, mut envelope: Envelope) {
        envelope.jsonrpc = Some("2.0".to_string());
        let _ = self.tx.send(envelope);
    }
}

/// Build an outbound sink plus the receiver a transport drains.
pub fn outbound_channel() -> (Outbound, mpsc::UnboundedReceiver<Envelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbound::new(tx), rx)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn outbound_stamps_protocol_version() {
        let (outbound, mut rx) = outbound_channel();
        outbound.post(Envelope::response(json!(1), json!(true)));
        let sent = rx.recv().await.expect("message delivered");
        assert_eq!(sent.jsonrpc.as_deref(), Some("2.0"));
    }

    #[tokio::test]
    async fn post_after_receiver_dropped_is_a_no_op() {
        let (outbound, rx) = outbound_channel();
        drop(rx);
        outbound.post(Envelope::notification("editor.ping", json!({})));
    }
}
