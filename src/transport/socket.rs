// SPDX-License-Identifier: MIT
//! Loopback WebSocket transport for remote surfaces.
//!
//! Listens on an OS-assigned (or configured) port bound to the loopback
//! interface.  Each accepted connection gets a fresh inbound channel fed by
//! parsing one envelope per text frame, an outbound sink serializing one
//! frame per envelope, and exactly one router whose lifetime equals the
//! connection's.  Closing a connection never affects the others.
//!
//! No authentication is performed on this transport; see DESIGN.md for the
//! open hardening item.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{outbound_channel, Outbound};
use crate::api::{ApiRouter, ToolApi};
use crate::protocol::{self, Envelope};

/// Builds the provider set for one connection's router.
///
/// Called once per accepted connection with that connection's outbound sink,
/// so providers can construct api-scoped event senders.  Registries are
/// router-instance-scoped; concurrent connections never share one.
pub type ApiFactory = Arc<dyn Fn(&Outbound) -> Vec<Arc<dyn ToolApi>> + Send + Sync>;

/// Errors raised while setting up the socket transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}

/// WebSocket server hosting one router per connection.
pub struct SocketServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl SocketServer {
    /// Bind to `bind_address:port`.  Port 0 requests an OS-assigned port;
    /// the actual port is available from [`SocketServer::local_addr`].
    pub async fn bind(bind_address: &str, port: u16) -> Result<Self, TransportError> {
        let addr = format!("{bind_address}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` is cancelled.
    pub async fn serve(self, apis: ApiFactory, shutdown: CancellationToken) -> Result<()> {
        info!(addr = %self.local_addr, "socket transport listening");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("shutdown signal received — stopping socket transport");
                    break;
                }

                conn = self.listener.accept() => {
                    let (stream, peer) = match conn {
                        Ok(c) => c,
                        Err(e) => {
                            error!(err = %e, "accept error");
                            continue;
                        }
                    };
                    debug!(peer = %peer, "new connection");
                    let apis = Arc::clone(&apis);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, apis).await {
                            warn!(peer = %peer, err = %e, "connection error");
                        }
                    });
                }
            }
        }

        info!("socket transport stopped");
        Ok(())
    }
}

async fn handle_connection(stream: TcpStream, apis: ApiFactory) -> Result<()> {
    let ws = accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound, mut outbound_rx) = outbound_channel();
    let router = ApiRouter::bind(inbound_rx, outbound.clone(), apis(&outbound));

    loop {
        tokio::select! {
            // Incoming frame from the remote surface
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<Envelope>(&text) {
                            Ok(envelope) => {
                                let _ = inbound_tx.send(envelope);
                            }
                            Err(e) => {
                                debug!(err = %e, "unparseable frame");
                                outbound.post(Envelope::error_response(
                                    Value::Null,
                                    protocol::PARSE_ERROR,
                                    "Parse error",
                                ));
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(err = %e, "ws error");
                        break;
                    }
                    _ => {}
                }
            }
            // Outgoing envelope from the router or a provider event
            envelope = outbound_rx.recv() => {
                match envelope {
                    Some(envelope) => {
                        let text = serde_json::to_string(&envelope).unwrap_or_default();
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            warn!(err = %e, "send error");
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    router.dispose();
    Ok(())
}

/// Resolve when a shutdown signal is received.
///
/// On Unix this is SIGTERM *or* Ctrl-C; elsewhere Ctrl-C only.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
