// SPDX-License-Identifier: MIT
//! Tool API router — dispatches envelopes to named capability providers.
//!
//! A [`ApiRouter`] owns an immutable registry mapping API names to
//! [`ToolApi`] providers, built once at construction.  Inbound envelopes are
//! read from a transport channel and dispatched concurrently; each request
//! with an `id` receives exactly one response with the same `id`, whether the
//! handler succeeds, fails, or the API name is unknown.  Responses correlate
//! by id only — no ordering guarantee is made between them.
//!
//! One router instance exists per transport endpoint (one per rendering
//! surface, one per accepted socket connection), so concurrent routers never
//! share dispatch state.

pub mod device;
pub mod editor;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::protocol::{self, Envelope};
use crate::transport::Outbound;

// ─── ToolApi ──────────────────────────────────────────────────────────────────

/// A named capability provider answering requests for one API namespace.
#[async_trait]
pub trait ToolApi: Send + Sync {
    /// Unique, case-sensitive namespace this provider answers for.
    fn api_name(&self) -> &'static str;

    /// Handle one request.  Unknown methods within the namespace return
    /// `Err` with a `METHOD_NOT_FOUND:` prefix so the router can map the
    /// failure to the right error code.
    async fn handle_request(&self, method: &str, params: Value) -> Result<Value>;

    /// Release provider-owned subscriptions.  Called exactly once per router
    /// disposal.
    fn dispose(&self) {}
}

/// Builds the standard error for a method the provider does not implement.
pub fn method_not_found(method: &str) -> anyhow::Error {
    anyhow::anyhow!("METHOD_NOT_FOUND:{method}")
}

// ─── EventSender ──────────────────────────────────────────────────────────────

/// Outbound event handle scoped to one provider's namespace.
///
/// Events are notifications (`"<apiName>.<eventName>"`, no id) and may be
/// emitted at any time, independent of pending requests.
#[derive(Clone)]
pub struct EventSender {
    api_name: &'static str,
    outbound: Outbound,
}

impl EventSender {
    pub fn new(api_name: &'static str, outbound: Outbound) -> Self {
        Self { api_name, outbound }
    }

    pub fn send_event(&self, event: &str, params: Value) {
        let method = format!("{}.{event}", self.api_name);
        self.outbound.post(Envelope::notification(&method, params));
    }
}

// ─── ApiRouter ────────────────────────────────────────────────────────────────

/// Transport-agnostic dispatcher multiplexing named tool APIs behind a single
/// logical channel.
pub struct ApiRouter {
    shared: Arc<RouterShared>,
    pump: JoinHandle<()>,
}

struct RouterShared {
    outbound: Outbound,
    apis: HashMap<&'static str, Arc<dyn ToolApi>>,
    disposed: AtomicBool,
}

impl ApiRouter {
    /// Bind a router over an inbound envelope channel and an outbound sink.
    ///
    /// The provider registry is fixed at construction; there is no dynamic
    /// registration.  Dispatch starts immediately.
    pub fn bind(
        mut inbound: mpsc::UnboundedReceiver<Envelope>,
        outbound: Outbound,
        providers: Vec<Arc<dyn ToolApi>>,
    ) -> Self {
        let mut apis = HashMap::new();
        for api in providers {
            apis.insert(api.api_name(), api);
        }
        let shared = Arc::new(RouterShared {
            outbound,
            apis,
            disposed: AtomicBool::new(false),
        });
        let pump_shared = Arc::clone(&shared);
        let pump = tokio::spawn(async move {
            while let Some(envelope) = inbound.recv().await {
                // Each envelope dispatches on its own task: a slow handler
                // for one API never delays responses for another.
                let shared = Arc::clone(&pump_shared);
                tokio::spawn(async move { shared.handle_message(envelope).await });
            }
        });
        Self { shared, pump }
    }

    /// Stamp protocol metadata and write straight to the outbound sink.
    pub fn post_message(&self, envelope: Envelope) {
        self.shared.outbound.post(envelope);
    }

    /// Stop the inbound pump and dispose every provider exactly once.
    /// Safe to call multiple times.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.pump.abort();
        for api in self.shared.apis.values() {
            api.dispose();
        }
    }
}

impl Drop for ApiRouter {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl RouterShared {
    async fn handle_message(&self, envelope: Envelope) {
        // Envelopes without a method string (responses, malformed input) are
        // a protocol-level no-op at this layer.
        let Some((api_name, method_name)) = envelope
            .method_parts()
            .map(|(api, method)| (api.to_string(), method.to_string()))
        else {
            debug!("envelope without method — dropped");
            return;
        };

        debug!(api = %api_name, method = %method_name, "rpc dispatch");

        let id = envelope.id;
        let Some(api) = self.apis.get(api_name.as_str()) else {
            if let Some(id) = id {
                self.outbound.post(Envelope::error_response(
                    id,
                    protocol::UNKNOWN_API,
                    format!("no handler for '{api_name}' API"),
                ));
            }
            return;
        };

        let params = envelope.params.unwrap_or(Value::Null);
        match api.handle_request(&method_name, params).await {
            Ok(result) => {
                if let Some(id) = id {
                    self.outbound.post(Envelope::response(id, result));
                }
            }
            Err(e) => {
                if let Some(id) = id {
                    let (code, message) = classify_error(&e);
                    self.outbound.post(Envelope::error_response(id, code, message));
                } else {
                    warn!(api = %api_name, method = %method_name, err = %e, "notification handler failed");
                }
            }
        }
    }
}

/// Map a handler failure to an RPC error code.
fn classify_error(e: &anyhow::Error) -> (i32, String) {
    let msg = e.to_string();
    if let Some(method) = msg.strip_prefix("METHOD_NOT_FOUND:") {
        return (
            protocol::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        );
    }
    if msg.contains("missing field") || msg.contains("invalid type") {
        return (protocol::INVALID_PARAMS, format!("Invalid params: {msg}"));
    }
    (protocol::INTERNAL_ERROR, msg)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
