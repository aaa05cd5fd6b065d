// SPDX-License-Identifier: MIT
//! Sidebar sync controller — keeps the widget panel consistent with the
//! document under the caret.
//!
//! The control loop: a selection or content change arms a debounce timer; the
//! timer fires a description query against the analysis backend; the result
//! is pushed to the rendering surface; property edits come back from the
//! surface, are applied as workspace edits, and trigger a re-query plus a
//! collapsed save + reload.
//!
//! Race rules, enforced by cancel-before-start on every transition:
//! at most one live debounce timer, one in-flight query token, one edit
//! subscription, and one reload timer at any instant.  A stale query's
//! result is discarded via its cancellation token; a superseded description's
//! edit subscription is aborted before the replacement is installed so an
//! old panel can never edit a new description.

pub mod backend;
pub mod surface;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SidebarConfig;
use crate::protocol::Envelope;
use crate::schedule::DelayedTask;
use crate::widget::PropertyValue;

use backend::{AnalysisBackend, DescriptionQuery, DocumentHost, ReloadHost};
use surface::SurfaceConnection;

// ─── Timings ──────────────────────────────────────────────────────────────────

/// Delay windows driving the controller's timers.
#[derive(Debug, Clone, Copy)]
pub struct SidebarTimings {
    /// Window after the last selection/content change before querying.
    pub debounce: Duration,
    /// Delay before re-querying after an applied edit or a reload, while the
    /// backend invalidates and rebuilds its own state.
    pub resync: Duration,
    /// Window that merges rapid edits into a single save + reload.
    pub reload_collapse: Duration,
}

impl Default for SidebarTimings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            resync: Duration::from_millis(500),
            reload_collapse: Duration::from_millis(250),
        }
    }
}

impl From<&SidebarConfig> for SidebarTimings {
    fn from(config: &SidebarConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            resync: Duration::from_millis(config.resync_ms),
            reload_collapse: Duration::from_millis(config.reload_collapse_ms),
        }
    }
}

// ─── Controller ───────────────────────────────────────────────────────────────

/// Drives the debounce / query / push / apply / reload loop for one surface.
pub struct SyncController {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn AnalysisBackend>,
    documents: Arc<dyn DocumentHost>,
    reload: Arc<dyn ReloadHost>,
    surface: SurfaceConnection,
    timings: SidebarTimings,
    state: Mutex<SessionState>,
}

/// Live session resources.  At most one of each; starting a new one
/// invalidates the previous.
#[derive(Default)]
struct SessionState {
    debounce: Option<DelayedTask>,
    query_token: Option<CancellationToken>,
    edit_pump: Option<JoinHandle<()>>,
    resync: Option<DelayedTask>,
    reload_timer: Option<DelayedTask>,
    disposed: bool,
}

#[derive(Deserialize)]
struct SetPropertyParams {
    id: i64,
    value: Option<PropertyValue>,
}

impl SyncController {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        documents: Arc<dyn DocumentHost>,
        reload: Arc<dyn ReloadHost>,
        surface: SurfaceConnection,
        timings: SidebarTimings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                documents,
                reload,
                surface,
                timings,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// A document-selection or document-content change happened.  Collapses
    /// bursts within the debounce window into one query and invalidates any
    /// query already in flight.
    pub async fn queue_update(&self) {
        let mut state = self.inner.state.lock().await;
        if state.disposed {
            return;
        }
        if let Some(token) = state.query_token.take() {
            token.cancel();
        }
        let token = CancellationToken::new();
        state.query_token = Some(token.clone());
        let inner = Arc::clone(&self.inner);
        // Replacing the slot drops (and thereby cancels) the previous timer.
        state.debounce = Some(DelayedTask::schedule(
            self.inner.timings.debounce,
            async move { inner.update_sidebar(token).await },
        ));
    }

    /// Cancel all pending timers and the active token, and unsubscribe the
    /// edit listener.  No callback fires after disposal; safe to call twice.
    pub async fn dispose(&self) {
        let mut state = self.inner.state.lock().await;
        if state.disposed {
            return;
        }
        state.disposed = true;
        if let Some(timer) = state.debounce.take() {
            timer.abort();
        }
        if let Some(token) = state.query_token.take() {
            token.cancel();
        }
        if let Some(pump) = state.edit_pump.take() {
            pump.abort();
        }
        if let Some(timer) = state.resync.take() {
            timer.abort();
        }
        if let Some(timer) = state.reload_timer.take() {
            timer.abort();
        }
    }
}

impl Inner {
    /// The debounce timer fired.  Re-validate preconditions, query, and
    /// display the result unless the token went stale meanwhile.
    async fn update_sidebar(self: Arc<Self>, token: CancellationToken) {
        let Some(document) = self.documents.active_document() else {
            return;
        };

        let query = DescriptionQuery::for_document(&document);
        let description = match self.backend.widget_description(&query).await {
            Ok(Some(description)) => description,
            Ok(None) => return,
            Err(e) => {
                debug!(uri = %query.uri, err = %e, "widget description query failed");
                return;
            }
        };

        if token.is_cancelled() {
            return;
        }

        let mut state = self.state.lock().await;
        if state.disposed {
            return;
        }

        // Disposed-before-replaced: the old description's edits must never be
        // applied against the new one.
        if let Some(pump) = state.edit_pump.take() {
            pump.abort();
        }

        self.surface.post(Envelope::notification(
            "setWidget",
            json!({
                "description": description,
                "offset": document.offset,
                "uri": document.uri,
            }),
        ));

        let mut edits = self.surface.subscribe_edits();
        let inner = Arc::clone(&self);
        let uri = document.uri.clone();
        state.edit_pump = Some(tokio::spawn(async move {
            loop {
                match edits.recv().await {
                    Ok(envelope) => {
                        Arc::clone(&inner).handle_surface_event(&uri, envelope).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "surface edit events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    async fn handle_surface_event(self: Arc<Self>, uri: &str, envelope: Envelope) {
        if envelope.method.as_deref() != Some("setWidgetPropertyValue") {
            return;
        }
        let Some(params) = envelope.params else {
            return;
        };
        let request: SetPropertyParams = match serde_json::from_value(params) {
            Ok(request) => request,
            Err(e) => {
                debug!(err = %e, "malformed setWidgetPropertyValue event");
                return;
            }
        };
        self.apply_property_edit(uri, request).await;
    }

    async fn apply_property_edit(self: Arc<Self>, uri: &str, request: SetPropertyParams) {
        let edit = match self
            .backend
            .set_property_value(request.id, request.value)
            .await
        {
            Ok(Some(edit)) => edit,
            // No edit returned — nothing to change, state stays as displayed.
            Ok(None) => return,
            Err(e) => {
                warn!(property = request.id, err = %e, "property edit request failed");
                return;
            }
        };

        if !self.documents.apply_edit(&edit).await {
            // Application failed: no reload, no re-sync.
            return;
        }

        // The backend invalidates its own state once the edit lands; re-query
        // after it settles, and fold rapid edits into one save + reload.
        Arc::clone(&self).arm_resync().await;
        self.arm_reload(uri).await;
    }

    /// Arm (or re-arm) the delayed re-query.
    async fn arm_resync(self: Arc<Self>) {
        let mut state = self.state.lock().await;
        if state.disposed {
            return;
        }
        let inner = Arc::clone(&self);
        state.resync = Some(DelayedTask::schedule(self.timings.resync, async move {
            inner.refresh().await;
        }));
    }

    /// Arm (or re-arm) the collapsed save + reload, which itself compensates
    /// for reload-induced invalidation with another re-sync.
    async fn arm_reload(self: Arc<Self>, uri: &str) {
        let mut state = self.state.lock().await;
        if state.disposed {
            return;
        }
        let inner = Arc::clone(&self);
        let uri = uri.to_string();
        state.reload_timer = Some(DelayedTask::schedule(
            self.timings.reload_collapse,
            async move {
                inner.documents.save(&uri).await;
                inner.reload.trigger_reload().await;
                inner.arm_resync().await;
            },
        ));
    }

    /// Re-run the query with a fresh token, replacing any in-flight one.
    //
    // Returns a boxed `Send` future to break the auto-trait inference cycle
    // between the mutually-recursive async methods (`arm_resync` -> `refresh`
    // -> `update_sidebar` -> edit pump -> `apply_property_edit` -> `arm_resync`),
    // which the compiler cannot resolve for `impl Future` opaque types.
    fn refresh(
        self: Arc<Self>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async move {
            let token = {
                let mut state = self.state.lock().await;
                if state.disposed {
                    return;
                }
                if let Some(previous) = state.query_token.take() {
                    previous.cancel();
                }
                let token = CancellationToken::new();
                state.query_token = Some(token.clone());
                token
            };
            self.update_sidebar(token).await;
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_come_from_config_milliseconds() {
        let config = SidebarConfig {
            debounce_ms: 120,
            resync_ms: 400,
            reload_collapse_ms: 90,
        };
        let timings = SidebarTimings::from(&config);
        assert_eq!(timings.debounce, Duration::from_millis(120));
        assert_eq!(timings.resync, Duration::from_millis(400));
        assert_eq!(timings.reload_collapse, Duration::from_millis(90));
    }

    #[test]
    fn default_timings_match_the_documented_windows() {
        let timings = SidebarTimings::default();
        assert_eq!(timings.debounce, Duration::from_millis(200));
        assert_eq!(timings.resync, Duration::from_millis(500));
        assert_eq!(timings.reload_collapse, Duration::from_millis(250));
    }
}
