// SPDX-License-Identifier: MIT
//! External collaborator contracts consumed by the sync controller.
//!
//! The analysis backend, the host document model, and the reload action are
//! owned by the embedding editor; the controller only sees these traits.
//! Everything here is async and tolerant of unbounded suspension — staleness
//! is handled by the caller discarding late results.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::widget::{PropertyValue, WidgetDescription};

// ─── Document shapes ──────────────────────────────────────────────────────────

/// Zero-based line/character position, as the analysis protocol counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// The active document and caret at the moment a query is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub uri: String,
    pub version: i32,
    /// Byte offset of the caret, forwarded to the surface alongside the
    /// description.
    pub offset: usize,
    pub position: Position,
}

/// Description query keyed by document version and caret position, so the
/// backend can reject requests against text it has not analyzed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionQuery {
    pub uri: String,
    pub version: i32,
    pub position: Position,
}

impl DescriptionQuery {
    pub fn for_document(document: &DocumentSnapshot) -> Self {
        Self {
            uri: document.uri.clone(),
            version: document.version,
            position: document.position,
        }
    }
}

/// Opaque workspace edit passed through from the backend to the document
/// host.  The controller never inspects its contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceEdit(pub Value);

// ─── Contracts ────────────────────────────────────────────────────────────────

/// The language/analysis backend that computes widget descriptions and
/// property edits.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Describe the widget at the queried position.  `None` means nothing to
    /// show (no widget, or the backend has no answer for this version).
    async fn widget_description(
        &self,
        query: &DescriptionQuery,
    ) -> Result<Option<WidgetDescription>>;

    /// Compute the edit that sets property `id` to `value`.  `None` means
    /// the backend declined the change.
    async fn set_property_value(
        &self,
        id: i64,
        value: Option<PropertyValue>,
    ) -> Result<Option<WorkspaceEdit>>;
}

/// The host editor's document model.
#[async_trait]
pub trait DocumentHost: Send + Sync {
    /// Current relevant document with an active selection, or `None` — the
    /// controller's precondition for querying at all.
    fn active_document(&self) -> Option<DocumentSnapshot>;

    /// Apply a workspace edit; `false` when the host rejected it.
    async fn apply_edit(&self, edit: &WorkspaceEdit) -> bool;

    /// Persist the document so the reload picks up the change.
    async fn save(&self, uri: &str);
}

/// The build / hot-reload action triggered after an applied edit.
#[async_trait]
pub trait ReloadHost: Send + Sync {
    async fn trigger_reload(&self);
}
