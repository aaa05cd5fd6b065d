// SPDX-License-Identifier: MIT
//! inspectord — widget inspector host.
//!
//! A bidirectional message broker between editor surfaces (an embedded
//! web-view panel, or remote processes on a loopback socket) and named
//! capability providers, plus the sidebar sync controller that keeps the
//! widget panel consistent with the document under the caret.
//!
//! The crate is library-first: the embedding editor wires up the document
//! model, analysis backend, and rendering surface through the traits in
//! [`sidebar::backend`] and drives everything from its own event loop.  The
//! `inspectord` binary hosts the socket transport for remote surfaces.

pub mod api;
pub mod config;
pub mod protocol;
pub mod schedule;
pub mod sidebar;
pub mod transport;
pub mod widget;

// Re-export primary types
pub use api::{ApiRouter, EventSender, ToolApi};
pub use protocol::Envelope;
pub use sidebar::{SidebarTimings, SyncController};
pub use widget::WidgetDescription;
