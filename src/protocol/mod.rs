// SPDX-License-Identifier: MIT
//! JSON-RPC 2.0 message envelope shared by every transport.
//!
//! One struct covers all three wire shapes: requests and notifications carry
//! `method` (plus `id` when a response is expected), responses carry `id` and
//! exactly one of `result` / `error`.  Outbound messages are stamped with
//! `jsonrpc: "2.0"` by the router; inbound messages are accepted with or
//! without the field so embedded surfaces can post the minimal form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Error codes ──────────────────────────────────────────────────────────────
//
// Standard JSON-RPC 2.0 codes plus one implementation-defined code for a
// request addressed to an API namespace with no registered provider.

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// No capability provider is registered for the requested API namespace.
pub const UNKNOWN_API: i32 = -32010;

// ─── Envelope ─────────────────────────────────────────────────────────────────

/// The request / notification / response message unit exchanged over either
/// transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    /// Correlation token.  Present means the sender expects exactly one
    /// response with the same id; absent means fire-and-forget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Namespaced as `"<apiName>.<methodName>"` for requests directed at a
    /// capability provider, or `"<apiName>.<eventName>"` for outbound events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Structured error carried by a response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl Envelope {
    /// Build a request with an id.
    pub fn request(id: Value, method: &str, params: Value) -> Self {
        Self {
            id: Some(id),
            method: Some(method.to_string()),
            params: Some(params),
            ..Self::default()
        }
    }

    /// Build a notification (no `id`, no response expected).
    pub fn notification(method: &str, params: Value) -> Self {
        Self {
            method: Some(method.to_string()),
            params: Some(params),
            ..Self::default()
        }
    }

    /// Build a success response.  `result` may be `Value::Null`; the response
    /// is still sent so the caller's correlation is satisfied.
    pub fn response(id: Value, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Self::default()
        }
    }

    /// Build an error response.
    pub fn error_response(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            ..Self::default()
        }
    }

    /// Split `method` at the first `.` into `(apiName, methodName)`.
    ///
    /// A method with no dot yields the whole string as the api name and an
    /// empty method name.  Returns `None` when `method` is absent.
    pub fn method_parts(&self) -> Option<(&str, &str)> {
        let method = self.method.as_deref()?;
        Some(method.split_once('.').unwrap_or((method, "")))
    }

    /// Whether this envelope expects a response.
    pub fn expects_response(&self) -> bool {
        self.id.is_some()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
