// SPDX-License-Identifier: MIT
//! The `editor` capability provider — the device/editor bridge.
//!
//! | Method                 | Direction        | Description                             |
//! |------------------------|------------------|-----------------------------------------|
//! | `editor.checkAvailable`    | surface → host | Signals the API is present (always true) |
//! | `editor.getSelectedDevice` | surface → host | Current device snapshot or `null`        |
//! | `editor.executeCommand`    | surface → host | Forward to the host command facility     |
//!
//! It also emits an `editor.selectedDeviceChanged` event whenever the
//! externally owned device manager reports a change, independent of any
//! pending request.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Mutex;
use tokio::task::JoinHandle;

use super::{method_not_found, EventSender, ToolApi};
use crate::api::device::DeviceWatcher;

/// Host-side generic command execution facility.
///
/// Arguments and return value pass through verbatim; the provider attaches no
/// meaning to either.
#[async_trait]
pub trait CommandHost: Send + Sync {
    async fn execute(&self, command: &str, arguments: Value) -> Result<Value>;
}

#[derive(Deserialize)]
struct ExecuteCommandParams {
    command: String,
    #[serde(default)]
    arguments: Value,
}

/// Capability provider for the `editor` namespace.
pub struct EditorApi {
    devices: DeviceWatcher,
    commands: Arc<dyn CommandHost>,
    device_pump: Mutex<Option<JoinHandle<()>>>,
}

impl EditorApi {
    pub const API_NAME: &'static str = "editor";

    /// Build the provider and start forwarding device selection changes as
    /// `selectedDeviceChanged` events.
    pub fn new(
        devices: DeviceWatcher,
        commands: Arc<dyn CommandHost>,
        events: EventSender,
    ) -> Arc<Self> {
        let mut watcher = devices.clone();
        let pump = tokio::spawn(async move {
            while let Some(device) = watcher.changed().await {
                events.send_event("selectedDeviceChanged", json!({ "device": device }));
            }
        });
        Arc::new(Self {
            devices,
            commands,
            device_pump: Mutex::new(Some(pump)),
        })
    }
}

#[async_trait]
impl ToolApi for EditorApi {
    fn api_name(&self) -> &'static str {
        Self::API_NAME
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            "checkAvailable" => Ok(json!(true)),
            "getSelectedDevice" => Ok(serde_json::to_value(self.devices.current())?),
            "executeCommand" => {
                let p: ExecuteCommandParams = serde_json::from_value(params)
                    .map_err(|e| anyhow::anyhow!("invalid type for editor.executeCommand: {e}"))?;
                self.commands.execute(&p.command, p.arguments).await
            }
            _ => Err(method_not_found(method)),
        }
    }

    fn dispose(&self) {
        if let Ok(mut pump) = self.device_pump.lock() {
            if let Some(handle) = pump.take() {
                handle.abort();
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::device::{DeviceRegistry, DeviceSnapshot};
    use crate::transport::outbound_channel;
    use std::time::Duration;

    struct RecordingHost;

    #[async_trait]
    impl CommandHost for RecordingHost {
        async fn execute(&self, command: &str, arguments: Value) -> Result<Value> {
            Ok(json!({ "ran": command, "args": arguments }))
        }
    }

    fn desktop_device() -> DeviceSnapshot {
        DeviceSnapshot {
            category: Some("desktop".to_string()),
            emulator: false,
            ephemeral: false,
            id: "linux".to_string(),
            name: "Linux".to_string(),
            platform: "linux-x64".to_string(),
            platform_type: Some("linux".to_string()),
        }
    }

    fn make_api() -> (
        Arc<EditorApi>,
        DeviceRegistry,
        tokio::sync::mpsc::UnboundedReceiver<crate::protocol::Envelope>,
    ) {
        let registry = DeviceRegistry::new();
        let (outbound, rx) = outbound_channel();
        let api = EditorApi::new(
            registry.watcher(),
            Arc::new(RecordingHost),
            EventSender::new(EditorApi::API_NAME, outbound),
        );
        (api, registry, rx)
    }

    #[tokio::test]
    async fn check_available_always_succeeds() {
        let (api, _registry, _events) = make_api();
        let result = api.handle_request("checkAvailable", Value::Null).await.unwrap();
        assert_eq!(result, json!(true));
    }

    #[tokio::test]
    async fn get_selected_device_is_null_then_snapshot() {
        let (api, registry, _events) = make_api();
        let result = api
            .handle_request("getSelectedDevice", Value::Null)
            .await
            .unwrap();
        assert_eq!(result, Value::Null);

        registry.select(Some(desktop_device()));
        let result = api
            .handle_request("getSelectedDevice", Value::Null)
            .await
            .unwrap();
        assert_eq!(result["id"], json!("linux"));
        assert_eq!(result["platformType"], json!("linux"));
    }

    #[tokio::test]
    async fn execute_command_passes_arguments_through() {
        let (api, _registry, _events) = make_api();
        let result = api
            .handle_request(
                "executeCommand",
                json!({ "command": "workbench.action.reload", "arguments": [1, "two"] }),
            )
            .await
            .unwrap();
        assert_eq!(result["ran"], json!("workbench.action.reload"));
        assert_eq!(result["args"], json!([1, "two"]));
    }

    #[tokio::test]
    async fn execute_command_rejects_malformed_params() {
        let (api, _registry, _events) = make_api();
        let err = api
            .handle_request("executeCommand", json!({ "arguments": [] }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid type"));
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let (api, _registry, _events) = make_api();
        let err = api.handle_request("restart", Value::Null).await.unwrap_err();
        assert!(err.to_string().starts_with("METHOD_NOT_FOUND:"));
    }

    #[tokio::test]
    async fn device_change_emits_selected_device_changed_event() {
        let registry = DeviceRegistry::new();
        let (outbound, mut rx) = outbound_channel();
        let api = EditorApi::new(
            registry.watcher(),
            Arc::new(RecordingHost),
            EventSender::new(EditorApi::API_NAME, outbound),
        );

        registry.select(Some(desktop_device()));
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open");
        assert_eq!(
            event.method.as_deref(),
            Some("editor.selectedDeviceChanged")
        );
        assert_eq!(event.params.unwrap()["device"]["id"], json!("linux"));
        assert!(event.id.is_none());

        // After disposal the pump is gone; further changes emit nothing.
        api.dispose();
        registry.select(None);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
