//! Integration tests for the loopback WebSocket transport.
//!
//! Spins up a real server on an OS-assigned port and talks to it with a
//! WebSocket client, one router per connection.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use inspectord::api::device::{DeviceRegistry, DeviceSnapshot};
use inspectord::api::editor::{CommandHost, EditorApi};
use inspectord::api::{EventSender, ToolApi};
use inspectord::protocol::{self, Envelope};
use inspectord::transport::socket::{ApiFactory, SocketServer};

struct EchoCommandHost;

#[async_trait]
impl CommandHost for EchoCommandHost {
    async fn execute(&self, command: &str, arguments: Value) -> Result<Value> {
        Ok(json!({ "command": command, "arguments": arguments }))
    }
}

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Start a server on a random port; returns its URL, the device feed, and
/// the shutdown token.
async fn start_server() -> (String, Arc<DeviceRegistry>, CancellationToken) {
    let devices = Arc::new(DeviceRegistry::new());
    let apis: ApiFactory = {
        let devices = Arc::clone(&devices);
        Arc::new(move |outbound| {
            let events = EventSender::new(EditorApi::API_NAME, outbound.clone());
            let editor: Arc<dyn ToolApi> =
                EditorApi::new(devices.watcher(), Arc::new(EchoCommandHost), events);
            vec![editor]
        })
    };

    let server = SocketServer::bind("127.0.0.1", 0).await.expect("bind");
    let url = format!("ws://{}", server.local_addr());
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        server.serve(apis, token).await.ok();
    });

    (url, devices, shutdown)
}

async fn connect(url: &str) -> Client {
    let (ws, _) = connect_async(url).await.expect("connect");
    ws
}

async fn send(client: &mut Client, envelope: Envelope) {
    let text = serde_json::to_string(&envelope).unwrap();
    client.send(Message::Text(text)).await.expect("send");
}

async fn recv(client: &mut Client) -> Envelope {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("frame within timeout")
            .expect("connection open")
            .expect("frame ok");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("valid envelope");
        }
    }
}

#[tokio::test]
async fn check_available_round_trips() {
    let (url, _devices, _shutdown) = start_server().await;
    let mut client = connect(&url).await;

    send(
        &mut client,
        Envelope::request(json!(1), "editor.checkAvailable", json!({})),
    )
    .await;
    let resp = recv(&mut client).await;
    assert_eq!(resp.jsonrpc.as_deref(), Some("2.0"));
    assert_eq!(resp.id, Some(json!(1)));
    assert_eq!(resp.result, Some(json!(true)));
}

#[tokio::test]
async fn selected_device_is_null_until_the_host_selects_one() {
    let (url, devices, _shutdown) = start_server().await;
    let mut client = connect(&url).await;

    send(
        &mut client,
        Envelope::request(json!(1), "editor.getSelectedDevice", json!({})),
    )
    .await;
    let resp = recv(&mut client).await;
    assert_eq!(resp.result, Some(Value::Null));

    devices.select(Some(DeviceSnapshot {
        category: Some("mobile".to_string()),
        emulator: true,
        ephemeral: false,
        id: "emu-1".to_string(),
        name: "Emulator".to_string(),
        platform: "android-x64".to_string(),
        platform_type: Some("android".to_string()),
    }));

    // The change reaches the surface as an unsolicited event.
    let event = recv(&mut client).await;
    assert_eq!(
        event.method.as_deref(),
        Some("editor.selectedDeviceChanged")
    );
    assert_eq!(event.params.unwrap()["device"]["id"], json!("emu-1"));

    send(
        &mut client,
        Envelope::request(json!(2), "editor.getSelectedDevice", json!({})),
    )
    .await;
    let resp = recv(&mut client).await;
    assert_eq!(resp.result.unwrap()["id"], json!("emu-1"));
}

#[tokio::test]
async fn execute_command_forwards_verbatim() {
    let (url, _devices, _shutdown) = start_server().await;
    let mut client = connect(&url).await;

    send(
        &mut client,
        Envelope::request(
            json!("cmd-1"),
            "editor.executeCommand",
            json!({ "command": "app.hotReload", "arguments": {"force": false} }),
        ),
    )
    .await;
    let resp = recv(&mut client).await;
    let result = resp.result.expect("result");
    assert_eq!(result["command"], json!("app.hotReload"));
    assert_eq!(result["arguments"]["force"], json!(false));
}

#[tokio::test]
async fn malformed_frame_gets_a_parse_error() {
    let (url, _devices, _shutdown) = start_server().await;
    let mut client = connect(&url).await;

    client
        .send(Message::Text("{not json".to_string()))
        .await
        .expect("send");
    let resp = recv(&mut client).await;
    let err = resp.error.expect("error response");
    assert_eq!(err.code, protocol::PARSE_ERROR);
    assert_eq!(resp.id, Some(Value::Null));

    // The connection survives the bad frame.
    send(
        &mut client,
        Envelope::request(json!(5), "editor.checkAvailable", json!({})),
    )
    .await;
    let resp = recv(&mut client).await;
    assert_eq!(resp.id, Some(json!(5)));
}

#[tokio::test]
async fn connections_have_independent_routers() {
    let (url, _devices, _shutdown) = start_server().await;
    let mut first = connect(&url).await;
    let mut second = connect(&url).await;

    // Closing one connection must not affect the other.
    first.close(None).await.expect("close");
    tokio::time::sleep(Duration::from_millis(50)).await;

    send(
        &mut second,
        Envelope::request(json!(1), "editor.checkAvailable", json!({})),
    )
    .await;
    let resp = recv(&mut second).await;
    assert_eq!(resp.result, Some(json!(true)));
}

#[tokio::test]
async fn unknown_api_over_socket_is_an_error_response() {
    let (url, _devices, _shutdown) = start_server().await;
    let mut client = connect(&url).await;

    send(
        &mut client,
        Envelope::request(json!(7), "devtools.open", json!({})),
    )
    .await;
    let resp = recv(&mut client).await;
    let err = resp.error.expect("error response");
    assert_eq!(err.code, protocol::UNKNOWN_API);
    assert!(err.message.contains("devtools"));
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let (url, _devices, shutdown) = start_server().await;
    shutdown.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(connect_async(url.as_str()).await.is_err());
}
