// SPDX-License-Identifier: MIT
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use inspectord::api::device::DeviceRegistry;
use inspectord::api::editor::{CommandHost, EditorApi};
use inspectord::api::{EventSender, ToolApi};
use inspectord::config::DaemonConfig;
use inspectord::transport::socket::{shutdown_signal, ApiFactory, SocketServer};

#[derive(Parser)]
#[command(
    name = "inspectord",
    about = "Widget inspector host — editor tooling API broker",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Socket transport port (0 = OS-assigned)
    #[arg(long, env = "INSPECTORD_PORT")]
    port: Option<u16>,

    /// Data directory holding config.toml
    #[arg(long, env = "INSPECTORD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "INSPECTORD_LOG")]
    log: Option<String>,

    /// Bind address for the socket transport (default: 127.0.0.1)
    #[arg(long, env = "INSPECTORD_BIND")]
    bind_address: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon server (default when no subcommand given).
    Serve,
}

/// Command facility for standalone socket mode, where no embedding editor is
/// present to execute anything.
struct NoCommandHost;

#[async_trait]
impl CommandHost for NoCommandHost {
    async fn execute(&self, command: &str, _arguments: Value) -> Result<Value> {
        anyhow::bail!("no handler registered for command '{command}'")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Init once — must happen before any tracing calls.
    let log_level = args.log.as_deref().unwrap_or("info").to_owned();
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .compact()
        .init();

    match args.command {
        Some(Command::Serve) | None => run_server(args).await,
    }
}

async fn run_server(args: Args) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "inspectord starting");

    let config = Arc::new(DaemonConfig::new(
        args.port,
        args.data_dir,
        args.log,
        args.bind_address,
    ));
    info!(
        data_dir = %config.data_dir.display(),
        port = config.port,
        "config loaded"
    );

    // Standalone mode: no device is selected until an embedding host feeds
    // the registry, and commands have nowhere to go.
    let devices = Arc::new(DeviceRegistry::new());
    let commands: Arc<dyn CommandHost> = Arc::new(NoCommandHost);

    let apis: ApiFactory = {
        let devices = Arc::clone(&devices);
        Arc::new(move |outbound| {
            let events = EventSender::new(EditorApi::API_NAME, outbound.clone());
            let editor: Arc<dyn ToolApi> =
                EditorApi::new(devices.watcher(), Arc::clone(&commands), events);
            vec![editor]
        })
    };

    let server = SocketServer::bind(&config.bind_address, config.port).await?;
    info!(addr = %server.local_addr(), "socket transport ready");

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    server.serve(apis, shutdown).await
}
