use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use qualisys_common::config::{Config, ExtensionEntry, ServerConfig};
use qualisys_common::mocap::MOTION_CAPTURE_API;
use qualisys_common::network::{ConnectionRegistry, ConnectionUrl};
use qualisys_core::EXTENSION_NAME;
use qualisys_plugins::{ExtensionContext, ExtensionManager, ExtensionRegistry};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::sink::{ChannelSink, print_frames};
use crate::terminal::print;

const KEY_WIDTH: usize = 10;

pub async fn run(
    config_path: Option<&Path>,
    connection: Option<ConnectionUrl>,
    cfg: &Config,
) -> anyhow::Result<()> {
    let server_config: ServerConfig = prepare_config(config_path, connection)?;
    if cfg.quiet == 0 {
        for (name, entry) in server_config.enabled_extensions() {
            print::aligned_line(name, KEY_WIDTH, Value::Object(entry.settings.clone()));
        }
    }

    let mut registry = ExtensionRegistry::new();
    qualisys_core::register(&mut registry)?;
    let manager: ExtensionManager = ExtensionManager::new(registry).provide_api(MOTION_CAPTURE_API);
    let available: Vec<&str> = manager.registry().names().collect();
    debug!("Available extensions: {}", available.join(", "));

    let (sink, frames) = ChannelSink::new();
    let shutdown: CancellationToken = CancellationToken::new();
    let ctx = ExtensionContext::new(ConnectionRegistry::new(), Arc::new(sink), shutdown.clone());

    let printer = tokio::spawn(print_frames(frames, cfg.json_frames));

    let interrupt: CancellationToken = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, shutting down");
                interrupt.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {e}"),
        }
    });

    // the sink is dropped with the last context clone, which ends the printer
    manager.run(&server_config, ctx).await?;
    printer.await.context("Frame printer panicked")?;

    if cfg.quiet == 0 {
        print::end_of_program();
    }
    Ok(())
}

/// Loads the configuration file, or enables only `qualisys` with its
/// defaults when there is none, and applies the command line override.
fn prepare_config(
    config_path: Option<&Path>,
    connection: Option<ConnectionUrl>,
) -> anyhow::Result<ServerConfig> {
    let mut server_config = match config_path {
        Some(path) => ServerConfig::load(path).context("Failed to load configuration")?,
        None => {
            let mut defaults = ServerConfig::default();
            defaults
                .extensions
                .insert(EXTENSION_NAME.to_string(), ExtensionEntry::default());
            defaults
        }
    };

    if let Some(url) = connection {
        server_config.set_extension_setting(
            EXTENSION_NAME,
            "connection",
            Value::String(url.to_string()),
        );
    }

    Ok(server_config)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
