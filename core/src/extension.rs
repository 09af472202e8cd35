//! # Qualisys Extension
//!
//! Connects to Qualisys Track Manager, waits for rigid bodies to be defined,
//! streams their 6DOF poses and posts them to the host's motion capture API.
//!
//! The connection is supervised: whenever a session ends (QTM closed the
//! connection, the rigid body setup changed, a protocol error occurred) a new
//! connection is attempted after a backoff delay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use qualisys_common::config::ExtensionEntry;
use qualisys_common::mocap::{MOTION_CAPTURE_API, MotionCaptureSink};
use qualisys_common::network::{ConnectionPurpose, ConnectionUrl};
use qualisys_plugins::{
    Extension, ExtensionContext, ExtensionManifest, ExtensionRegistry, PluginError,
};
use qualisys_protocols::{PROTOCOL_VERSION, RigidBody6D};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::ConnectionError;
use crate::mocap::build_frame;
use crate::qtm::{FrameStream, QtmConnection};
use crate::supervisor::{SupervisorOptions, supervise};

pub const EXTENSION_NAME: &str = "qualisys";

const CONNECTION_DESCRIPTION: &str = "Qualisys QTM-RT connection";
const BANNER_TIMEOUT: Duration = Duration::from_secs(1);
const BODY_POLL_INTERVAL: Duration = Duration::from_secs(1);
const STREAM_ARGS: &[&str] = &["AllFrames", "6D"];

#[derive(Debug, Default, Deserialize)]
struct QualisysConfig {
    #[serde(default)]
    connection: ConnectionUrl,
}

/// Registration metadata of the `qualisys` extension.
pub fn manifest() -> ExtensionManifest {
    ExtensionManifest::new(EXTENSION_NAME, "Connection to Qualisys motion capture systems")
        .with_dependencies(&[MOTION_CAPTURE_API])
        .with_tags(&["experimental"])
        .with_schema(json!({
            "properties": {
                "connection": {
                    "type": "string",
                    "title": "Connection URL",
                    "description": "Use tcp://hostname:22223 to connect to Qualisys Track Manager running on the given host with the given base port.",
                    "default": "tcp://localhost:22223"
                }
            }
        }))
}

/// Adds the `qualisys` extension to the registry.
pub fn register(registry: &mut ExtensionRegistry) -> Result<(), PluginError> {
    registry.register(EXTENSION_NAME, || {
        Arc::new(QualisysMocapExtension::default()) as Arc<dyn Extension>
    })
}

#[derive(Debug, Default)]
pub struct QualisysMocapExtension {
    options: SupervisorOptions,
}

impl QualisysMocapExtension {
    pub fn with_options(options: SupervisorOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Extension for QualisysMocapExtension {
    fn manifest(&self) -> ExtensionManifest {
        manifest()
    }

    async fn run(&self, ctx: ExtensionContext, config: &ExtensionEntry) -> anyhow::Result<()> {
        let settings: QualisysConfig = config.parse(EXTENSION_NAME)?;
        let url: ConnectionUrl = settings.connection;

        let registration =
            ctx.connections
                .register(EXTENSION_NAME, CONNECTION_DESCRIPTION, ConnectionPurpose::Mocap)?;

        info!("Using Qualisys Track Manager at {url}");

        let sink: Arc<dyn MotionCaptureSink> = ctx.motion_capture.clone();
        supervise(&url, &registration, ctx.shutdown.clone(), self.options, |stream| {
            let sink = sink.clone();
            async move { handle_qtm_connection(stream, sink.as_ref()).await }
        })
        .await;

        Ok(())
    }
}

/// Runs one session on an established connection to QTM.
pub async fn handle_qtm_connection<S>(stream: S, sink: &dyn MotionCaptureSink)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    info!("Connected to Qualisys Track Manager.");

    let conn = QtmConnection::new(stream);
    if let Err(e) = run_session(&conn, sink).await {
        match e.qtm_message() {
            Some(message) => error!("QTM returned unexpected error: {message}"),
            None => error!("{e}"),
        }
    }

    info!("Connection to QTM closed.");
    if let Err(e) = conn.close().await {
        debug!("Error while closing connection to QTM: {e}");
    }
}

async fn run_session<S>(
    conn: &QtmConnection<S>,
    sink: &dyn MotionCaptureSink,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    if !conn.wait_for_banner(BANNER_TIMEOUT).await? {
        warn!("QTM did not send the expected welcome message");
        return Ok(());
    }

    conn.switch_to_version(PROTOCOL_VERSION).await?;

    let bodies: Vec<String> = wait_for_rigid_bodies(conn).await?;

    // TODO: poll GetParameters periodically while streaming so that a changed
    // rigid body setup is picked up without waiting for a count mismatch
    info!("Found {} rigid bodies, streaming frames", bodies.len());
    let result = stream_frames(conn, &bodies, sink).await;
    info!("Streaming terminated.");

    result
}

async fn wait_for_rigid_bodies<S>(conn: &QtmConnection<S>) -> Result<Vec<String>, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    loop {
        let bodies: Vec<String> = conn.get_body_names().await?;
        if !bodies.is_empty() {
            return Ok(bodies);
        }
        debug!("No rigid bodies defined in QTM yet");
        sleep(BODY_POLL_INTERVAL).await;
    }
}

async fn stream_frames<S>(
    conn: &QtmConnection<S>,
    names: &[String],
    sink: &dyn MotionCaptureSink,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut stream = conn.stream_frames(STREAM_ARGS).await?;
    let forwarded = forward_frames(&mut stream, names, sink).await;
    let closed = stream.close().await;
    forwarded.and(closed)
}

async fn forward_frames<S>(
    stream: &mut FrameStream<'_, S>,
    names: &[String],
    sink: &dyn MotionCaptureSink,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    while let Some(packet) = stream.next().await? {
        let bodies: Vec<RigidBody6D> = packet.six_d()?.map(|(_, bodies)| bodies).unwrap_or_default();

        if bodies.len() != names.len() {
            // the supervisor reconnects and picks up the new setup
            warn!(
                "Expected {} rigid bodies in frame, got {}, terminating stream",
                names.len(),
                bodies.len()
            );
            return Ok(());
        }

        sink.enqueue_frame(build_frame(names, packet.frame_number, &bodies));
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
