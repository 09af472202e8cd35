use std::sync::Arc;
use std::time::Duration;

use qualisys_common::config::ServerConfig;
use qualisys_common::mocap::{MOTION_CAPTURE_API, MotionCaptureFrame, MotionCaptureSink};
use qualisys_common::network::{ConnectionRegistry, ConnectionState, ConnectionUrl};
use qualisys_core::{EXTENSION_NAME, QualisysMocapExtension, SupervisorOptions};
use qualisys_plugins::{Extension, ExtensionContext, ExtensionManager, ExtensionRegistry, PluginError};
use qualisys_protocols::Event;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::fake_qtm::{FakeQtm, IDENTITY};

const WAIT: Duration = Duration::from_secs(5);

struct Host {
    connections: Arc<ConnectionRegistry>,
    frames: UnboundedReceiver<MotionCaptureFrame>,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Host {
    async fn next_frame(&mut self) -> MotionCaptureFrame {
        timeout(WAIT, self.frames.recv())
            .await
            .expect("no frame received in time")
            .expect("frame channel closed")
    }

    async fn stop(self) -> Arc<ConnectionRegistry> {
        self.shutdown.cancel();
        timeout(WAIT, self.task)
            .await
            .expect("extension did not stop")
            .unwrap()
            .unwrap();
        self.connections
    }
}

fn fast_options() -> SupervisorOptions {
    SupervisorOptions {
        connect_timeout: Duration::from_secs(1),
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
    }
}

fn registry() -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new();
    registry
        .register(EXTENSION_NAME, || {
            Arc::new(QualisysMocapExtension::with_options(fast_options())) as Arc<dyn Extension>
        })
        .unwrap();
    registry
}

fn config_for(url: &ConnectionUrl) -> ServerConfig {
    ServerConfig::from_json(&format!(
        r#"{{ "extensions": {{ "qualisys": {{ "connection": "{url}" }} }} }}"#
    ))
    .unwrap()
}

fn start_host(url: &ConnectionUrl) -> Host {
    let (tx, frames) = mpsc::unbounded_channel();
    let sink = move |frame: MotionCaptureFrame| {
        let _ = tx.send(frame);
    };

    let connections = ConnectionRegistry::new();
    let shutdown = CancellationToken::new();
    let ctx = ExtensionContext::new(
        connections.clone(),
        Arc::new(sink) as Arc<dyn MotionCaptureSink>,
        shutdown.clone(),
    );

    let config = config_for(url);
    let task = tokio::spawn(async move {
        let manager = ExtensionManager::new(registry()).provide_api(MOTION_CAPTURE_API);
        manager.run(&config, ctx).await
    });

    Host {
        connections,
        frames,
        shutdown,
        task,
    }
}

#[tokio::test]
async fn frames_are_streamed_once_bodies_appear() {
    let qtm = FakeQtm::bind().await.unwrap();
    let mut host = start_host(&qtm.url().unwrap());

    let mut session = qtm.accept().await.unwrap();
    session.accept_version().await.unwrap();
    // no rigid bodies yet, the extension polls again
    session.serve_bodies(&[]).await.unwrap();
    session.serve_bodies(&["cf1", "cf2"]).await.unwrap();
    session.expect_command("StreamFrames AllFrames 6D").await.unwrap();

    session
        .send_frame(1, &[([1000.0, 2000.0, 500.0], IDENTITY), ([f32::NAN; 3], IDENTITY)])
        .await
        .unwrap();
    session.send_event(Event::CameraSettingsChanged).await.unwrap();
    session
        .send_frame(2, &[([0.0, 0.0, 0.0], IDENTITY), ([-500.0, 0.0, 1500.0], IDENTITY)])
        .await
        .unwrap();

    let first = host.next_frame().await;
    assert_eq!(first.frame_number, Some(1));
    let cf1 = first.item("cf1").unwrap();
    assert_eq!(cf1.position.map(|p| (p.x, p.y, p.z)), Some((1.0, 2.0, 0.5)));
    assert_eq!(cf1.attitude.map(|q| q.w), Some(1.0));
    assert!(!first.item("cf2").unwrap().is_tracked());

    let second = host.next_frame().await;
    assert_eq!(second.frame_number, Some(2));
    assert_eq!(second.tracked_count(), 2);
    let cf2 = second.item("cf2").unwrap();
    assert_eq!(cf2.position.map(|p| (p.x, p.y, p.z)), Some((-0.5, 0.0, 1.5)));

    let state = host.connections.get(EXTENSION_NAME).unwrap().state;
    assert_eq!(state, ConnectionState::Connected);

    let connections = host.stop().await;
    assert!(connections.get(EXTENSION_NAME).is_none());
}

#[tokio::test]
async fn changed_body_count_restarts_the_session() {
    let qtm = FakeQtm::bind().await.unwrap();
    let mut host = start_host(&qtm.url().unwrap());

    let mut session = qtm.accept().await.unwrap();
    session.accept_version().await.unwrap();
    session.serve_bodies(&["cf1", "cf2"]).await.unwrap();
    session.expect_command("StreamFrames AllFrames 6D").await.unwrap();
    session
        .send_frame(1, &[([0.0, 0.0, 0.0], IDENTITY), ([0.0, 0.0, 0.0], IDENTITY)])
        .await
        .unwrap();
    session.send_frame(2, &[([0.0, 0.0, 0.0], IDENTITY)]).await.unwrap();

    assert_eq!(host.next_frame().await.frame_number, Some(1));

    session.expect_command("StreamFrames Stop").await.unwrap();
    session.wait_for_close().await;

    let mut session = qtm.accept().await.unwrap();
    session.accept_version().await.unwrap();
    session.serve_bodies(&["cf1"]).await.unwrap();
    session.expect_command("StreamFrames AllFrames 6D").await.unwrap();
    session.send_frame(3, &[([100.0, 0.0, 0.0], IDENTITY)]).await.unwrap();

    let frame = host.next_frame().await;
    assert_eq!(frame.frame_number, Some(3));
    assert_eq!(frame.items.len(), 1);
    assert_eq!(frame.items[0].name, "cf1");

    host.stop().await;
}

#[tokio::test]
async fn qtm_error_leads_to_reconnect() {
    let qtm = FakeQtm::bind().await.unwrap();
    let host = start_host(&qtm.url().unwrap());

    let mut session = qtm.accept().await.unwrap();
    session.expect_command("Version 1.23").await.unwrap();
    session.reply_error("Command not supported").await.unwrap();
    session.wait_for_close().await;

    let mut session = timeout(WAIT, qtm.accept()).await.unwrap().unwrap();
    session.accept_version().await.unwrap();

    host.stop().await;
}

#[tokio::test]
async fn stream_from_file_end_is_followed_by_reconnect() {
    let qtm = FakeQtm::bind().await.unwrap();
    let mut host = start_host(&qtm.url().unwrap());

    let mut session = qtm.accept().await.unwrap();
    session.accept_version().await.unwrap();
    session.serve_bodies(&["cf1"]).await.unwrap();
    session.expect_command("StreamFrames AllFrames 6D").await.unwrap();
    session.send_frame(1, &[([0.0, 0.0, 0.0], IDENTITY)]).await.unwrap();
    session.send_event(Event::RtFromFileStopped).await.unwrap();

    assert_eq!(host.next_frame().await.frame_number, Some(1));
    // no stop command is sent for a stream QTM already ended
    session.expect_close().await.unwrap();

    let session = timeout(WAIT, qtm.accept()).await.unwrap();
    assert!(session.is_ok());

    host.stop().await;
}

#[tokio::test]
async fn unreachable_qtm_keeps_retrying_until_shutdown() {
    let qtm = FakeQtm::bind().await.unwrap();
    let url = qtm.url().unwrap();
    drop(qtm);

    let host = start_host(&url);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let state = host.connections.get(EXTENSION_NAME).map(|entry| entry.state);
    assert!(matches!(
        state,
        Some(ConnectionState::Connecting | ConnectionState::Disconnected)
    ));

    let connections = host.stop().await;
    assert!(connections.get(EXTENSION_NAME).is_none());
}

#[test]
fn extension_requires_the_motion_capture_api() {
    let manager = ExtensionManager::new(registry());
    let config = config_for(&ConnectionUrl::default());

    let err = manager.load(&config).err().unwrap();
    assert_eq!(
        err,
        PluginError::MissingDependency {
            extension: "qualisys".to_string(),
            dependency: "motion_capture".to_string(),
        }
    );
}

#[test]
fn invalid_connection_url_fails_the_extension() {
    let config = ServerConfig::from_json(
        r#"{ "extensions": { "qualisys": { "connection": "http://qtm" } } }"#,
    )
    .unwrap();
    let manager = ExtensionManager::new(registry()).provide_api(MOTION_CAPTURE_API);
    let loaded = manager.load(&config).unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let ctx = ExtensionContext::new(
        ConnectionRegistry::new(),
        Arc::new(|_frame: MotionCaptureFrame| {}) as Arc<dyn MotionCaptureSink>,
        CancellationToken::new(),
    );
    let result = runtime.block_on(loaded[0].extension.run(ctx, &loaded[0].config));
    assert!(result.is_err());
}
