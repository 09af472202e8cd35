use std::sync::Arc;

use qualisys_common::mocap::MotionCaptureSink;
use qualisys_common::network::ConnectionRegistry;
use tokio_util::sync::CancellationToken;

/// Services the host hands to every running extension.
#[derive(Clone)]
pub struct ExtensionContext {
    pub connections: Arc<ConnectionRegistry>,
    pub motion_capture: Arc<dyn MotionCaptureSink>,
    /// Cancelled when the host shuts down.
    pub shutdown: CancellationToken,
}

impl ExtensionContext {
    pub fn new(
        connections: Arc<ConnectionRegistry>,
        motion_capture: Arc<dyn MotionCaptureSink>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            connections,
            motion_capture,
            shutdown,
        }
    }
}
