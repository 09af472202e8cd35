//! Console consumer of the frames posted by mocap extensions.

use qualisys_common::mocap::{MotionCaptureFrame, MotionCaptureSink};
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{debug, warn};

const FRAME_QUEUE_SIZE: usize = 256;

/// Hands frames to the printer task without blocking the extension.
pub struct ChannelSink {
    tx: Sender<MotionCaptureFrame>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<MotionCaptureFrame>) {
        let (tx, rx) = mpsc::channel(FRAME_QUEUE_SIZE);
        (Self { tx }, rx)
    }
}

impl MotionCaptureSink for ChannelSink {
    fn enqueue_frame(&self, frame: MotionCaptureFrame) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(frame)) => {
                debug!("Frame queue full, dropping frame {:?}", frame.frame_number);
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Prints frames until every sender is gone.
pub async fn print_frames(mut rx: Receiver<MotionCaptureFrame>, json: bool) {
    while let Some(frame) = rx.recv().await {
        if json {
            match serde_json::to_string(&frame) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Failed to serialize frame: {e}"),
            }
        } else {
            debug!("{}", describe(&frame));
        }
    }
}

fn describe(frame: &MotionCaptureFrame) -> String {
    let number: String = frame
        .frame_number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "Frame {}: {}/{} rigid bodies tracked",
        number,
        frame.tracked_count(),
        frame.items.len()
    )
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
