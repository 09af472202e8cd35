//! # Motion Capture API
//!
//! The frame model that mocap extensions produce and the sink the host
//! offers them for posting frames (the host's `motion_capture` API).

pub mod frame;

pub use frame::{MotionCaptureFrame, MotionCaptureFrameItem, Quaternion, Vec3};

/// Name under which the host exposes the motion capture API.
pub const MOTION_CAPTURE_API: &str = "motion_capture";

/// Receives frames from mocap extensions.
///
/// Implementations must not block; frames arrive at the capture rate.
pub trait MotionCaptureSink: Send + Sync {
    fn enqueue_frame(&self, frame: MotionCaptureFrame);
}

impl<F> MotionCaptureSink for F
where
    F: Fn(MotionCaptureFrame) + Send + Sync,
{
    fn enqueue_frame(&self, frame: MotionCaptureFrame) {
        self(frame)
    }
}
