use std::time::SystemTime;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Unit quaternion in `(w, x, y, z)` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Converts a rotation matrix given as `m[row][col]`.
    pub fn from_rotation_matrix(m: [[f64; 3]; 3]) -> Self {
        let trace = m[0][0] + m[1][1] + m[2][2];

        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new(
                0.25 * s,
                (m[2][1] - m[1][2]) / s,
                (m[0][2] - m[2][0]) / s,
                (m[1][0] - m[0][1]) / s,
            )
        } else if m[0][0] > m[1][1] && m[0][0] > m[2][2] {
            let s = (1.0 + m[0][0] - m[1][1] - m[2][2]).sqrt() * 2.0;
            Self::new(
                (m[2][1] - m[1][2]) / s,
                0.25 * s,
                (m[0][1] + m[1][0]) / s,
                (m[0][2] + m[2][0]) / s,
            )
        } else if m[1][1] > m[2][2] {
            let s = (1.0 + m[1][1] - m[0][0] - m[2][2]).sqrt() * 2.0;
            Self::new(
                (m[0][2] - m[2][0]) / s,
                (m[0][1] + m[1][0]) / s,
                0.25 * s,
                (m[1][2] + m[2][1]) / s,
            )
        } else {
            let s = (1.0 + m[2][2] - m[0][0] - m[1][1]).sqrt() * 2.0;
            Self::new(
                (m[1][0] - m[0][1]) / s,
                (m[0][2] + m[2][0]) / s,
                (m[1][2] + m[2][1]) / s,
                0.25 * s,
            )
        };

        // keep the scalar part non-negative
        if q.w < 0.0 {
            Self::new(-q.w, -q.x, -q.y, -q.z)
        } else {
            q
        }
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One tracked object in a frame. Both fields are `None` while tracking is
/// lost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionCaptureFrameItem {
    pub name: String,
    pub position: Option<Vec3>,
    pub attitude: Option<Quaternion>,
}

impl MotionCaptureFrameItem {
    pub fn is_tracked(&self) -> bool {
        self.position.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionCaptureFrame {
    pub timestamp: SystemTime,
    pub frame_number: Option<u32>,
    pub items: Vec<MotionCaptureFrameItem>,
}

impl MotionCaptureFrame {
    pub fn new() -> Self {
        Self::with_timestamp(SystemTime::now())
    }

    pub fn with_timestamp(timestamp: SystemTime) -> Self {
        Self {
            timestamp,
            frame_number: None,
            items: Vec::new(),
        }
    }

    pub fn add_item(
        &mut self,
        name: impl Into<String>,
        position: Option<Vec3>,
        attitude: Option<Quaternion>,
    ) {
        self.items.push(MotionCaptureFrameItem {
            name: name.into(),
            position,
            attitude,
        });
    }

    pub fn item(&self, name: &str) -> Option<&MotionCaptureFrameItem> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn tracked_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_tracked()).count()
    }
}

impl Default for MotionCaptureFrame {
    fn default() -> Self {
        Self::new()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
