//! Conversion of QTM rigid bodies into motion capture frames.

use qualisys_common::mocap::{MotionCaptureFrame, Quaternion, Vec3};
use qualisys_protocols::RigidBody6D;
use qualisys_protocols::data::BodyRotation;

/// QTM reports positions in millimetres.
const MILLIMETRES_PER_METRE: f64 = 1000.0;

/// Item contents for a rigid body whose tracking is temporarily lost.
pub const TRACKING_LOST: (Option<Vec3>, Option<Quaternion>) = (None, None);

/// Builds a frame with one item per body name, pairing names and bodies in
/// order.
pub fn build_frame(names: &[String], frame_number: u32, bodies: &[RigidBody6D]) -> MotionCaptureFrame {
    let mut frame: MotionCaptureFrame = MotionCaptureFrame::new();
    frame.frame_number = Some(frame_number);

    for (name, body) in names.iter().zip(bodies) {
        let (position, attitude) = convert_body(body);
        frame.add_item(name.as_str(), position, attitude);
    }

    frame
}

pub fn convert_body(body: &RigidBody6D) -> (Option<Vec3>, Option<Quaternion>) {
    if !body.position.is_tracked() {
        return TRACKING_LOST;
    }

    let position: Vec3 = Vec3::new(
        f64::from(body.position.x) / MILLIMETRES_PER_METRE,
        f64::from(body.position.y) / MILLIMETRES_PER_METRE,
        f64::from(body.position.z) / MILLIMETRES_PER_METRE,
    );

    (Some(position), attitude_of(&body.rotation))
}

fn attitude_of(rotation: &BodyRotation) -> Option<Quaternion> {
    if rotation.matrix.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut m: [[f64; 3]; 3] = [[0.0; 3]; 3];
    for (row, values) in m.iter_mut().enumerate() {
        for (col, value) in values.iter_mut().enumerate() {
            *value = f64::from(rotation.get(row, col));
        }
    }

    let q: Quaternion = Quaternion::from_rotation_matrix(m);
    q.is_finite().then_some(q)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use qualisys_protocols::data::BodyPosition;

    const IDENTITY: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

    fn body(x: f32, y: f32, z: f32, matrix: [f32; 9]) -> RigidBody6D {
        RigidBody6D {
            position: BodyPosition { x, y, z },
            rotation: BodyRotation { matrix },
            residual: None,
        }
    }

    #[test]
    fn positions_are_converted_to_metres() {
        let (position, attitude) = convert_body(&body(1500.0, -250.0, 0.0, IDENTITY));

        assert_eq!(position, Some(Vec3::new(1.5, -0.25, 0.0)));
        assert_eq!(attitude, Some(Quaternion::IDENTITY));
    }

    #[test]
    fn nan_coordinate_means_tracking_lost() {
        let (position, attitude) = convert_body(&body(1.0, f32::NAN, 1.0, IDENTITY));
        assert_eq!(position, None);
        assert_eq!(attitude, None);
    }

    #[test]
    fn nan_rotation_keeps_position() {
        let (position, attitude) = convert_body(&body(1000.0, 0.0, 0.0, [f32::NAN; 9]));
        assert_eq!(position, Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(attitude, None);
    }

    #[test]
    fn column_major_rotation_is_read_correctly() {
        // 90 degrees about Z; columns are (0,1,0), (-1,0,0), (0,0,1)
        let matrix = [0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let (_, attitude) = convert_body(&body(0.0, 0.0, 0.0, matrix));
        let q = attitude.unwrap();

        assert!(q.z > 0.7 && q.z < 0.71);
        assert!(q.w > 0.7 && q.w < 0.71);
    }

    #[test]
    fn frame_pairs_names_with_bodies() {
        let names = vec!["cf1".to_string(), "cf2".to_string()];
        let bodies = [body(1000.0, 2000.0, 3000.0, IDENTITY), body(f32::NAN, 0.0, 0.0, IDENTITY)];

        let frame = build_frame(&names, 7, &bodies);

        assert_eq!(frame.frame_number, Some(7));
        assert_eq!(frame.items.len(), 2);
        assert_eq!(frame.items[0].name, "cf1");
        assert_eq!(frame.items[0].position, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(frame.items[1].name, "cf2");
        assert!(!frame.items[1].is_tracked());
    }
}
