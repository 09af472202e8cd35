//! # Data Packet Decoding
//!
//! A data packet carries one captured frame: a timestamp, the frame number
//! and a list of components. Only the 6DOF rigid-body components are
//! decoded; every other component is skipped using its size field.

use bytes::Bytes;

use crate::error::ProtocolError;

const DATA_HEADER_LEN: usize = 16;
const COMPONENT_HEADER_LEN: usize = 8;
const SIX_D_HEADER_LEN: usize = 8;
const SIX_D_BODY_LEN: usize = 12 * 4;
const SIX_D_RESIDUAL_BODY_LEN: usize = 13 * 4;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    ThreeD = 1,
    ThreeDNoLabels = 2,
    Analog = 3,
    Force = 4,
    SixD = 5,
    SixDEuler = 6,
    TwoD = 7,
    TwoDLinearized = 8,
    ThreeDResidual = 9,
    ThreeDNoLabelsResidual = 10,
    SixDResidual = 11,
    SixDEulerResidual = 12,
    AnalogSingle = 13,
    Image = 14,
    ForceSingle = 15,
    GazeVector = 16,
    Timecode = 17,
    Skeleton = 18,
    EyeTracker = 19,
}

impl ComponentType {
    pub fn from_u32(value: u32) -> Option<Self> {
        use ComponentType::*;
        let component = match value {
            1 => ThreeD,
            2 => ThreeDNoLabels,
            3 => Analog,
            4 => Force,
            5 => SixD,
            6 => SixDEuler,
            7 => TwoD,
            8 => TwoDLinearized,
            9 => ThreeDResidual,
            10 => ThreeDNoLabelsResidual,
            11 => SixDResidual,
            12 => SixDEulerResidual,
            13 => AnalogSingle,
            14 => Image,
            15 => ForceSingle,
            16 => GazeVector,
            17 => Timecode,
            18 => Skeleton,
            19 => EyeTracker,
            _ => return None,
        };
        Some(component)
    }
}

/// Header of a 6D component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SixDInfo {
    pub body_count: u32,
    pub drop_rate_2d: u16,
    pub out_of_sync_rate_2d: u16,
}

/// Position of a rigid body in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl BodyPosition {
    /// QTM reports untracked bodies with NaN coordinates.
    pub fn is_tracked(&self) -> bool {
        !(self.x.is_nan() || self.y.is_nan() || self.z.is_nan())
    }
}

/// Orientation of a rigid body as a 3x3 rotation matrix, column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyRotation {
    pub matrix: [f32; 9],
}

impl BodyRotation {
    /// Element at `row`, `col`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.matrix[col * 3 + row]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody6D {
    pub position: BodyPosition,
    pub rotation: BodyRotation,
    pub residual: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct Component {
    pub component_type: Option<ComponentType>,
    pub raw_type: u32,
    pub payload: Bytes,
}

#[derive(Debug, Clone)]
pub struct DataPacket {
    pub timestamp: u64,
    pub frame_number: u32,
    pub components: Vec<Component>,
}

impl DataPacket {
    pub fn parse(body: &Bytes) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(body, "data packet");
        let timestamp: u64 = reader.u64()?;
        let frame_number: u32 = reader.u32()?;
        let component_count: u32 = reader.u32()?;

        let mut components = Vec::with_capacity(component_count.min(32) as usize);
        for _ in 0..component_count {
            let size: usize = reader.u32()? as usize;
            let raw_type: u32 = reader.u32()?;
            if size < COMPONENT_HEADER_LEN {
                return Err(ProtocolError::Truncated {
                    what: "component",
                    needed: COMPONENT_HEADER_LEN,
                    available: size,
                });
            }
            let payload = reader.bytes(size - COMPONENT_HEADER_LEN)?;
            components.push(Component {
                component_type: ComponentType::from_u32(raw_type),
                raw_type,
                payload,
            });
        }

        Ok(Self {
            timestamp,
            frame_number,
            components,
        })
    }

    pub fn component(&self, component_type: ComponentType) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.component_type == Some(component_type))
    }

    /// Decodes the 6D component of the packet, falling back to the 6D
    /// residual component.
    pub fn six_d(&self) -> Result<Option<(SixDInfo, Vec<RigidBody6D>)>, ProtocolError> {
        if let Some(component) = self.component(ComponentType::SixD) {
            return parse_six_d(&component.payload, false).map(Some);
        }

        match self.component(ComponentType::SixDResidual) {
            Some(component) => parse_six_d(&component.payload, true).map(Some),
            None => Ok(None),
        }
    }
}

fn parse_six_d(
    payload: &Bytes,
    with_residual: bool,
) -> Result<(SixDInfo, Vec<RigidBody6D>), ProtocolError> {
    let mut reader = Reader::new(payload, "6D component");
    let info = SixDInfo {
        body_count: reader.u32()?,
        drop_rate_2d: reader.u16()?,
        out_of_sync_rate_2d: reader.u16()?,
    };

    let body_len: usize = if with_residual {
        SIX_D_RESIDUAL_BODY_LEN
    } else {
        SIX_D_BODY_LEN
    };
    let needed: usize = usize::try_from(info.body_count)
        .ok()
        .and_then(|count| body_len.checked_mul(count))
        .and_then(|len| len.checked_add(SIX_D_HEADER_LEN))
        .unwrap_or(usize::MAX);
    if payload.len() < needed {
        return Err(ProtocolError::Truncated {
            what: "6D component",
            needed,
            available: payload.len(),
        });
    }

    let mut bodies: Vec<RigidBody6D> = Vec::with_capacity(info.body_count as usize);
    for _ in 0..info.body_count {
        let position = BodyPosition {
            x: reader.f32()?,
            y: reader.f32()?,
            z: reader.f32()?,
        };
        let mut matrix: [f32; 9] = [0.0; 9];
        for slot in matrix.iter_mut() {
            *slot = reader.f32()?;
        }
        let residual = if with_residual {
            Some(reader.f32()?)
        } else {
            None
        };
        bodies.push(RigidBody6D {
            position,
            rotation: BodyRotation { matrix },
            residual,
        });
    }

    Ok((info, bodies))
}

/// Little-endian cursor over a byte slice.
struct Reader<'a> {
    data: &'a Bytes,
    cursor: usize,
    what: &'static str,
}

impl<'a> Reader<'a> {
    fn new(data: &'a Bytes, what: &'static str) -> Self {
        Self {
            data,
            cursor: 0,
            what,
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let end: usize = self.cursor + N;
        if end > self.data.len() {
            return Err(ProtocolError::Truncated {
                what: self.what,
                needed: end,
                available: self.data.len(),
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.cursor..end]);
        self.cursor = end;
        Ok(out)
    }

    fn bytes(&mut self, len: usize) -> Result<Bytes, ProtocolError> {
        let end: usize = self.cursor + len;
        if end > self.data.len() {
            return Err(ProtocolError::Truncated {
                what: self.what,
                needed: end,
                available: self.data.len(),
            });
        }
        let out = self.data.slice(self.cursor..end);
        self.cursor = end;
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16, ProtocolError> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Result<u64, ProtocolError> {
        self.take::<8>().map(u64::from_le_bytes)
    }

    fn f32(&mut self) -> Result<f32, ProtocolError> {
        self.take::<4>().map(f32::from_le_bytes)
    }
}

/// Builds data packet bodies; used by tests and the fake QTM server.
#[derive(Debug, Default, Clone)]
pub struct DataPacketBuilder {
    timestamp: u64,
    frame_number: u32,
    components: Vec<(u32, Vec<u8>)>,
}

impl DataPacketBuilder {
    pub fn new(timestamp: u64, frame_number: u32) -> Self {
        Self {
            timestamp,
            frame_number,
            components: Vec::new(),
        }
    }

    pub fn raw_component(mut self, raw_type: u32, payload: Vec<u8>) -> Self {
        self.components.push((raw_type, payload));
        self
    }

    /// Adds a 6D component; each body is a position in millimetres and a
    /// column-major rotation matrix.
    pub fn six_d(self, bodies: &[([f32; 3], [f32; 9])]) -> Self {
        let mut payload = Vec::with_capacity(SIX_D_HEADER_LEN + bodies.len() * SIX_D_BODY_LEN);
        payload.extend_from_slice(&(bodies.len() as u32).to_le_bytes());
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.extend_from_slice(&0u16.to_le_bytes());
        for (position, rotation) in bodies {
            for value in position.iter().chain(rotation.iter()) {
                payload.extend_from_slice(&value.to_le_bytes());
            }
        }
        self.raw_component(ComponentType::SixD as u32, payload)
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DATA_HEADER_LEN);
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.frame_number.to_le_bytes());
        out.extend_from_slice(&(self.components.len() as u32).to_le_bytes());
        for (raw_type, payload) in self.components {
            out.extend_from_slice(&((payload.len() + COMPONENT_HEADER_LEN) as u32).to_le_bytes());
            out.extend_from_slice(&raw_type.to_le_bytes());
            out.extend_from_slice(&payload);
        }
        out
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
