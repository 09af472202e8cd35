//! # QTM RT Packets
//!
//! Packet types, event codes and the [`Message`] envelope shared by every
//! packet that travels over a QTM RT connection.

use bytes::Bytes;

use crate::error::ProtocolError;

/// The body of the greeting QTM sends as soon as a client connects.
pub const BANNER: &[u8] = b"QTM RT Interface connected";

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Error = 0,
    Command = 1,
    Xml = 2,
    Data = 3,
    NoMoreData = 4,
    C3dFile = 5,
    Event = 6,
    Discover = 7,
    QtmFile = 8,
}

impl PacketType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(PacketType::Error),
            1 => Some(PacketType::Command),
            2 => Some(PacketType::Xml),
            3 => Some(PacketType::Data),
            4 => Some(PacketType::NoMoreData),
            5 => Some(PacketType::C3dFile),
            6 => Some(PacketType::Event),
            7 => Some(PacketType::Discover),
            8 => Some(PacketType::QtmFile),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    pub fn name(&self) -> &'static str {
        match self {
            PacketType::Error => "error",
            PacketType::Command => "command",
            PacketType::Xml => "XML",
            PacketType::Data => "data",
            PacketType::NoMoreData => "no-more-data",
            PacketType::C3dFile => "C3D file",
            PacketType::Event => "event",
            PacketType::Discover => "discover",
            PacketType::QtmFile => "QTM file",
        }
    }

    /// Packets whose body is a NUL-terminated string.
    fn carries_string(&self) -> bool {
        matches!(
            self,
            PacketType::Error | PacketType::Command | PacketType::Xml
        )
    }
}

impl TryFrom<u32> for PacketType {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, ProtocolError> {
        PacketType::from_u32(value).ok_or(ProtocolError::UnknownPacketType(value))
    }
}

/// Event codes carried in the first byte of an event packet.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Connected = 1,
    ConnectionClosed = 2,
    CaptureStarted = 3,
    CaptureStopped = 4,
    CalibrationStarted = 6,
    CalibrationStopped = 7,
    RtFromFileStarted = 8,
    RtFromFileStopped = 9,
    WaitingForTrigger = 10,
    CameraSettingsChanged = 11,
    QtmShuttingDown = 12,
    CaptureSaved = 13,
    ReprocessingStarted = 14,
    ReprocessingStopped = 15,
    Trigger = 16,
}

impl Event {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Event::Connected),
            2 => Some(Event::ConnectionClosed),
            3 => Some(Event::CaptureStarted),
            4 => Some(Event::CaptureStopped),
            6 => Some(Event::CalibrationStarted),
            7 => Some(Event::CalibrationStopped),
            8 => Some(Event::RtFromFileStarted),
            9 => Some(Event::RtFromFileStopped),
            10 => Some(Event::WaitingForTrigger),
            11 => Some(Event::CameraSettingsChanged),
            12 => Some(Event::QtmShuttingDown),
            13 => Some(Event::CaptureSaved),
            14 => Some(Event::ReprocessingStarted),
            15 => Some(Event::ReprocessingStopped),
            16 => Some(Event::Trigger),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// A single message of the QTM RT protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub packet_type: PacketType,
    pub body: Bytes,
}

impl Message {
    pub fn new(packet_type: PacketType, body: impl Into<Bytes>) -> Self {
        Self {
            packet_type,
            body: body.into(),
        }
    }

    /// Builds a command packet; the command and its arguments are joined
    /// with single spaces.
    pub fn command<C, I, A>(command: C, args: I) -> Self
    where
        C: AsRef<[u8]>,
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        let mut body: Vec<u8> = command.as_ref().to_vec();
        for arg in args {
            body.push(b' ');
            body.extend_from_slice(arg.as_ref());
        }
        Self::new(PacketType::Command, body)
    }

    /// Builds a message from the raw type field and body of a frame.
    ///
    /// String packets lose their trailing NUL terminator, if any.
    pub fn from_type_and_body(packet_type: u32, body: Bytes) -> Result<Self, ProtocolError> {
        let packet_type = PacketType::try_from(packet_type)?;
        let body = if packet_type.carries_string() && body.last() == Some(&0) {
            body.slice(..body.len() - 1)
        } else {
            body
        };
        Ok(Self { packet_type, body })
    }

    /// The event code of an event packet, `None` for anything else.
    pub fn event_code(&self) -> Option<u8> {
        match self.packet_type {
            PacketType::Event => self.body.first().copied(),
            _ => None,
        }
    }

    pub fn event(&self) -> Option<Event> {
        self.event_code().and_then(Event::from_u8)
    }

    pub fn is_command(&self) -> bool {
        self.packet_type == PacketType::Command
    }

    pub fn is_error(&self) -> bool {
        self.packet_type == PacketType::Error
    }

    pub fn is_event(&self) -> bool {
        self.packet_type == PacketType::Event
    }

    /// The body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turns an error packet into [`ProtocolError::Qtm`].
    pub fn check(self) -> Result<Self, ProtocolError> {
        if self.is_error() {
            return Err(ProtocolError::Qtm(self.text()));
        }
        Ok(self)
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
