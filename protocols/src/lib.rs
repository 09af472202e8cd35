//! # QTM RT protocol
//!
//! Wire-level pieces of the Qualisys Track Manager real-time protocol:
//! packet envelopes, framing, data packets and the parameter XML.

pub mod codec;
pub mod data;
pub mod error;
pub mod packet;
pub mod params;

pub use codec::MessageCodec;
pub use data::{DataPacket, RigidBody6D, SixDInfo};
pub use error::ProtocolError;
pub use packet::{BANNER, Event, Message, PacketType};
pub use params::parse_body_names;

/// Protocol version negotiated with QTM after the banner.
pub const PROTOCOL_VERSION: &str = "1.23";
