use thiserror::Error;

/// Errors raised while encoding, decoding or interpreting QTM RT packets.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid message length received: {0}")]
    InvalidLength(u32),

    #[error("Message too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Unknown packet type: {0}")]
    UnknownPacketType(u32),

    #[error("Truncated {what}: needed {needed} bytes, got {available}")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Expected a {expected} packet, got {actual}")]
    UnexpectedPacket {
        expected: &'static str,
        actual: &'static str,
    },

    /// An error packet sent by QTM itself.
    #[error("{0}")]
    Qtm(String),

    #[error("Malformed parameters XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Parameters XML is not valid UTF-8")]
    XmlEncoding(#[from] std::str::Utf8Error),
}
