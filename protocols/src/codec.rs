//! Length-prefixed framing of QTM RT messages.
//!
//! Every frame starts with an 8-byte little-endian header: the total frame
//! size (header included) followed by the packet type.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ProtocolError;
use crate::packet::Message;

pub const HEADER_LEN: usize = 8;

const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

pub struct MessageCodec;

impl MessageCodec {
    /// Appends the encoded form of `message` to `buf`.
    pub fn encode(message: &Message, buf: &mut BytesMut) {
        let total_len: usize = HEADER_LEN + message.body.len();
        buf.reserve(total_len);
        buf.put_u32_le(total_len as u32);
        buf.put_u32_le(message.packet_type.as_u32());
        buf.put_slice(&message.body);
    }

    pub fn encode_to_vec(message: &Message) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + message.body.len());
        Self::encode(message, &mut buf);
        buf.to_vec()
    }

    /// Decodes the next complete message from the front of `buf`.
    ///
    /// Returns `Ok(None)` until enough bytes are buffered. Zero-length
    /// frames are consumed and skipped.
    pub fn decode_stream(buf: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        loop {
            if buf.len() < HEADER_LEN {
                return Ok(None);
            }

            let frame_len: u32 = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
            let total_len: usize = frame_len as usize;

            if total_len < HEADER_LEN {
                return Err(ProtocolError::InvalidLength(frame_len));
            }
            if total_len > MAX_FRAME_LEN {
                return Err(ProtocolError::TooLarge {
                    size: total_len,
                    max: MAX_FRAME_LEN,
                });
            }

            if total_len == HEADER_LEN {
                buf.advance(HEADER_LEN);
                continue;
            }

            if buf.len() < total_len {
                buf.reserve(total_len - buf.len());
                return Ok(None);
            }

            let packet_type: u32 = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
            buf.advance(HEADER_LEN);
            let body = buf.split_to(total_len - HEADER_LEN).freeze();

            return Message::from_type_and_body(packet_type, body).map(Some);
        }
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
