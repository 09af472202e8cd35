use bytes::BytesMut;
use qualisys_protocols::{Message, MessageCodec};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ConnectionError;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Sends and receives whole QTM RT messages over a byte stream.
pub struct MessageChannel<S> {
    stream: S,
    buffer: BytesMut,
}

impl<S> MessageChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), ConnectionError> {
        let mut out: BytesMut = BytesMut::new();
        MessageCodec::encode(message, &mut out);
        self.stream.write_all(&out).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Waits for the next complete message.
    ///
    /// Cancel-safe: bytes already read stay buffered for the next call.
    pub async fn receive(&mut self) -> Result<Message, ConnectionError> {
        loop {
            if let Some(message) = MessageCodec::decode_stream(&mut self.buffer)? {
                return Ok(message);
            }

            let read: usize = self.stream.read_buf(&mut self.buffer).await?;
            if read == 0 {
                return Err(ConnectionError::Closed);
            }
        }
    }

    pub async fn shutdown(&mut self) -> Result<(), ConnectionError> {
        self.stream.shutdown().await?;
        Ok(())
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
