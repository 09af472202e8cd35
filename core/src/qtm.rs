//! # QTM Connection
//!
//! Command/response exchange and frame streaming on top of a
//! [`MessageChannel`]. Only one command may be in flight at a time, so the
//! channel sits behind an async mutex; a running frame stream holds that
//! mutex until it is closed.

use std::time::Duration;

use qualisys_protocols::{BANNER, DataPacket, Event, Message, PacketType, parse_body_names};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::ConnectionError;
use crate::network::channel::MessageChannel;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

pub struct QtmConnection<S> {
    channel: Mutex<MessageChannel<S>>,
    timeout: Duration,
}

impl<S> QtmConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self::with_timeout(stream, DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn with_timeout(stream: S, timeout: Duration) -> Self {
        Self {
            channel: Mutex::new(MessageChannel::new(stream)),
            timeout,
        }
    }

    /// Sends a command and returns its response, using the default timeout.
    pub async fn send_command(
        &self,
        command: &str,
        args: &[&str],
    ) -> Result<Message, ConnectionError> {
        self.send_command_with_timeout(command, args, self.timeout)
            .await
    }

    pub async fn send_command_with_timeout(
        &self,
        command: &str,
        args: &[&str],
        response_timeout: Duration,
    ) -> Result<Message, ConnectionError> {
        let mut channel = self.channel.lock().await;
        exchange(&mut channel, command, args, response_timeout).await
    }

    /// Waits for the welcome message QTM sends right after connecting.
    ///
    /// Returns `false` if nothing arrives within `wait` or the first message
    /// is not the banner.
    pub async fn wait_for_banner(&self, wait: Duration) -> Result<bool, ConnectionError> {
        let mut channel = self.channel.lock().await;
        match timeout(wait, channel.receive()).await {
            Ok(received) => {
                let message: Message = received?;
                Ok(message.is_command() && &message.body[..] == BANNER)
            }
            Err(_elapsed) => Ok(false),
        }
    }

    /// Switches the connection to the given protocol version.
    pub async fn switch_to_version(&self, version: &str) -> Result<(), ConnectionError> {
        let response: Message = self.send_command("Version", &[version]).await?;
        let expected: String = format!("Version set to {version}");

        if !response.is_command() || response.body != expected.as_bytes() {
            return Err(ConnectionError::VersionRejected {
                version: version.to_string(),
                response: response.text(),
            });
        }
        Ok(())
    }

    /// Names of the rigid bodies currently defined in QTM.
    pub async fn get_body_names(&self) -> Result<Vec<String>, ConnectionError> {
        let response: Message = self.send_command("GetParameters", &["6d"]).await?;
        Ok(parse_body_names(&response.body)?)
    }

    /// Starts streaming frames with the given `StreamFrames` arguments.
    ///
    /// The returned stream owns the connection until [`FrameStream::close`]
    /// is called.
    pub async fn stream_frames(&self, args: &[&str]) -> Result<FrameStream<'_, S>, ConnectionError> {
        let mut channel = self.channel.lock().await;
        let first: Message = exchange(&mut channel, "StreamFrames", args, self.timeout).await?;

        Ok(FrameStream {
            channel: Some(channel),
            pending: Some(first),
            ended: false,
        })
    }

    pub async fn close(&self) -> Result<(), ConnectionError> {
        self.channel.lock().await.shutdown().await
    }
}

async fn exchange<S>(
    channel: &mut MessageChannel<S>,
    command: &str,
    args: &[&str],
    response_timeout: Duration,
) -> Result<Message, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    channel.send(&Message::command(command, args)).await?;

    let response = timeout(response_timeout, async {
        loop {
            let message: Message = channel.receive().await?;
            match message.packet_type {
                // events may arrive at any time
                PacketType::Event => {
                    debug!("Ignoring event {:?} while waiting for response", message.event_code());
                }
                // leftovers of a stream that was just stopped
                PacketType::Data | PacketType::NoMoreData => {
                    debug!("Discarding {} packet while waiting for response", message.packet_type.name());
                }
                _ => return Ok::<_, ConnectionError>(message),
            }
        }
    })
    .await
    .map_err(|_elapsed| ConnectionError::Timeout(response_timeout))??;

    Ok(response.check()?)
}

/// A running `StreamFrames` session.
pub struct FrameStream<'a, S> {
    channel: Option<MutexGuard<'a, MessageChannel<S>>>,
    pending: Option<Message>,
    ended: bool,
}

impl<S> FrameStream<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// The next data packet, or `None` once QTM reports the end of the
    /// stream.
    pub async fn next(&mut self) -> Result<Option<DataPacket>, ConnectionError> {
        if self.ended {
            return Ok(None);
        }
        let Some(channel) = self.channel.as_mut() else {
            return Ok(None);
        };

        loop {
            let message: Message = match self.pending.take() {
                Some(message) => message,
                None => channel.receive().await?,
            };

            match message.packet_type {
                PacketType::Data => return Ok(Some(DataPacket::parse(&message.body)?)),
                PacketType::Event if message.event() == Some(Event::RtFromFileStopped) => {
                    debug!("QTM stopped streaming from file");
                    self.ended = true;
                    return Ok(None);
                }
                PacketType::Event => {
                    debug!("Got event {:?} while streaming", message.event_code());
                }
                PacketType::Error => {
                    warn!("Got unexpected error while streaming: {}", message.text());
                }
                other => {
                    warn!("Got unexpected {} message while streaming", other.name());
                }
            }
        }
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Ends the stream, telling QTM to stop unless it already did.
    ///
    /// QTM does not acknowledge the stop command; frames already in flight
    /// are discarded by the next command exchange.
    pub async fn close(mut self) -> Result<(), ConnectionError> {
        let Some(mut channel) = self.channel.take() else {
            return Ok(());
        };
        if self.ended {
            return Ok(());
        }

        self.ended = true;
        channel
            .send(&Message::command("StreamFrames", ["Stop"]))
            .await
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
