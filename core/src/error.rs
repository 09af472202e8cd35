use std::io;
use std::time::Duration;

use qualisys_protocols::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Connection closed by QTM")]
    Closed,

    #[error("Timed out after {0:?} while connecting")]
    ConnectTimeout(Duration),

    #[error("No response from QTM within {0:?}")]
    Timeout(Duration),

    #[error("Failed to set protocol version to {version}: {response}")]
    VersionRejected { version: String, response: String },
}

impl ConnectionError {
    /// The message of an error packet sent by QTM, if this is one.
    pub fn qtm_message(&self) -> Option<&str> {
        match self {
            ConnectionError::Protocol(ProtocolError::Qtm(message)) => Some(message.as_str()),
            _ => None,
        }
    }
}
