use std::time::Duration;

use qualisys_common::network::ConnectionUrl;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::ConnectionError;

/// Opens a TCP connection to `url`, giving up after `connect_timeout`.
pub async fn connect(
    url: &ConnectionUrl,
    connect_timeout: Duration,
) -> Result<TcpStream, ConnectionError> {
    let stream: TcpStream = match timeout(connect_timeout, TcpStream::connect(url.address())).await {
        Ok(result) => result?,
        Err(_elapsed) => return Err(ConnectionError::ConnectTimeout(connect_timeout)),
    };
    stream.set_nodelay(true)?;
    Ok(stream)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
