//! # Connection Supervisor
//!
//! Keeps a TCP connection to a device open: connects, hands the stream to a
//! session handler and reconnects with exponential backoff whenever the
//! session ends or the connection attempt fails.

use std::future::Future;
use std::time::Duration;

use qualisys_common::network::{ConnectionRegistration, ConnectionState, ConnectionUrl};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::network::tcp;

const MAX_JITTER_MS: u64 = 250;

#[derive(Debug, Clone, Copy)]
pub struct SupervisorOptions {
    pub connect_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Runs `handler` on every successful connection to `url` until `shutdown`
/// is cancelled.
///
/// The registration is kept in sync with the connection state. A session
/// that was connected resets the backoff.
pub async fn supervise<F, Fut>(
    url: &ConnectionUrl,
    registration: &ConnectionRegistration,
    shutdown: CancellationToken,
    options: SupervisorOptions,
    mut handler: F,
) where
    F: FnMut(TcpStream) -> Fut,
    Fut: Future<Output = ()>,
{
    let name: &str = registration.name();
    let mut backoff: Duration = options.initial_backoff;

    while !shutdown.is_cancelled() {
        registration.set_state(ConnectionState::Connecting);

        let connected = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = tcp::connect(url, options.connect_timeout) => result,
        };

        match connected {
            Ok(stream) => {
                registration.set_state(ConnectionState::Connected);
                backoff = options.initial_backoff;

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = handler(stream) => {}
                }
            }
            Err(e) => {
                warn!("{name}: failed to connect to {url}: {e}");
            }
        }

        registration.set_state(ConnectionState::Disconnected);

        let delay: Duration = with_jitter(backoff);
        debug!("{name}: reconnecting to {url} in {:.2}s", delay.as_secs_f64());
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(delay) => {}
        }
        backoff = (backoff * 2).min(options.max_backoff);
    }

    registration.set_state(ConnectionState::Disconnected);
}

fn with_jitter(delay: Duration) -> Duration {
    let jitter: u64 = rand::random_range(0..=MAX_JITTER_MS);
    delay + Duration::from_millis(jitter)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
