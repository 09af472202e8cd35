//! # Connection URLs
//!
//! Parsing of the `tcp://host:port` strings used in configuration files to
//! point at a Qualisys Track Manager instance.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_QTM_PORT: u16 = 22223;
pub const DEFAULT_CONNECTION_URL: &str = "tcp://localhost:22223";

/// A TCP endpoint given as `tcp://host[:port]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConnectionUrl {
    pub host: String,
    pub port: u16,
}

impl ConnectionUrl {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host and port in a form accepted by `TcpStream::connect`.
    pub fn address(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

impl Default for ConnectionUrl {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_QTM_PORT)
    }
}

impl fmt::Display for ConnectionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "tcp://[{}]:{}", self.host, self.port)
        } else {
            write!(f, "tcp://{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ConnectionUrl {
    type Err = String;

    /// Parses a connection URL.
    ///
    /// Supported formats:
    /// * `tcp://hostname` (port defaults to 22223)
    /// * `tcp://hostname:port`
    /// * `tcp://[ipv6]:port`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s: &str = s.trim();
        let Some((scheme, rest)) = s.split_once("://") else {
            return Err(format!("missing scheme in connection URL: {s}"));
        };

        if !scheme.eq_ignore_ascii_case("tcp") {
            return Err(format!("unsupported connection scheme '{scheme}' in {s}"));
        }

        let authority: &str = rest.trim_end_matches('/');
        if authority.is_empty() {
            return Err(format!("missing host in connection URL: {s}"));
        }

        let (host, port) = split_host_port(authority)?;
        if host.is_empty() {
            return Err(format!("missing host in connection URL: {s}"));
        }

        Ok(Self::new(host, port.unwrap_or(DEFAULT_QTM_PORT)))
    }
}

impl TryFrom<String> for ConnectionUrl {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConnectionUrl> for String {
    fn from(url: ConnectionUrl) -> Self {
        url.to_string()
    }
}

/// Splits `host[:port]`, handling bracketed IPv6 literals.
fn split_host_port(authority: &str) -> Result<(&str, Option<u16>), String> {
    if let Some(bracketed) = authority.strip_prefix('[') {
        let Some((host, after)) = bracketed.split_once(']') else {
            return Err(format!("unterminated IPv6 literal: {authority}"));
        };
        return match after.strip_prefix(':') {
            Some(port) => Ok((host, Some(parse_port(port)?))),
            None if after.is_empty() => Ok((host, None)),
            None => Err(format!("unexpected characters after host: {after}")),
        };
    }

    match authority.rsplit_once(':') {
        Some((host, _)) if host.contains(':') => Err(format!(
            "IPv6 addresses must be enclosed in brackets: {authority}"
        )),
        Some((host, port)) => Ok((host, Some(parse_port(port)?))),
        None => Ok((authority, None)),
    }
}

fn parse_port(port: &str) -> Result<u16, String> {
    port.parse::<u16>()
        .map_err(|e| format!("Invalid port '{port}': {e}"))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
