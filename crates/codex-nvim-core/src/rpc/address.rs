//! Address classification
//!
//! Neovim's `v:servername` can be a TCP `host:port`, a Unix domain socket
//! path or a Windows named pipe. The rules below are tried in order and the
//! first match wins; later rules overlap earlier ones, so the order matters.
//!
//! Rule 4 consults the filesystem to tell a socket path containing a colon
//! from a `host:port` string. The answer can change before the connect
//! happens; that race is accepted.

use std::fmt;
use std::path::Path;

use super::client::{RpcError, RpcResult};

const TCP_SCHEME: &str = "tcp://";
const PIPE_PREFIXES: [&str; 2] = [r"\\.\pipe\", r"\.\pipe\"];

/// How to reach an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// TCP socket
    Tcp { host: String, port: u16 },
    /// Unix domain socket or Windows named pipe, path kept verbatim
    LocalSocket { path: String },
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            Transport::LocalSocket { path } => write!(f, "{}", path),
        }
    }
}

/// Classify an address using the real filesystem for rule 4
pub fn parse_address(address: &str) -> RpcResult<Transport> {
    parse_address_with(address, |path| Path::new(path).exists())
}

/// Classify an address with a caller-supplied existence check
pub fn parse_address_with<F>(address: &str, exists: F) -> RpcResult<Transport>
where
    F: Fn(&str) -> bool,
{
    if let Some(host_port) = address.strip_prefix(TCP_SCHEME) {
        let (host, port) = host_port
            .rsplit_once(':')
            .ok_or_else(|| RpcError::InvalidAddress(format!("missing port in {}", address)))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| RpcError::InvalidAddress(format!("invalid port in {}", address)))?;
        return Ok(Transport::Tcp { host: host.to_string(), port });
    }

    if PIPE_PREFIXES.iter().any(|prefix| address.starts_with(prefix)) || is_drive_path(address) {
        return Ok(local(address));
    }

    if let Some((host, port)) = address.rsplit_once(':') {
        if is_all_digits(port) && !exists(address) {
            if let Ok(port) = port.parse::<u16>() {
                return Ok(Transport::Tcp { host: host.to_string(), port });
            }
        }
    }

    Ok(local(address))
}

fn local(address: &str) -> Transport {
    Transport::LocalSocket { path: address.to_string() }
}

/// `X:\...`
fn is_drive_path(address: &str) -> bool {
    matches!(address.as_bytes(), [drive, b':', b'\\', ..] if drive.is_ascii_alphabetic())
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
