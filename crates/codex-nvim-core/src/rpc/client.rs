//! msgpack-rpc session with a Neovim instance
//!
//! Neovim speaks msgpack-rpc over whatever socket `--listen` created:
//! - request:      `[0, msgid, method, params]`
//! - response:     `[1, msgid, error, result]`
//! - notification: `[2, method, params]`
//!
//! The bridge only needs `nvim_exec_lua`. One connection is kept for the
//! process lifetime and every request/response exchange holds its lock, so
//! concurrent callers never interleave bytes on the wire.
//!
//! A request can be bounded with a read timeout. Timing out before any byte
//! of a reply arrived leaves the stream in sync: the late reply is skipped by
//! msgid on the next exchange. Failing halfway through a message leaves the
//! stream unusable, so the session is marked broken and later requests fail
//! fast.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(windows)]
use std::fs::OpenOptions;

use parking_lot::Mutex;
use rmpv::Value as MsgValue;
use serde_json::Value;
use thiserror::Error;

use super::address::Transport;
use super::codec::{from_msgpack, to_msgpack};
use crate::log_debug;
use crate::logging::SharedLogger;

const REQUEST: u64 = 0;
const RESPONSE: u64 = 1;
const NOTIFICATION: u64 = 2;

/// Errors that can occur during RPC operations
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("No Neovim instance found in registry")]
    NoInstanceAvailable,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Codec(String),

    #[error("Neovim error: {0}")]
    Remote(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {} ms waiting for Neovim", .0.as_millis())]
    Timeout(Duration),

    #[error("Connection to Neovim lost: {0}")]
    Broken(String),
}

impl From<rmpv::encode::Error> for RpcError {
    fn from(e: rmpv::encode::Error) -> Self {
        RpcError::Codec(e.to_string())
    }
}

impl From<rmpv::decode::Error> for RpcError {
    fn from(e: rmpv::decode::Error) -> Self {
        RpcError::Codec(e.to_string())
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

/// "Evaluate remote expression, return value"
///
/// Implemented by `NvimSession`; tests substitute scripted sessions.
pub trait Session: Send + Sync {
    /// Run a Lua chunk in the remote instance; `args` are visible as `...`
    fn exec_lua(&self, code: &str, args: Vec<Value>) -> RpcResult<Value>;

    /// Like `exec_lua`, failing with `RpcError::Timeout` once `limit` passes
    /// without a reply
    fn exec_lua_within(&self, code: &str, args: Vec<Value>, _limit: Duration) -> RpcResult<Value> {
        self.exec_lua(code, args)
    }
}

/// Handle kept only to adjust socket timeouts
enum Socket {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
    /// Named pipes opened as files have no timeouts
    #[allow(dead_code)]
    Untimed,
}

impl Socket {
    fn set_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Socket::Tcp(stream) => {
                stream.set_read_timeout(timeout)?;
                stream.set_write_timeout(timeout)
            }
            #[cfg(unix)]
            Socket::Unix(stream) => {
                stream.set_read_timeout(timeout)?;
                stream.set_write_timeout(timeout)
            }
            Socket::Untimed => Ok(()),
        }
    }
}

struct Connection {
    socket: Socket,
    reader: BufReader<Box<dyn Read + Send>>,
    writer: BufWriter<Box<dyn Write + Send>>,
}

/// A live msgpack-rpc connection to one Neovim instance
pub struct NvimSession {
    transport: Transport,
    request_id: AtomicU32,
    connection: Mutex<Connection>,
    broken: AtomicBool,
    logger: SharedLogger,
}

impl NvimSession {
    /// Open a connection over the given transport
    pub fn connect(transport: &Transport, logger: SharedLogger) -> RpcResult<Self> {
        let (socket, reader, writer) = open_stream(transport)
            .map_err(|e| RpcError::ConnectionFailed(e.to_string()))?;

        log_debug!(logger, "Connected to {}", transport);

        Ok(Self {
            transport: transport.clone(),
            request_id: AtomicU32::new(0),
            connection: Mutex::new(Connection {
                socket,
                reader: BufReader::new(reader),
                writer: BufWriter::new(writer),
            }),
            broken: AtomicBool::new(false),
            logger,
        })
    }

    /// Whether a failed exchange left the stream unusable
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::SeqCst)
    }

    /// Issue one request and wait for its response
    ///
    /// `timeout` bounds both the write and every wait for reply bytes;
    /// `None` waits indefinitely.
    pub fn request(&self, method: &str, params: Vec<MsgValue>, timeout: Option<Duration>) -> RpcResult<MsgValue> {
        if self.is_broken() {
            return Err(RpcError::Broken(format!("{} is no longer usable", self.transport)));
        }

        let msgid = self.request_id.fetch_add(1, Ordering::SeqCst);
        let message = MsgValue::Array(vec![
            MsgValue::from(REQUEST),
            MsgValue::from(msgid),
            MsgValue::from(method),
            MsgValue::Array(params),
        ]);

        log_debug!(self.logger, "Sending request: method={}, msgid={}", method, msgid);

        let mut connection = self.connection.lock();
        if let Err(e) = connection.socket.set_timeout(timeout) {
            log_debug!(self.logger, "Could not set socket timeout: {}", e);
        }
        let result = exchange(&mut connection, msgid, &message, timeout.unwrap_or_default());

        match &result {
            Err(RpcError::Timeout(_)) => {
                log_debug!(self.logger, "Request {} timed out; its reply will be skipped", msgid);
            }
            Err(e @ (RpcError::Io(_) | RpcError::Codec(_) | RpcError::Broken(_))) => {
                self.broken.store(true, Ordering::SeqCst);
                log_debug!(self.logger, "Request {} failed, closing session: {}", msgid, e);
            }
            Err(e) => log_debug!(self.logger, "Request {} failed: {}", msgid, e),
            Ok(_) => {}
        }
        result
    }

    fn call_exec_lua(&self, code: &str, args: Vec<Value>, timeout: Option<Duration>) -> RpcResult<Value> {
        let params = vec![
            MsgValue::from(code),
            MsgValue::Array(args.iter().map(to_msgpack).collect()),
        ];
        self.request("nvim_exec_lua", params, timeout).map(from_msgpack)
    }
}

impl Session for NvimSession {
    fn exec_lua(&self, code: &str, args: Vec<Value>) -> RpcResult<Value> {
        self.call_exec_lua(code, args, None)
    }

    fn exec_lua_within(&self, code: &str, args: Vec<Value>, limit: Duration) -> RpcResult<Value> {
        // A zero timeout means "no timeout" to the socket API
        self.call_exec_lua(code, args, Some(limit.max(Duration::from_millis(1))))
    }
}

type Stream = (Socket, Box<dyn Read + Send>, Box<dyn Write + Send>);

fn open_stream(transport: &Transport) -> io::Result<Stream> {
    match transport {
        Transport::Tcp { host, port } => {
            // "[::1]" is how the address spells IPv6 hosts
            let host = host.trim_start_matches('[').trim_end_matches(']');
            let stream = TcpStream::connect((host, *port))?;
            stream.set_nodelay(true).ok();
            let reader = stream.try_clone()?;
            let socket = Socket::Tcp(stream.try_clone()?);
            Ok((socket, Box::new(reader), Box::new(stream)))
        }
        Transport::LocalSocket { path } => open_local(path),
    }
}

#[cfg(unix)]
fn open_local(path: &str) -> io::Result<Stream> {
    let stream = UnixStream::connect(path)?;
    let reader = stream.try_clone()?;
    let socket = Socket::Unix(stream.try_clone()?);
    Ok((socket, Box::new(reader), Box::new(stream)))
}

#[cfg(windows)]
fn open_local(path: &str) -> io::Result<Stream> {
    // Named pipes in Windows can be opened like files
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let reader = file.try_clone()?;
    Ok((Socket::Untimed, Box::new(reader), Box::new(file)))
}

#[cfg(not(any(unix, windows)))]
fn open_local(path: &str) -> io::Result<Stream> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("local sockets are not supported on this platform: {}", path),
    ))
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Block until reply bytes are buffered, without consuming any
fn wait_for_reply(reader: &mut impl BufRead, limit: Duration) -> RpcResult<()> {
    match reader.fill_buf() {
        Ok(_) => Ok(()),
        Err(e) if is_timeout(&e) => Err(RpcError::Timeout(limit)),
        Err(e) => Err(RpcError::Io(e)),
    }
}

fn exchange(connection: &mut Connection, msgid: u32, message: &MsgValue, limit: Duration) -> RpcResult<MsgValue> {
    // A write cut short cannot be resumed; every failure here breaks the session
    rmpv::encode::write_value(&mut connection.writer, message)
        .map_err(|e| RpcError::Broken(e.to_string()))?;
    connection.writer.flush().map_err(|e| RpcError::Broken(e.to_string()))?;

    loop {
        wait_for_reply(&mut connection.reader, limit)?;

        let items = match rmpv::decode::read_value(&mut connection.reader)? {
            MsgValue::Array(items) => items,
            other => {
                return Err(RpcError::InvalidResponse(format!("expected array, got {}", other)))
            }
        };

        match items.first().and_then(MsgValue::as_u64) {
            Some(RESPONSE) => {
                let mut parts = items.into_iter().skip(1);
                let (Some(id), Some(error), Some(result)) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err(RpcError::InvalidResponse("truncated response".to_string()));
                };
                if id.as_u64() != Some(u64::from(msgid)) {
                    continue;
                }
                if !error.is_nil() {
                    return Err(RpcError::Remote(describe_error(error)));
                }
                return Ok(result);
            }
            Some(NOTIFICATION) => continue,
            Some(REQUEST) => {
                // The bridge serves no methods; answer so the caller is not left waiting
                if let Some(id) = items.get(1).cloned() {
                    let reply = MsgValue::Array(vec![
                        MsgValue::from(RESPONSE),
                        id,
                        MsgValue::from("codex-nvim bridge does not handle requests"),
                        MsgValue::Nil,
                    ]);
                    rmpv::encode::write_value(&mut connection.writer, &reply)
                        .map_err(|e| RpcError::Broken(e.to_string()))?;
                    connection.writer.flush().map_err(|e| RpcError::Broken(e.to_string()))?;
                }
            }
            _ => {
                return Err(RpcError::InvalidResponse(format!(
                    "unknown message type in {}",
                    MsgValue::Array(items)
                )))
            }
        }
    }
}

/// Neovim reports errors as `[type, message]`
fn describe_error(error: MsgValue) -> String {
    match error {
        MsgValue::Array(mut parts) if parts.len() == 2 && parts[1].is_str() => {
            match parts.pop() {
                Some(MsgValue::String(message)) => {
                    String::from_utf8_lossy(message.as_bytes()).into_owned()
                }
                _ => String::new(),
            }
        }
        MsgValue::String(message) => String::from_utf8_lossy(message.as_bytes()).into_owned(),
        other => from_msgpack(other).to_string(),
    }
}
