//! RPC module: reaching the Neovim instance
//!
//! - `endpoint`: the shared instance registry written by the Neovim plugin
//! - `address`: classifying `v:servername` into a transport
//! - `connect`: bounded-retry startup connection
//! - `client`: the msgpack-rpc session
//! - `bridge`: the Lua entry points of the remote tool module
//!
//! ```rust,ignore
//! let manager = ConnectionManager::from_config(&config, logger.clone());
//! let session = manager.connect()?;
//!
//! let bridge = LuaBridge::new(&config.lua_module);
//! let tools = bridge.list_tools(&session, config.request_timeout())?;
//! ```

pub mod address;
mod bridge;
mod client;
mod codec;
mod connect;
pub mod endpoint;

#[cfg(test)]
pub(crate) mod fake_nvim;

pub use address::{parse_address, Transport};
pub use bridge::LuaBridge;
pub use client::{NvimSession, RpcError, RpcResult, Session};
pub use codec::{from_msgpack, to_msgpack};
pub use connect::{ConnectionManager, DEFAULT_CONNECT_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use endpoint::{select_instance, EndpointDescriptor, EndpointRegistry};
