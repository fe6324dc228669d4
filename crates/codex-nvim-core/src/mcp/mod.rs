//! MCP (Model Context Protocol) server module
//!
//! Uses the official rmcp SDK to serve the registered Neovim tools.
//!
//! # Example
//!
//! ```rust,ignore
//! use codex_nvim_core::mcp::BridgeServer;
//! use rmcp::ServiceExt;
//!
//! let registry = Arc::new(ToolRegistry::new(dispatcher, logger.clone()));
//! registry.refresh().await?;
//!
//! let service = BridgeServer::new(registry, logger)
//!     .serve(rmcp::transport::stdio())
//!     .await?;
//! service.waiting().await?;
//! ```

mod server;

pub use server::{BridgeServer, SERVER_NAME};
