//! codex-nvim-mcp: serve a running Neovim's tools over MCP stdio
//!
//! stdout carries the protocol; diagnostics go to stderr and the log file.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rmcp::ServiceExt;

use codex_nvim_core::{
    BridgeConfig, BridgeServer, CallDispatcher, ChainLogger, ConnectionManager, ConsoleLogger, FileLogger,
    SharedLogger, ToolRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "codex-nvim-mcp", version, about = "Expose Neovim tools to MCP clients over stdio")]
struct Cli {
    /// Config file (default: ~/.config/codex-nvim/config.yaml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Instance registry written by the Neovim plugin
    #[arg(long, value_name = "FILE")]
    registry: Option<PathBuf>,

    /// Diagnostics log file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Deadline for deferred tool calls, in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Print debug messages to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<BridgeConfig> {
    let config = match &cli.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::load_user()?,
    };
    let mut config = config.apply_env()?;

    if let Some(path) = &cli.registry {
        config.registry_path = path.clone();
    }
    if let Some(path) = &cli.log_file {
        config.log_path = path.clone();
    }
    if let Some(timeout) = cli.timeout_ms {
        config.default_timeout_ms = timeout;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let file_logger: SharedLogger = Arc::new(FileLogger::new(&config.log_path));
    let console_logger: SharedLogger = Arc::new(ConsoleLogger::new().verbose(cli.verbose));
    let logger: SharedLogger = Arc::new(ChainLogger::new(vec![file_logger, console_logger]));

    let manager = ConnectionManager::from_config(&config, logger.clone());
    let session = match tokio::task::spawn_blocking(move || manager.connect()).await? {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to connect to Neovim: {}", e);
            process::exit(1);
        }
    };

    let dispatcher = CallDispatcher::from_config(Arc::new(session), &config, logger.clone());
    let registry = Arc::new(ToolRegistry::new(Arc::new(dispatcher), logger.clone()));
    registry.refresh().await?;

    let service = BridgeServer::new(registry, logger.clone())
        .serve(rmcp::transport::stdio())
        .await?;
    logger.info("MCP server initialized");

    service.waiting().await?;
    Ok(())
}
