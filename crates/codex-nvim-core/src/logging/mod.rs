//! Logging abstractions
//!
//! Components receive a `SharedLogger` and never write to stdout directly.

mod traits;
mod noop;
mod console;
mod chain;
pub mod file_logger;

pub use traits::{Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
pub use chain::ChainLogger;
pub use file_logger::{FileLogger, LogLevel};
