//! Fan-out logger

use super::traits::{Logger, SharedLogger};

/// A logger that forwards every record to each of its children, in order
///
/// # Example
///
/// ```
/// use codex_nvim_core::logging::{ChainLogger, ConsoleLogger, NoOpLogger};
/// use std::sync::Arc;
///
/// let logger = ChainLogger::new(vec![
///     Arc::new(ConsoleLogger::new()),
///     Arc::new(NoOpLogger::new()),
/// ]);
/// assert_eq!(logger.loggers().len(), 2);
/// ```
pub struct ChainLogger {
    loggers: Vec<SharedLogger>,
}

impl ChainLogger {
    pub fn new(loggers: Vec<SharedLogger>) -> Self {
        Self { loggers }
    }

    /// Get the loggers in this chain
    pub fn loggers(&self) -> &[SharedLogger] {
        &self.loggers
    }
}

impl Logger for ChainLogger {
    fn debug(&self, message: &str) {
        self.loggers.iter().for_each(|l| l.debug(message));
    }

    fn info(&self, message: &str) {
        self.loggers.iter().for_each(|l| l.info(message));
    }

    fn warn(&self, message: &str) {
        self.loggers.iter().for_each(|l| l.warn(message));
    }

    fn error(&self, message: &str) {
        self.loggers.iter().for_each(|l| l.error(message));
    }
}
