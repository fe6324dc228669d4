//! Silent logger

use super::traits::Logger;

/// Discards every message; the default in tests
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for NoOpLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::SharedLogger;
    use std::sync::Arc;

    #[test]
    fn test_usable_as_shared_logger() {
        let logger: SharedLogger = Arc::new(NoOpLogger::new());
        crate::log_info!(logger, "connected to {}", "nvim");
        logger.error("ignored");
    }
}
