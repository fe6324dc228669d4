//! Startup connection with bounded retry
//!
//! Each attempt rereads the registry, so an instance that registers while we
//! are retrying is picked up. Blocking; run it once, off the async runtime.

use std::thread;
use std::time::Duration;

use super::address::{parse_address, Transport};
use super::client::{NvimSession, RpcError, RpcResult};
use super::endpoint::EndpointRegistry;
use crate::config::BridgeConfig;
use crate::logging::SharedLogger;

pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);

/// Finds the freshest registered instance and connects to it
pub struct ConnectionManager {
    registry: EndpointRegistry,
    attempts: u32,
    retry_delay: Duration,
    logger: SharedLogger,
}

impl ConnectionManager {
    pub fn new(registry: EndpointRegistry, logger: SharedLogger) -> Self {
        Self {
            registry,
            attempts: DEFAULT_CONNECT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            logger,
        }
    }

    pub fn from_config(config: &BridgeConfig, logger: SharedLogger) -> Self {
        Self::new(EndpointRegistry::new(&config.registry_path), logger)
            .with_attempts(config.connect_attempts)
            .with_retry_delay(config.connect_retry_delay())
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Connect to Neovim over msgpack-rpc
    pub fn connect(&self) -> RpcResult<NvimSession> {
        let logger = self.logger.clone();
        self.connect_with(|transport| NvimSession::connect(transport, logger.clone()))
    }

    /// Run the retry loop with a custom connector
    ///
    /// Fails with the last error seen: `NoInstanceAvailable` if the final
    /// attempt found nothing to connect to, `ConnectionFailed` otherwise.
    pub fn connect_with<S, F>(&self, mut connector: F) -> RpcResult<S>
    where
        F: FnMut(&Transport) -> RpcResult<S>,
    {
        let mut last_error = RpcError::NoInstanceAvailable;

        for attempt in 1..=self.attempts {
            if attempt > 1 {
                thread::sleep(self.retry_delay);
            }

            let Some(instance) = self.registry.resolve() else {
                self.logger.debug(&format!(
                    "No instance in {} (attempt {}/{})",
                    self.registry.path().display(),
                    attempt,
                    self.attempts
                ));
                last_error = RpcError::NoInstanceAvailable;
                continue;
            };

            self.logger.info(&format!("Connecting to Neovim at {}", instance.address));
            if !instance.extra.is_empty() {
                self.logger.debug(&format!(
                    "Instance details: {}",
                    serde_json::to_string(&instance.extra).unwrap_or_default()
                ));
            }

            let outcome = parse_address(&instance.address).and_then(|transport| connector(&transport));
            match outcome {
                Ok(session) => return Ok(session),
                Err(e) => {
                    self.logger.warn(&format!(
                        "Attempt {}/{} failed: {}",
                        attempt, self.attempts, e
                    ));
                    last_error = match e {
                        RpcError::ConnectionFailed(message) => RpcError::ConnectionFailed(message),
                        other => RpcError::ConnectionFailed(other.to_string()),
                    };
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{FileLogger, LogLevel, NoOpLogger};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn manager(registry: &Path) -> ConnectionManager {
        ConnectionManager::new(EndpointRegistry::new(registry), Arc::new(NoOpLogger::new()))
            .with_retry_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_no_instance_exhausts_attempts() {
        let dir = tempdir().unwrap();
        let mut calls = 0;
        let result: RpcResult<()> = manager(&dir.path().join("absent.json"))
            .with_attempts(3)
            .connect_with(|_| {
                calls += 1;
                Ok(())
            });

        assert!(matches!(result, Err(RpcError::NoInstanceAvailable)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_connects_to_freshest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.json");
        fs::write(
            &path,
            r#"[{"server": "tcp://old:1", "last_seen": 1}, {"server": "tcp://new:2", "last_seen": 2}]"#,
        )
        .unwrap();

        let transport = manager(&path).connect_with(|t| Ok(t.clone())).unwrap();
        assert_eq!(transport, Transport::Tcp { host: "new".to_string(), port: 2 });
    }

    #[test]
    fn test_reports_last_connect_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.json");
        fs::write(&path, r#"[{"server": "/tmp/gone.sock"}]"#).unwrap();

        let mut calls = 0;
        let result: RpcResult<()> = manager(&path).with_attempts(4).connect_with(|_| {
            calls += 1;
            Err(RpcError::ConnectionFailed(format!("refused #{}", calls)))
        });

        assert_eq!(calls, 4);
        match result {
            Err(RpcError::ConnectionFailed(message)) => assert_eq!(message, "refused #4"),
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn test_rereads_registry_between_attempts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.json");
        fs::write(&path, r#"[{"server": "tcp://stale:1", "last_seen": 1}]"#).unwrap();

        let mut seen = Vec::new();
        let transport = manager(&path)
            .connect_with(|t| {
                seen.push(t.clone());
                if seen.len() == 1 {
                    // A fresh instance registers while we retry
                    fs::write(
                        &path,
                        r#"[{"server": "tcp://stale:1", "last_seen": 1}, {"server": "tcp://fresh:2", "last_seen": 5}]"#,
                    )
                    .unwrap();
                    return Err(RpcError::ConnectionFailed("refused".to_string()));
                }
                Ok(t.clone())
            })
            .unwrap();

        assert_eq!(seen.len(), 2);
        assert_eq!(transport, Transport::Tcp { host: "fresh".to_string(), port: 2 });
    }

    #[test]
    fn test_bad_address_counts_as_failed_attempt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.json");
        fs::write(&path, r#"[{"server": "tcp://host:notaport"}]"#).unwrap();

        let result: RpcResult<()> = manager(&path).with_attempts(2).connect_with(|_| Ok(()));
        match result {
            Err(RpcError::ConnectionFailed(message)) => assert!(message.contains("Invalid address")),
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn test_logs_address_before_connecting() {
        let dir = tempdir().unwrap();
        let registry = dir.path().join("instances.json");
        let log = dir.path().join("bridge.log");
        fs::write(&registry, r#"[{"server": "/tmp/nvim.sock"}]"#).unwrap();

        let logger = Arc::new(FileLogger::with_level(&log, LogLevel::Info));
        let manager = ConnectionManager::new(EndpointRegistry::new(&registry), logger);
        manager.connect_with(|_| Ok(())).unwrap();

        let content = fs::read_to_string(&log).unwrap();
        assert!(content.contains("Connecting to Neovim at /tmp/nvim.sock"));
    }

    #[test]
    fn test_logs_instance_details_at_debug() {
        let dir = tempdir().unwrap();
        let registry = dir.path().join("instances.json");
        let log = dir.path().join("bridge.log");
        fs::write(&registry, r#"[{"server": "/tmp/nvim.sock", "pid": 42, "cwd": "/work"}]"#).unwrap();

        let logger = Arc::new(FileLogger::with_level(&log, LogLevel::Debug));
        let manager = ConnectionManager::new(EndpointRegistry::new(&registry), logger);
        manager.connect_with(|_| Ok(())).unwrap();

        let content = fs::read_to_string(&log).unwrap();
        assert!(content.contains("[DEBUG] Instance details:"));
        assert!(content.contains(r#""pid":42"#));
        assert!(content.contains(r#""cwd":"/work""#));
    }
}
