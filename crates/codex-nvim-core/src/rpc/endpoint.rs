//! Neovim instance registry
//!
//! The Neovim plugin appends an entry to a shared JSON file for every running
//! instance. The bridge reads that file fresh on each connection attempt and
//! picks the most recently seen instance; nothing is cached between reads.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// One entry of the instance registry
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    /// RPC address (the `server` field); empty when absent or not a string
    pub address: String,
    /// Epoch seconds of the last heartbeat; 0 when absent
    pub last_seen: f64,
    /// Remaining fields (`pid`, `cwd`, ...), logged when connecting
    pub extra: Map<String, Value>,
}

impl EndpointDescriptor {
    pub fn new(address: impl Into<String>, last_seen: f64) -> Self {
        Self {
            address: address.into(),
            last_seen,
            extra: Map::new(),
        }
    }

    fn from_json(mut object: Map<String, Value>) -> Self {
        let address = match object.remove("server") {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        let last_seen = object
            .remove("last_seen")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        Self {
            address,
            last_seen,
            extra: object,
        }
    }

    /// Whether this entry names something we could connect to
    pub fn is_candidate(&self) -> bool {
        !self.address.is_empty()
    }
}

/// Reader for the registry file
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    path: PathBuf,
}

impl EndpointRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry from disk
    ///
    /// A missing file, unreadable file, malformed JSON or a top-level value
    /// that is not an array all yield an empty list. Non-object elements are
    /// dropped.
    pub fn load(&self) -> Vec<EndpointDescriptor> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(object) => Some(EndpointDescriptor::from_json(object)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Load and select in one step
    pub fn resolve(&self) -> Option<EndpointDescriptor> {
        select_instance(self.load())
    }
}

/// Pick the candidate with the greatest `last_seen`
///
/// Entries without an address are ignored. On ties the first entry wins.
pub fn select_instance(
    entries: impl IntoIterator<Item = EndpointDescriptor>,
) -> Option<EndpointDescriptor> {
    entries
        .into_iter()
        .filter(EndpointDescriptor::is_candidate)
        .fold(None, |best: Option<EndpointDescriptor>, entry| match best {
            Some(current) if entry.last_seen <= current.last_seen => Some(current),
            _ => Some(entry),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn registry_with(content: &str) -> (tempfile::TempDir, EndpointRegistry) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nvim_instances.json");
        fs::write(&path, content).unwrap();
        (dir, EndpointRegistry::new(path))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let registry = EndpointRegistry::new(dir.path().join("absent.json"));
        assert!(registry.load().is_empty());
        assert!(registry.resolve().is_none());
    }

    #[test]
    fn test_malformed_file_is_empty() {
        let (_dir, registry) = registry_with("{not json");
        assert!(registry.load().is_empty());

        let (_dir, registry) = registry_with(r#"{"server": "/tmp/a.sock"}"#);
        assert!(registry.load().is_empty());
    }

    #[test]
    fn test_load_keeps_extra_fields() {
        let (_dir, registry) = registry_with(
            r#"[{"server": "/tmp/a.sock", "last_seen": 12, "pid": 42, "cwd": "/src"}, 7, "x"]"#,
        );
        let entries = registry.load();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].address, "/tmp/a.sock");
        assert_eq!(entries[0].last_seen, 12.0);
        assert_eq!(entries[0].extra.get("pid"), Some(&Value::from(42)));
    }

    #[test]
    fn test_select_picks_freshest() {
        let (_dir, registry) = registry_with(
            r#"[
                {"server": "/tmp/old.sock", "last_seen": 100},
                {"server": "/tmp/new.sock", "last_seen": 200.5},
                {"server": "", "last_seen": 900},
                {"last_seen": 1000}
            ]"#,
        );
        let selected = registry.resolve().unwrap();
        assert_eq!(selected.address, "/tmp/new.sock");
    }

    #[test]
    fn test_select_defaults_last_seen_to_zero() {
        let entries = vec![
            EndpointDescriptor::new("/tmp/a.sock", -5.0),
            EndpointDescriptor::new("/tmp/b.sock", 0.0),
        ];
        assert_eq!(select_instance(entries).unwrap().address, "/tmp/b.sock");

        let (_dir, registry) = registry_with(r#"[{"server": "/tmp/a.sock", "last_seen": "soon"}]"#);
        assert_eq!(registry.load()[0].last_seen, 0.0);
    }

    #[test]
    fn test_select_tie_keeps_first() {
        let entries = vec![
            EndpointDescriptor::new("first", 5.0),
            EndpointDescriptor::new("second", 5.0),
        ];
        assert_eq!(select_instance(entries).unwrap().address, "first");
    }

    #[test]
    fn test_select_none_without_address() {
        let entries = vec![EndpointDescriptor::new("", 50.0)];
        assert!(select_instance(entries).is_none());
        assert!(select_instance(Vec::new()).is_none());
    }
}
