//! Values documents, the values store port, and the replica patcher
//!
//! A values document is an ordered YAML mapping. Patching one key never
//! drops or reorders the others, so a read -> patch -> write -> read cycle
//! preserves every untouched entry.

use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{CoreError, Result};

/// File name of the values document inside a chart
pub const VALUES_FILE: &str = "values.yaml";

/// Key holding the replica count
pub const REPLICAS_KEY: &str = "replicas";

/// Ordered values document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuesDocument(Mapping);

impl ValuesDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self(Mapping::new())
    }

    /// Parse a document from YAML. An empty file is an empty document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(CoreError::InvalidChart {
                message: format!(
                    "values document must be a mapping, found {}",
                    value_kind(&other)
                ),
            }),
        }
    }

    /// Serialize the full mapping back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Get a top-level value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a top-level value, overwriting in place or appending
    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(Value::String(key.to_string()), value);
    }

    /// Current replica count, if present and numeric
    pub fn replicas(&self) -> Option<u64> {
        self.get(REPLICAS_KEY).and_then(Value::as_u64)
    }

    pub fn set_replicas(&mut self, count: u32) {
        self.set(REPLICAS_KEY, Value::Number(u64::from(count).into()));
    }

    /// Top-level keys in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().filter_map(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn inner(&self) -> &Mapping {
        &self.0
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Read/write access to values documents
///
/// Implementations must be Send + Sync; the release manager shares one
/// store across concurrent requests.
pub trait ValuesStore: Send + Sync {
    /// Read and parse the document at `path`
    fn read(&self, path: &Path) -> Result<ValuesDocument>;

    /// Replace the document at `path`. Readers must never observe a partial write.
    fn write(&self, path: &Path, values: &ValuesDocument) -> Result<()>;
}

/// Filesystem-backed values store
#[derive(Debug, Clone, Copy, Default)]
pub struct FsValuesStore;

impl ValuesStore for FsValuesStore {
    fn read(&self, path: &Path) -> Result<ValuesDocument> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::ValuesRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        ValuesDocument::from_yaml(&content).map_err(|e| CoreError::ValuesRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn write(&self, path: &Path, values: &ValuesDocument) -> Result<()> {
        let write_err = |message: String| CoreError::ValuesWrite {
            path: path.to_path_buf(),
            message,
        };

        let yaml = values.to_yaml().map_err(|e| write_err(e.to_string()))?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        // Write next to the target and rename over it
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| write_err(e.to_string()))?;
        tmp.write_all(yaml.as_bytes())
            .and_then(|_| keep_permissions(path, tmp.as_file()))
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| write_err(e.to_string()))?;
        tmp.persist(path).map_err(|e| write_err(e.error.to_string()))?;

        Ok(())
    }
}

/// In-memory values store for tests
#[derive(Clone, Default)]
pub struct MemoryValuesStore {
    documents: Arc<RwLock<HashMap<PathBuf, String>>>,
    fail_writes: Arc<RwLock<bool>>,
    writes: Arc<RwLock<usize>>,
}

impl MemoryValuesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw YAML document
    pub fn with_document(self, path: impl Into<PathBuf>, yaml: &str) -> Self {
        self.documents
            .write()
            .unwrap()
            .insert(path.into(), yaml.to_string());
        self
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.write().unwrap() = fail;
    }

    /// Raw YAML currently stored at `path`
    pub fn raw(&self, path: &Path) -> Option<String> {
        self.documents.read().unwrap().get(path).cloned()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap()
    }
}

impl ValuesStore for MemoryValuesStore {
    fn read(&self, path: &Path) -> Result<ValuesDocument> {
        let docs = self.documents.read().unwrap();
        let yaml = docs.get(path).ok_or_else(|| CoreError::ValuesRead {
            path: path.to_path_buf(),
            message: "no such file".to_string(),
        })?;

        ValuesDocument::from_yaml(yaml).map_err(|e| CoreError::ValuesRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn write(&self, path: &Path, values: &ValuesDocument) -> Result<()> {
        if *self.fail_writes.read().unwrap() {
            return Err(CoreError::ValuesWrite {
                path: path.to_path_buf(),
                message: "injected write failure".to_string(),
            });
        }

        let yaml = values.to_yaml()?;
        self.documents
            .write()
            .unwrap()
            .insert(path.to_path_buf(), yaml);
        *self.writes.write().unwrap() += 1;
        Ok(())
    }
}

/// Keeps the `replicas` key of a chart's values document in sync with scaling intents
#[derive(Clone)]
pub struct ValuesPatcher {
    store: Arc<dyn ValuesStore>,
}

impl ValuesPatcher {
    pub fn new(store: Arc<dyn ValuesStore>) -> Self {
        Self { store }
    }

    /// Set `replicas` in `chart_path/values.yaml`, passing every other key through
    pub fn set_replica_count(&self, chart_path: &Path, count: u32) -> Result<()> {
        let path = chart_path.join(VALUES_FILE);
        let mut values = self.store.read(&path)?;
        let previous = values.replicas();
        values.set_replicas(count);
        self.store.write(&path, &values)?;

        tracing::info!(
            path = %path.display(),
            ?previous,
            replicas = count,
            "updated replica count"
        );
        Ok(())
    }
}

/// Give the replacement file the mode of the file it replaces
///
/// Temp files are created `0600`; a new values file gets `0644`.
fn keep_permissions(path: &Path, file: &std::fs::File) -> std::io::Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) => file.set_permissions(meta.permissions()),
        Err(_) => default_permissions(file),
    }
}

#[cfg(unix)]
fn default_permissions(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}
