//! Immutable runtime settings shared by the chart factory and release manager

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::metadata::{qualify, validate_prefix};

pub const DEFAULT_NAMESPACE: &str = "helm-api-pg";
pub const DEFAULT_OUTPUT_DIR: &str = "charts";
pub const DEFAULT_SOURCE_DIR: &str = "source/helm/mariadb";
pub const DEFAULT_HELM_DRIVER: &str = "secrets";
pub const DEFAULT_ENV_PREFIX: &str = "test-";

/// How long a mutating operation waits for the per-release lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings provided once at construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Namespace all releases are installed into
    pub namespace: String,

    /// Directory holding one materialized chart per environment
    pub output_dir: PathBuf,

    /// Source chart template copied for every new environment
    pub source_dir: PathBuf,

    /// Release storage driver passed to the backend (secrets, configmap, memory, sql)
    pub helm_driver: String,

    /// Prefix that marks a release as managed by this service
    pub env_prefix: String,

    /// Upper bound on waiting for another operation on the same release
    pub lock_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            helm_driver: DEFAULT_HELM_DRIVER.to_string(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl Settings {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    pub fn with_helm_driver(mut self, driver: impl Into<String>) -> Self {
        self.helm_driver = driver.into();
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Reject settings that cannot keep managed releases apart from others
    pub fn validate(&self) -> Result<()> {
        validate_prefix(&self.env_prefix)
    }

    /// Qualify a caller-supplied environment name
    pub fn qualify(&self, name: &str) -> Result<String> {
        qualify(&self.env_prefix, name)
    }

    /// On-disk location of a release's chart
    pub fn chart_path(&self, qualified_name: &str) -> PathBuf {
        self.output_dir.join(qualified_name)
    }

    /// Location of the values document inside a chart
    pub fn values_path(chart_path: &Path) -> PathBuf {
        chart_path.join(crate::values::VALUES_FILE)
    }
}
