//! Error types for envpack-kube

use envpack_core::CoreError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for release lifecycle operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Failures reported by a packaging backend adapter
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend binary could not be started
    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend ran and reported a failure
    #[error("`{command}` exited with {}: {stderr}", status.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Backend output could not be understood
    #[error("unexpected backend output: {0}")]
    Parse(String),

    /// Chart directory could not be loaded
    #[error("invalid chart at {}: {message}", path.display())]
    InvalidChart { path: PathBuf, message: String },

    /// The backend refused the request
    #[error("{0}")]
    Rejected(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Parse(e.to_string())
    }
}

/// Failures of the credential bootstrap
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A required credential is absent
    #[error("required credential {key} missing")]
    Missing { key: String },

    /// A credential is present but unusable
    #[error("credential {key} is invalid: {reason}")]
    InvalidValue { key: String, reason: String },

    /// The parameter store could not be read
    #[error("failed to read secret '{name}' in namespace '{namespace}'")]
    SecretRead {
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    /// Kubernetes client could not be configured
    #[error("Kubernetes client unavailable")]
    Kube(#[from] kube::Error),
}

impl CredentialError {
    /// The error message followed by its chain of causes
    pub fn report(&self) -> String {
        error_chain(self)
    }
}

/// Errors returned by the release manager
///
/// Every variant names the qualified release or the path involved and keeps
/// the underlying cause as its source. Nothing is retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReleaseError {
    #[error("release '{name}' not found in namespace '{namespace}'")]
    NotFound { name: String, namespace: String },

    #[error("release '{name}' already exists in namespace '{namespace}'")]
    AlreadyExists { name: String, namespace: String },

    #[error("source chart path does not exist: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("output directory does not exist: {}", path.display())]
    OutputDirNotFound { path: PathBuf },

    #[error("invalid release name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("failed to create chart for '{name}'")]
    ChartMaterializeFailed {
        name: String,
        #[source]
        source: CoreError,
    },

    #[error("failed to load chart from {}", path.display())]
    ChartLoadFailed {
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    #[error("failed to install release '{name}'")]
    BackendInstallFailed {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to upgrade release '{name}'")]
    BackendUpgradeFailed {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to uninstall release '{name}'")]
    BackendUninstallFailed {
        name: String,
        #[source]
        source: BackendError,
    },

    /// The release is gone from the cluster but its chart files remain
    #[error("release '{name}' was uninstalled but {} could not be removed", path.display())]
    CleanupFailed {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list releases in namespace '{namespace}'")]
    BackendListFailed {
        namespace: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to read values for '{name}'")]
    ValuesReadFailed {
        name: String,
        #[source]
        source: CoreError,
    },

    #[error("failed to write values for '{name}'")]
    ValuesWriteFailed {
        name: String,
        #[source]
        source: CoreError,
    },

    /// Another operation on the same release held the lock for too long
    #[error("release '{name}' is busy, gave up after {}ms", waited.as_millis())]
    Busy { name: String, waited: Duration },
}

impl ReleaseError {
    /// Stable snake_case identifier for this error
    pub fn kind(&self) -> &'static str {
        match self {
            ReleaseError::NotFound { .. } => "not_found",
            ReleaseError::AlreadyExists { .. } => "already_exists",
            ReleaseError::SourceNotFound { .. } => "source_not_found",
            ReleaseError::OutputDirNotFound { .. } => "output_dir_not_found",
            ReleaseError::InvalidName { .. } => "invalid_name",
            ReleaseError::ChartMaterializeFailed { .. } => "chart_materialize_failed",
            ReleaseError::ChartLoadFailed { .. } => "chart_load_failed",
            ReleaseError::BackendInstallFailed { .. } => "backend_install_failed",
            ReleaseError::BackendUpgradeFailed { .. } => "backend_upgrade_failed",
            ReleaseError::BackendUninstallFailed { .. } => "backend_uninstall_failed",
            ReleaseError::CleanupFailed { .. } => "cleanup_failed",
            ReleaseError::BackendListFailed { .. } => "backend_list_failed",
            ReleaseError::ValuesReadFailed { .. } => "values_read_failed",
            ReleaseError::ValuesWriteFailed { .. } => "values_write_failed",
            ReleaseError::Busy { .. } => "busy",
        }
    }

    /// The error message followed by its chain of causes
    pub fn report(&self) -> String {
        error_chain(self)
    }

    pub(crate) fn from_factory(name: &str, error: CoreError) -> Self {
        match error {
            CoreError::SourceNotFound { path } => ReleaseError::SourceNotFound { path },
            CoreError::OutputDirNotFound { path } => ReleaseError::OutputDirNotFound { path },
            CoreError::InvalidName { name, reason } => ReleaseError::InvalidName { name, reason },
            other => ReleaseError::ChartMaterializeFailed {
                name: name.to_string(),
                source: other,
            },
        }
    }

    pub(crate) fn from_values(name: &str, error: CoreError) -> Self {
        match error {
            CoreError::ValuesWrite { .. } => ReleaseError::ValuesWriteFailed {
                name: name.to_string(),
                source: error,
            },
            other => ReleaseError::ValuesReadFailed {
                name: name.to_string(),
                source: other,
            },
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
