//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use envpack_kube::{CredentialError, ReleaseError};
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// A release lifecycle operation failed
    #[error("{message}")]
    #[diagnostic(code(envpack::cli::release))]
    Release {
        kind: &'static str,
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Missing credentials or unusable settings
    #[error("Configuration error: {message}")]
    #[diagnostic(code(envpack::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (bind failure, terminal output)
    #[error("IO error: {message}")]
    #[diagnostic(code(envpack::cli::io))]
    Io { message: String },

    /// The HTTP server did not shut down cleanly
    #[error("Server error: {message}")]
    #[diagnostic(code(envpack::cli::server))]
    Server { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Release { kind, .. } => match *kind {
                "invalid_name" => exit_codes::VALIDATION_ERROR,
                "not_found" => exit_codes::NOT_FOUND,
                "already_exists" | "busy" => exit_codes::CONFLICT,
                "source_not_found" | "output_dir_not_found" | "chart_materialize_failed"
                | "values_read_failed" | "values_write_failed" | "cleanup_failed" => {
                    exit_codes::IO_ERROR
                }
                "chart_load_failed"
                | "backend_install_failed"
                | "backend_upgrade_failed"
                | "backend_uninstall_failed"
                | "backend_list_failed" => exit_codes::BACKEND_ERROR,
                _ => exit_codes::ERROR,
            },
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Server { .. } => exit_codes::ERROR,
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }
}

fn release_help(err: &ReleaseError) -> Option<String> {
    match err {
        ReleaseError::NotFound { .. } => {
            Some("Use `envpack create` to provision a brand new environment".to_string())
        }
        ReleaseError::AlreadyExists { .. } => {
            Some("Use `envpack upgrade` or `envpack scale` to change an existing environment".to_string())
        }
        ReleaseError::CleanupFailed { path, .. } => Some(format!(
            "The release is gone; remove {} by hand",
            path.display()
        )),
        ReleaseError::Busy { .. } => {
            Some("Another operation on this environment is in progress, retry later".to_string())
        }
        _ => None,
    }
}

impl From<ReleaseError> for CliError {
    fn from(err: ReleaseError) -> Self {
        CliError::Release {
            kind: err.kind(),
            help: release_help(&err),
            message: err.report(),
        }
    }
}

impl From<CredentialError> for CliError {
    fn from(err: CredentialError) -> Self {
        CliError::Config {
            message: err.report(),
            help: Some(format!(
                "Set {} or pass --credentials-secret",
                envpack_kube::REQUIRED_KEYS.join(", ")
            )),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
