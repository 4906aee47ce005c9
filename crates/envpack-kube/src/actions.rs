//! Action options for install, upgrade, uninstall, and list operations
//!
//! The lifecycle policy is fixed: every mutating action waits for the
//! release to settle, gives up after [`OPERATION_TIMEOUT`], and is never a
//! dry run. Options are built from these constants rather than from caller
//! input.

use std::time::Duration;

/// Wait for resources to become ready before returning
pub const WAIT: bool = true;

/// Upper bound for a single backend action
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Mutating actions are always applied
pub const DRY_RUN: bool = false;

/// Options for install operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Qualified release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Wait for resources to be ready
    pub wait: bool,

    /// Timeout for wait
    pub timeout: Duration,

    /// Render and validate without applying
    pub dry_run: bool,
}

impl InstallOptions {
    /// Install options carrying the fixed lifecycle policy
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            wait: WAIT,
            timeout: OPERATION_TIMEOUT,
            dry_run: DRY_RUN,
        }
    }
}

/// Options for upgrade operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Qualified release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Wait for resources to be ready
    pub wait: bool,

    /// Timeout for wait
    pub timeout: Duration,

    /// Replace resources that cannot be patched
    pub force: bool,

    /// Install the release if it does not exist
    pub install: bool,

    pub dry_run: bool,
}

impl UpgradeOptions {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            wait: WAIT,
            timeout: OPERATION_TIMEOUT,
            force: true,
            install: true,
            dry_run: DRY_RUN,
        }
    }
}

/// Options for uninstall operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallOptions {
    pub name: String,
    pub namespace: String,
    pub wait: bool,
    pub timeout: Duration,
}

impl UninstallOptions {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            wait: WAIT,
            timeout: OPERATION_TIMEOUT,
        }
    }
}

/// Options for list operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Namespace to list (never all namespaces)
    pub namespace: String,

    /// Only releases whose name starts with this prefix
    pub prefix: Option<String>,

    /// Include releases in every state, not only deployed ones
    pub all_states: bool,
}

impl ListOptions {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            prefix: None,
            all_states: true,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}
