//! Release handles as reported by the packaging backend
//!
//! Nothing here is cached by the manager; every operation lists releases
//! again and works from the fresh handles.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Release status as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseStatus {
    Deployed,
    Uninstalled,
    Superseded,
    Failed,
    Uninstalling,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
    #[serde(other)]
    Unknown,
}

impl ReleaseStatus {
    /// Whether the release is mid-operation
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ReleaseStatus::PendingInstall
                | ReleaseStatus::PendingUpgrade
                | ReleaseStatus::PendingRollback
                | ReleaseStatus::Uninstalling
        )
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReleaseStatus::Deployed => "deployed",
            ReleaseStatus::Uninstalled => "uninstalled",
            ReleaseStatus::Superseded => "superseded",
            ReleaseStatus::Failed => "failed",
            ReleaseStatus::Uninstalling => "uninstalling",
            ReleaseStatus::PendingInstall => "pending-install",
            ReleaseStatus::PendingUpgrade => "pending-upgrade",
            ReleaseStatus::PendingRollback => "pending-rollback",
            ReleaseStatus::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A release handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Qualified release name
    pub name: String,

    pub namespace: String,

    /// Revision number (1-indexed, increments with each upgrade)
    pub revision: u32,

    pub status: ReleaseStatus,

    /// Chart reference, `<name>-<version>`
    pub chart: String,

    #[serde(default)]
    pub app_version: String,

    /// Last deployment time, if the backend reported one
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

impl Release {
    /// A freshly deployed first revision
    pub fn deployed(
        name: impl Into<String>,
        namespace: impl Into<String>,
        chart: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            revision: 1,
            status: ReleaseStatus::Deployed,
            chart: chart.into(),
            app_version: String::new(),
            updated: Some(Utc::now()),
        }
    }
}

/// The backend's report for a removed release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninstallResponse {
    /// Qualified name of the removed release
    pub release: String,

    /// Backend message, e.g. `release "test-db" uninstalled`
    pub info: String,
}

/// A chart directory that has been loaded and validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedChart {
    pub path: PathBuf,
    pub name: String,
    pub version: Version,
    pub app_version: Option<String>,
}

impl LoadedChart {
    /// Chart reference as the backend reports it
    pub fn reference(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}
