//! Release lifecycle manager
//!
//! The manager is the only component that decides whether a release may be
//! installed, upgraded or removed. It never caches release state: every
//! operation lists releases through the backend first and acts on that
//! answer while holding the per-name lock, so check and act cannot
//! interleave with another request for the same environment.
//!
//! Callers pass unqualified environment names. The manager prepends the
//! configured prefix and only ever sees releases carrying it.

use envpack_core::{
    ChartFactory, ChartMetadata, MaterializedChart, ScaleAction, Settings, ValuesPatcher,
    is_managed,
};
use std::path::{Path, PathBuf};

use crate::actions::{InstallOptions, ListOptions, UninstallOptions, UpgradeOptions};
use crate::error::{ReleaseError, Result};
use crate::locks::ReleaseLocks;
use crate::ports::Ports;
use crate::release::{LoadedChart, Release, UninstallResponse};

/// Outcome of the create-and-install flow
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub chart: MaterializedChart,
    pub release: Release,
}

pub struct ReleaseManager {
    settings: Settings,
    ports: Ports,
    factory: ChartFactory,
    patcher: ValuesPatcher,
    locks: ReleaseLocks,
}

impl ReleaseManager {
    pub fn new(settings: Settings, ports: Ports) -> Self {
        let factory = ChartFactory::new(&settings);
        let patcher = ValuesPatcher::new(ports.values.clone());
        let locks = ReleaseLocks::new(settings.lock_timeout);
        Self {
            settings,
            ports,
            factory,
            patcher,
            locks,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Qualified release name for a caller-supplied environment name
    pub fn qualify(&self, name: &str) -> Result<String> {
        self.settings
            .qualify(name)
            .map_err(|e| ReleaseError::from_factory(name, e))
    }

    /// Chart directory for an environment
    pub fn chart_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.settings.chart_path(&self.qualify(name)?))
    }

    /// Whether the environment's chart directory exists
    pub fn chart_exists(&self, name: &str) -> Result<bool> {
        Ok(self.ports.files.exists(&self.chart_path(name)?))
    }

    /// Materialize the chart for `metadata`. Idempotent.
    pub fn create_release(&self, metadata: &ChartMetadata) -> Result<MaterializedChart> {
        self.factory
            .materialize(metadata)
            .map_err(|e| ReleaseError::from_factory(&metadata.name, e))
    }

    /// Install the chart at `chart_path` as a new release
    pub async fn install(&self, chart_path: &Path, name: &str) -> Result<Release> {
        let qualified = self.qualify(name)?;
        let _guard = self.locks.acquire(&qualified).await?;

        if self.find(&qualified).await?.is_some() {
            return Err(ReleaseError::AlreadyExists {
                name: qualified,
                namespace: self.settings.namespace.clone(),
            });
        }

        let chart = self.load_chart(chart_path)?;
        tracing::info!(release = %qualified, chart = %chart.reference(), "installing release");

        let release = self
            .ports
            .install
            .install(&chart, &InstallOptions::new(&qualified, &self.settings.namespace))
            .await
            .map_err(|source| ReleaseError::BackendInstallFailed {
                name: qualified.clone(),
                source,
            })?;

        tracing::info!(release = %release.name, revision = release.revision, status = %release.status, "installed release");
        Ok(release)
    }

    /// Create the chart if needed, then install it
    pub async fn provision(&self, metadata: &ChartMetadata) -> Result<Provisioned> {
        let chart = self.create_release(metadata)?;
        let release = self.install(&chart.path, &metadata.name).await?;
        Ok(Provisioned { chart, release })
    }

    /// Upgrade an existing release from its chart directory
    pub async fn upgrade(&self, name: &str) -> Result<Release> {
        let qualified = self.qualify(name)?;
        let _guard = self.locks.acquire(&qualified).await?;
        self.upgrade_locked(&qualified).await
    }

    async fn upgrade_locked(&self, qualified: &str) -> Result<Release> {
        if self.find(qualified).await?.is_none() {
            return Err(self.not_found(qualified));
        }

        let chart = self.load_chart(&self.settings.chart_path(qualified))?;
        tracing::info!(release = %qualified, chart = %chart.reference(), "upgrading release");

        let release = self
            .ports
            .upgrade
            .upgrade(&chart, &UpgradeOptions::new(qualified, &self.settings.namespace))
            .await
            .map_err(|source| ReleaseError::BackendUpgradeFailed {
                name: qualified.to_string(),
                source,
            })?;

        tracing::info!(release = %release.name, revision = release.revision, "upgraded release");
        Ok(release)
    }

    /// Uninstall a release, then remove its chart directory
    ///
    /// If the directory cannot be removed the release is already gone from
    /// the cluster; the error reports the leftover path and nothing is retried.
    pub async fn uninstall(&self, name: &str) -> Result<UninstallResponse> {
        let qualified = self.qualify(name)?;
        let _guard = self.locks.acquire(&qualified).await?;

        if self.find(&qualified).await?.is_none() {
            return Err(self.not_found(&qualified));
        }

        tracing::info!(release = %qualified, "uninstalling release");
        let response = self
            .ports
            .uninstall
            .uninstall(&UninstallOptions::new(&qualified, &self.settings.namespace))
            .await
            .map_err(|source| ReleaseError::BackendUninstallFailed {
                name: qualified.clone(),
                source,
            })?;

        let path = self.settings.chart_path(&qualified);
        if let Err(source) = self.ports.files.remove_all(&path) {
            tracing::warn!(release = %qualified, path = %path.display(), error = %source, "failed to remove chart files");
            return Err(ReleaseError::CleanupFailed {
                name: qualified,
                path,
                source,
            });
        }

        tracing::info!(release = %qualified, info = %response.info, "uninstalled release");
        Ok(response)
    }

    /// Managed releases in the configured namespace, names as stored
    pub async fn list(&self) -> Result<Vec<Release>> {
        let opts = ListOptions::new(&self.settings.namespace).with_prefix(&self.settings.env_prefix);
        let releases = self
            .ports
            .list
            .list(&opts)
            .await
            .map_err(|source| ReleaseError::BackendListFailed {
                namespace: self.settings.namespace.clone(),
                source,
            })?;

        // The backend filter is a pattern match, enforce the prefix here too
        Ok(releases
            .into_iter()
            .filter(|r| r.namespace == self.settings.namespace)
            .filter(|r| is_managed(&self.settings.env_prefix, &r.name))
            .collect())
    }

    /// Write the replica count for `action`, then upgrade
    pub async fn set_scale(&self, name: &str, action: ScaleAction) -> Result<Release> {
        let qualified = self.qualify(name)?;
        let _guard = self.locks.acquire(&qualified).await?;

        let chart_path = self.settings.chart_path(&qualified);
        self.patcher
            .set_replica_count(&chart_path, action.replicas())
            .map_err(|e| ReleaseError::from_values(&qualified, e))?;
        tracing::info!(release = %qualified, %action, replicas = action.replicas(), "scaling release");

        self.upgrade_locked(&qualified).await
    }

    async fn find(&self, qualified: &str) -> Result<Option<Release>> {
        Ok(self.list().await?.into_iter().find(|r| r.name == qualified))
    }

    fn load_chart(&self, path: &Path) -> Result<LoadedChart> {
        self.ports
            .loader
            .load(path)
            .map_err(|source| ReleaseError::ChartLoadFailed {
                path: path.to_path_buf(),
                source,
            })
    }

    fn not_found(&self, qualified: &str) -> ReleaseError {
        ReleaseError::NotFound {
            name: qualified.to_string(),
            namespace: self.settings.namespace.clone(),
        }
    }
}
