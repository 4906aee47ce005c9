//! Capability ports used by the release manager
//!
//! Backend actions are async and may take minutes; chart loading and file
//! removal are plain filesystem work. Implementations must be Send + Sync
//! for use across request tasks.

use async_trait::async_trait;
use envpack_core::{FsValuesStore, ValuesStore};
use std::path::Path;
use std::sync::Arc;

use crate::actions::{InstallOptions, ListOptions, UninstallOptions, UpgradeOptions};
use crate::backend::HelmCli;
use crate::error::BackendError;
use crate::files::FsChartFiles;
use crate::loader::DirChartLoader;
use crate::release::{LoadedChart, Release, UninstallResponse};

/// Result type for adapter calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[async_trait]
pub trait InstallAction: Send + Sync {
    /// Install a loaded chart as a new release
    async fn install(&self, chart: &LoadedChart, opts: &InstallOptions) -> BackendResult<Release>;
}

#[async_trait]
pub trait UpgradeAction: Send + Sync {
    /// Upgrade a release to the chart currently on disk
    async fn upgrade(&self, chart: &LoadedChart, opts: &UpgradeOptions) -> BackendResult<Release>;
}

#[async_trait]
pub trait UninstallAction: Send + Sync {
    async fn uninstall(&self, opts: &UninstallOptions) -> BackendResult<UninstallResponse>;
}

#[async_trait]
pub trait ListAction: Send + Sync {
    /// List releases in one namespace, in every state
    async fn list(&self, opts: &ListOptions) -> BackendResult<Vec<Release>>;
}

/// Loads a chart directory for the backend
pub trait ChartLoader: Send + Sync {
    fn load(&self, path: &Path) -> BackendResult<LoadedChart>;
}

/// Chart directory housekeeping
pub trait ChartFiles: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Remove a chart directory recursively. A missing directory is not an error.
    fn remove_all(&self, path: &Path) -> std::io::Result<()>;
}

/// The full set of adapters a manager works with
#[derive(Clone)]
pub struct Ports {
    pub install: Arc<dyn InstallAction>,
    pub upgrade: Arc<dyn UpgradeAction>,
    pub uninstall: Arc<dyn UninstallAction>,
    pub list: Arc<dyn ListAction>,
    pub loader: Arc<dyn ChartLoader>,
    pub files: Arc<dyn ChartFiles>,
    pub values: Arc<dyn ValuesStore>,
}

impl Ports {
    /// Production adapters: the helm binary and the local filesystem
    pub fn helm(helm: HelmCli) -> Self {
        Self::with_backend(
            Arc::new(helm),
            Arc::new(DirChartLoader),
            Arc::new(FsChartFiles),
            Arc::new(FsValuesStore),
        )
    }

    /// Use one backend object for every release action
    pub fn with_backend<B>(
        backend: Arc<B>,
        loader: Arc<dyn ChartLoader>,
        files: Arc<dyn ChartFiles>,
        values: Arc<dyn ValuesStore>,
    ) -> Self
    where
        B: InstallAction + UpgradeAction + UninstallAction + ListAction + 'static,
    {
        Self {
            install: backend.clone(),
            upgrade: backend.clone(),
            uninstall: backend.clone(),
            list: backend,
            loader,
            files,
            values,
        }
    }
}
