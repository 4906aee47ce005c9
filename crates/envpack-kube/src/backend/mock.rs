//! Mock backend for testing
//!
//! Releases are kept in memory, keyed by namespace and name. Operation
//! counts and failure injection make the manager's call pattern observable
//! without a cluster.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::actions::{InstallOptions, ListOptions, UninstallOptions, UpgradeOptions};
use crate::error::BackendError;
use crate::ports::{BackendResult, InstallAction, ListAction, UninstallAction, UpgradeAction};
use crate::release::{LoadedChart, Release, ReleaseStatus, UninstallResponse};

/// Backend operations, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Install,
    Upgrade,
    Uninstall,
    List,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub installs: usize,
    pub upgrades: usize,
    pub uninstalls: usize,
    pub lists: usize,
}

/// In-memory packaging backend
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Storage: namespace -> name -> release
    store: Arc<RwLock<HashMap<String, HashMap<String, Release>>>>,
    operations: Arc<RwLock<OperationCounts>>,
    failing: Arc<RwLock<HashSet<Operation>>>,
    latency: Arc<RwLock<Option<Duration>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated releases
    pub fn with_releases(releases: Vec<Release>) -> Self {
        let backend = Self::new();
        {
            let mut store = backend.store.write().unwrap();
            for release in releases {
                store
                    .entry(release.namespace.clone())
                    .or_default()
                    .insert(release.name.clone(), release);
            }
        }
        backend
    }

    /// Make every call of `op` fail
    pub fn fail(&self, op: Operation) {
        self.failing.write().unwrap().insert(op);
    }

    pub fn recover(&self, op: Operation) {
        self.failing.write().unwrap().remove(&op);
    }

    /// Delay every mutating call, to widen race windows
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write().unwrap() = Some(latency);
    }

    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    pub fn reset_counts(&self) {
        *self.operations.write().unwrap() = OperationCounts::default();
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<Release> {
        self.store
            .read()
            .unwrap()
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .cloned()
    }

    pub fn release_count(&self) -> usize {
        self.store.read().unwrap().values().map(HashMap::len).sum()
    }

    fn check(&self, op: Operation) -> BackendResult<()> {
        {
            let mut ops = self.operations.write().unwrap();
            match op {
                Operation::Install => ops.installs += 1,
                Operation::Upgrade => ops.upgrades += 1,
                Operation::Uninstall => ops.uninstalls += 1,
                Operation::List => ops.lists += 1,
            }
        }

        if self.failing.read().unwrap().contains(&op) {
            return Err(BackendError::Rejected(format!("injected {:?} failure", op)));
        }
        Ok(())
    }

    async fn delay(&self) {
        let latency = *self.latency.read().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl InstallAction for MockBackend {
    async fn install(&self, chart: &LoadedChart, opts: &InstallOptions) -> BackendResult<Release> {
        self.check(Operation::Install)?;
        self.delay().await;

        let mut store = self.store.write().unwrap();
        let ns = store.entry(opts.namespace.clone()).or_default();
        if ns.contains_key(&opts.name) {
            return Err(BackendError::Rejected(format!(
                "cannot re-use a name that is still in use: {}",
                opts.name
            )));
        }

        let mut release = Release::deployed(&opts.name, &opts.namespace, chart.reference());
        release.app_version = chart.app_version.clone().unwrap_or_default();
        ns.insert(opts.name.clone(), release.clone());
        Ok(release)
    }
}

#[async_trait]
impl UpgradeAction for MockBackend {
    async fn upgrade(&self, chart: &LoadedChart, opts: &UpgradeOptions) -> BackendResult<Release> {
        self.check(Operation::Upgrade)?;
        self.delay().await;

        let mut store = self.store.write().unwrap();
        let ns = store.entry(opts.namespace.clone()).or_default();
        let release = match ns.get(&opts.name) {
            Some(existing) => Release {
                revision: existing.revision + 1,
                status: ReleaseStatus::Deployed,
                chart: chart.reference(),
                updated: Some(chrono::Utc::now()),
                ..existing.clone()
            },
            None if opts.install => Release::deployed(&opts.name, &opts.namespace, chart.reference()),
            None => {
                return Err(BackendError::Rejected(format!(
                    "\"{}\" has no deployed releases",
                    opts.name
                )));
            }
        };
        ns.insert(opts.name.clone(), release.clone());
        Ok(release)
    }
}

#[async_trait]
impl UninstallAction for MockBackend {
    async fn uninstall(&self, opts: &UninstallOptions) -> BackendResult<UninstallResponse> {
        self.check(Operation::Uninstall)?;
        self.delay().await;

        let mut store = self.store.write().unwrap();
        store
            .get_mut(&opts.namespace)
            .and_then(|ns| ns.remove(&opts.name))
            .map(|release| UninstallResponse {
                info: format!("release \"{}\" uninstalled", release.name),
                release: release.name,
            })
            .ok_or_else(|| BackendError::Rejected(format!("release: not found: {}", opts.name)))
    }
}

#[async_trait]
impl ListAction for MockBackend {
    async fn list(&self, opts: &ListOptions) -> BackendResult<Vec<Release>> {
        self.check(Operation::List)?;

        let store = self.store.read().unwrap();
        let mut releases: Vec<Release> = store
            .get(&opts.namespace)
            .map(|ns| {
                ns.values()
                    .filter(|r| {
                        opts.prefix
                            .as_deref()
                            .is_none_or(|prefix| r.name.starts_with(prefix))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        releases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(releases)
    }
}
