//! Envpack Kube - Release lifecycle management for environment charts
//!
//! This crate provides:
//! - **Release Manager**: install, upgrade, scale and uninstall with one-release-per-name semantics
//! - **Ports**: async backend actions plus chart loading and file housekeeping
//! - **Backends**: the `helm` CLI adapter and an in-memory mock
//! - **Locks**: per-release exclusive locks with a bounded wait
//! - **Credentials**: bootstrap from the environment or a Kubernetes Secret

pub mod actions;
pub mod backend;
pub mod credentials;
pub mod error;
pub mod files;
pub mod loader;
pub mod locks;
pub mod manager;
pub mod ports;
pub mod release;

pub use actions::{
    DRY_RUN, InstallOptions, ListOptions, OPERATION_TIMEOUT, UninstallOptions, UpgradeOptions,
    WAIT,
};
pub use backend::{HELM_BINARY, HelmCli, MockBackend, Operation, OperationCounts};
pub use credentials::{
    ApiKeys, CREATE_API_KEY, CredentialSource, Credentials, DELETE_API_KEY, EnvCredentialSource,
    REQUIRED_KEYS, SecretCredentialSource, StaticCredentialSource, UPDATE_API_KEY,
};
pub use error::{BackendError, CredentialError, ReleaseError, Result};
pub use files::{FsChartFiles, MockChartFiles};
pub use loader::{DirChartLoader, MockChartLoader};
pub use locks::{ReleaseGuard, ReleaseLocks};
pub use manager::{Provisioned, ReleaseManager};
pub use ports::{
    BackendResult, ChartFiles, ChartLoader, InstallAction, ListAction, Ports, UninstallAction,
    UpgradeAction,
};
pub use release::{LoadedChart, Release, ReleaseStatus, UninstallResponse};
