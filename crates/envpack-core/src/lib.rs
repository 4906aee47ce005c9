//! Envpack Core - Environment charts and their values documents
//!
//! This crate provides the filesystem side of environment management:
//! - `Settings`: Namespace, directories, driver and prefix for one deployment
//! - `ChartMetadata`: What a caller supplies when requesting an environment
//! - `ChartFactory`: Materializes a per-environment chart from a source template
//! - `ValuesDocument` / `ValuesStore`: Order-preserving values with atomic writes
//! - `ScaleAction`: The closed set of scaling intents

pub mod chart;
pub mod error;
pub mod metadata;
pub mod scale;
pub mod settings;
pub mod values;

pub use chart::{CHART_FILE, CHART_NAME_PLACEHOLDER, ChartFactory, MaterializedChart};
pub use error::{CoreError, Result};
pub use metadata::{ChartMetadata, MAX_RELEASE_NAME_LEN, is_managed, qualify, validate_prefix};
pub use scale::ScaleAction;
pub use settings::Settings;
pub use values::{
    FsValuesStore, MemoryValuesStore, REPLICAS_KEY, VALUES_FILE, ValuesDocument, ValuesPatcher,
    ValuesStore,
};
