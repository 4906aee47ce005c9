//! Chart loaders

use envpack_core::CHART_FILE;
use semver::Version;
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::BackendError;
use crate::ports::{BackendResult, ChartLoader};
use crate::release::LoadedChart;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartHeader {
    name: String,
    version: String,
    #[serde(default)]
    app_version: Option<String>,
}

/// Loads a chart from its directory on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct DirChartLoader;

impl ChartLoader for DirChartLoader {
    fn load(&self, path: &Path) -> BackendResult<LoadedChart> {
        let invalid = |message: String| BackendError::InvalidChart {
            path: path.to_path_buf(),
            message,
        };

        if !path.is_dir() {
            return Err(invalid("chart directory does not exist".to_string()));
        }

        let content = std::fs::read_to_string(path.join(CHART_FILE))
            .map_err(|e| invalid(format!("cannot read {CHART_FILE}: {e}")))?;
        let header: ChartHeader = serde_yaml::from_str(&content)
            .map_err(|e| invalid(format!("cannot parse {CHART_FILE}: {e}")))?;
        let version = Version::parse(&header.version)
            .map_err(|e| invalid(format!("invalid version '{}': {e}", header.version)))?;

        Ok(LoadedChart {
            path: path.to_path_buf(),
            name: header.name,
            version,
            app_version: header.app_version,
        })
    }
}

/// Loader that accepts any path, naming the chart after its directory
#[derive(Clone, Default)]
pub struct MockChartLoader {
    fail: Arc<RwLock<bool>>,
    loads: Arc<RwLock<usize>>,
}

impl MockChartLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_loads(&self, fail: bool) {
        *self.fail.write().unwrap() = fail;
    }

    pub fn load_count(&self) -> usize {
        *self.loads.read().unwrap()
    }
}

impl ChartLoader for MockChartLoader {
    fn load(&self, path: &Path) -> BackendResult<LoadedChart> {
        *self.loads.write().unwrap() += 1;

        if *self.fail.read().unwrap() {
            return Err(BackendError::InvalidChart {
                path: path.to_path_buf(),
                message: "injected load failure".to_string(),
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(LoadedChart {
            path: path.to_path_buf(),
            name,
            version: Version::new(0, 1, 0),
            app_version: None,
        })
    }
}
