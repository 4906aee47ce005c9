//! Chart directory housekeeping

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::ports::ChartFiles;

/// Local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsChartFiles;

impl ChartFiles for FsChartFiles {
    fn exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-memory set of chart directories for tests
#[derive(Clone, Default)]
pub struct MockChartFiles {
    dirs: Arc<RwLock<HashSet<PathBuf>>>,
    fail_removes: Arc<RwLock<bool>>,
    removed: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockChartFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.dirs.write().unwrap().insert(path.into());
        self
    }

    pub fn fail_removes(&self, fail: bool) {
        *self.fail_removes.write().unwrap() = fail;
    }

    /// Paths removed so far, in order
    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.read().unwrap().clone()
    }
}

impl ChartFiles for MockChartFiles {
    fn exists(&self, path: &Path) -> bool {
        self.dirs.read().unwrap().contains(path)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        if *self.fail_removes.read().unwrap() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected remove failure",
            ));
        }
        self.dirs.write().unwrap().remove(path);
        self.removed.write().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
