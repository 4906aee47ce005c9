//! Chart materialization from a source template
//!
//! Every environment gets its own copy of the source chart under
//! `output_dir/<prefix><name>`. Materialization is idempotent: when the
//! chart directory already exists it is returned untouched.
//!
//! Files are first written into a hidden staging directory next to the
//! target and renamed into place once complete. A failed materialization
//! removes the staging directory, so the target path only ever holds a
//! complete chart.

use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::metadata::ChartMetadata;
use crate::settings::Settings;

/// Mode of a materialized chart directory
#[cfg(unix)]
const CHART_DIR_MODE: u32 = 0o755;

/// Chart definition file name
pub const CHART_FILE: &str = "Chart.yaml";

/// Placeholder replaced with the qualified name in every text file
pub const CHART_NAME_PLACEHOLDER: &str = "<CHARTNAME>";

/// Result of a materialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedChart {
    /// Qualified release name
    pub name: String,

    /// Chart directory
    pub path: PathBuf,

    /// `false` when an existing chart was reused
    pub created: bool,
}

/// Creates per-environment charts from the configured source template
#[derive(Debug, Clone)]
pub struct ChartFactory {
    source_dir: PathBuf,
    output_dir: PathBuf,
    env_prefix: String,
}

impl ChartFactory {
    pub fn new(settings: &Settings) -> Self {
        Self {
            source_dir: settings.source_dir.clone(),
            output_dir: settings.output_dir.clone(),
            env_prefix: settings.env_prefix.clone(),
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Materialize the chart for `metadata`, reusing an existing one
    pub fn materialize(&self, metadata: &ChartMetadata) -> Result<MaterializedChart> {
        tracing::debug!(source = %self.source_dir.display(), "materializing chart");

        if !self.source_dir.is_dir() {
            return Err(CoreError::SourceNotFound {
                path: self.source_dir.clone(),
            });
        }
        if !self.output_dir.is_dir() {
            return Err(CoreError::OutputDirNotFound {
                path: self.output_dir.clone(),
            });
        }

        let name = metadata.qualified_name(&self.env_prefix)?;
        let path = self.output_dir.join(&name);

        if path.exists() {
            tracing::info!(chart = %name, "chart already exists, skipping creation");
            return Ok(MaterializedChart {
                name,
                path,
                created: false,
            });
        }

        tracing::info!(
            chart = %name,
            source = %self.source_dir.display(),
            destination = %self.output_dir.display(),
            "creating chart from source"
        );

        let staging = tempfile::Builder::new()
            .prefix(&format!(".{name}.staging-"))
            .tempdir_in(&self.output_dir)
            .map_err(|e| materialize_err(&name, e.into()))?;

        copy_template(&self.source_dir, staging.path(), &name, metadata)
            .and_then(|_| open_permissions(staging.path()))
            .map_err(|e| materialize_err(&name, e))?;

        if let Err(e) = std::fs::rename(staging.path(), &path) {
            // A concurrent request may have won the rename
            if path.exists() {
                tracing::info!(chart = %name, "chart was created concurrently, reusing it");
                return Ok(MaterializedChart {
                    name,
                    path,
                    created: false,
                });
            }
            return Err(materialize_err(&name, e.into()));
        }

        tracing::info!(chart = %name, path = %path.display(), "created chart");
        Ok(MaterializedChart {
            name,
            path,
            created: true,
        })
    }
}

fn materialize_err(name: &str, source: CoreError) -> CoreError {
    CoreError::Materialize {
        name: name.to_string(),
        source: Box::new(source),
    }
}

/// Copy the source tree into `dest`, stamping metadata and substituting the name
fn copy_template(source: &Path, dest: &Path, name: &str, metadata: &ChartMetadata) -> Result<()> {
    let chart_file = source.join(CHART_FILE);
    if !chart_file.is_file() {
        return Err(CoreError::InvalidChart {
            message: format!("{} not found in {}", CHART_FILE, source.display()),
        });
    }

    for entry in walkdir::WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| {
            CoreError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop in source chart")),
            )
        })?;

        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| CoreError::InvalidChart {
                message: e.to_string(),
            })?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }

        if relative == Path::new(CHART_FILE) {
            let content = std::fs::read_to_string(entry.path())?;
            std::fs::write(&target, stamp_chart_file(&content, name, metadata)?)?;
            continue;
        }

        let bytes = std::fs::read(entry.path())?;
        match String::from_utf8(bytes) {
            Ok(text) => std::fs::write(&target, text.replace(CHART_NAME_PLACEHOLDER, name))?,
            Err(raw) => std::fs::write(&target, raw.into_bytes())?,
        }
    }

    Ok(())
}

/// Staging directories are created private; charts are world-readable
#[cfg(unix)]
fn open_permissions(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(CHART_DIR_MODE))?;
    Ok(())
}

#[cfg(not(unix))]
fn open_permissions(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Overwrite name, version and description in a Chart.yaml, keeping every other key
fn stamp_chart_file(content: &str, name: &str, metadata: &ChartMetadata) -> Result<String> {
    let mut chart = match serde_yaml::from_str::<Value>(content)? {
        Value::Mapping(map) => map,
        Value::Null => Mapping::new(),
        _ => {
            return Err(CoreError::InvalidChart {
                message: format!("{CHART_FILE} must be a mapping"),
            });
        }
    };

    chart.insert("name".into(), Value::String(name.to_string()));
    chart.insert("version".into(), Value::String(metadata.version.to_string()));
    if let Some(description) = &metadata.description {
        chart.insert("description".into(), Value::String(description.clone()));
    }

    Ok(serde_yaml::to_string(&chart)?)
}
