//! `helm` CLI adapter
//!
//! Each action runs the helm binary once with `--namespace`, and the
//! release storage driver passed through `HELM_DRIVER`. Output is requested
//! as JSON where helm offers it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use crate::actions::{InstallOptions, ListOptions, UninstallOptions, UpgradeOptions};
use crate::error::BackendError;
use crate::ports::{BackendResult, InstallAction, ListAction, UninstallAction, UpgradeAction};
use crate::release::{LoadedChart, Release, ReleaseStatus, UninstallResponse};

/// Default helm executable, resolved through PATH
pub const HELM_BINARY: &str = "helm";

/// Packaging backend backed by the helm binary
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
    driver: String,
    kube_context: Option<String>,
}

impl HelmCli {
    /// Create an adapter storing releases with `driver` (secrets, configmap, memory, sql)
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            binary: PathBuf::from(HELM_BINARY),
            driver: driver.into(),
            kube_context: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_kube_context(mut self, context: impl Into<String>) -> Self {
        self.kube_context = Some(context.into());
        self
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    fn install_args(&self, chart: &LoadedChart, opts: &InstallOptions) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            opts.name.clone(),
            chart.path.display().to_string(),
        ];
        self.push_common(&mut args, &opts.namespace);
        push_wait(&mut args, opts.wait, opts.timeout);
        if opts.dry_run {
            args.push("--dry-run".to_string());
        }
        push_json_output(&mut args);
        args
    }

    fn upgrade_args(&self, chart: &LoadedChart, opts: &UpgradeOptions) -> Vec<String> {
        let mut args = vec![
            "upgrade".to_string(),
            opts.name.clone(),
            chart.path.display().to_string(),
        ];
        self.push_common(&mut args, &opts.namespace);
        if opts.install {
            args.push("--install".to_string());
        }
        if opts.force {
            args.push("--force".to_string());
        }
        push_wait(&mut args, opts.wait, opts.timeout);
        if opts.dry_run {
            args.push("--dry-run".to_string());
        }
        push_json_output(&mut args);
        args
    }

    fn uninstall_args(&self, opts: &UninstallOptions) -> Vec<String> {
        let mut args = vec!["uninstall".to_string(), opts.name.clone()];
        self.push_common(&mut args, &opts.namespace);
        push_wait(&mut args, opts.wait, opts.timeout);
        args
    }

    fn list_args(&self, opts: &ListOptions) -> Vec<String> {
        let mut args = vec!["list".to_string()];
        self.push_common(&mut args, &opts.namespace);
        if opts.all_states {
            args.push("--all".to_string());
        }
        // helm caps list output at 256 releases by default
        args.push("--max".to_string());
        args.push("0".to_string());
        if let Some(prefix) = &opts.prefix {
            args.push("--filter".to_string());
            args.push(format!("^{}", regex::escape(prefix)));
        }
        push_json_output(&mut args);
        args
    }

    fn push_common(&self, args: &mut Vec<String>, namespace: &str) {
        args.push("--namespace".to_string());
        args.push(namespace.to_string());
        if let Some(context) = &self.kube_context {
            args.push("--kube-context".to_string());
            args.push(context.clone());
        }
    }

    async fn run(&self, args: Vec<String>) -> BackendResult<String> {
        let command = format!(
            "{} {}",
            self.binary.display(),
            args.first().map(String::as_str).unwrap_or_default()
        );
        tracing::debug!(%command, ?args, driver = %self.driver, "running helm");

        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .env("HELM_DRIVER", &self.driver)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| BackendError::Spawn {
                program: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                command,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn push_wait(args: &mut Vec<String>, wait: bool, timeout: Duration) {
    if wait {
        args.push("--wait".to_string());
    }
    args.push("--timeout".to_string());
    args.push(format!("{}s", timeout.as_secs()));
}

fn push_json_output(args: &mut Vec<String>) {
    args.push("--output".to_string());
    args.push("json".to_string());
}

/// One entry of `helm list --output json`
#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    namespace: String,
    revision: String,
    #[serde(default)]
    updated: String,
    status: ReleaseStatus,
    chart: String,
    #[serde(default)]
    app_version: String,
}

/// Release document printed by `helm install|upgrade --output json`
#[derive(Debug, Deserialize)]
struct ReleaseDocument {
    name: String,
    namespace: String,
    version: u32,
    info: ReleaseInfo,
    chart: ChartDocument,
    #[serde(default)]
    manifest: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    status: ReleaseStatus,
    #[serde(default)]
    last_deployed: String,
}

#[derive(Debug, Deserialize)]
struct ChartDocument {
    metadata: ChartDocumentMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartDocumentMetadata {
    name: String,
    version: String,
    #[serde(default)]
    app_version: String,
}

fn parse_list(stdout: &str) -> BackendResult<Vec<Release>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<ListEntry> = serde_json::from_str(stdout)?;
    entries
        .into_iter()
        .map(|entry| {
            let revision = entry.revision.parse().map_err(|_| {
                BackendError::Parse(format!(
                    "revision '{}' of release '{}' is not a number",
                    entry.revision, entry.name
                ))
            })?;
            Ok(Release {
                name: entry.name,
                namespace: entry.namespace,
                revision,
                status: entry.status,
                chart: entry.chart,
                app_version: entry.app_version,
                updated: parse_list_timestamp(&entry.updated),
            })
        })
        .collect()
}

fn parse_release(stdout: &str) -> BackendResult<Release> {
    let doc: ReleaseDocument = serde_json::from_str(stdout)?;
    tracing::debug!(release = %doc.name, manifest = %doc.manifest, "backend applied manifest");

    Ok(Release {
        name: doc.name,
        namespace: doc.namespace,
        revision: doc.version,
        status: doc.info.status,
        chart: format!("{}-{}", doc.chart.metadata.name, doc.chart.metadata.version),
        app_version: doc.chart.metadata.app_version,
        updated: DateTime::parse_from_rfc3339(&doc.info.last_deployed)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
    })
}

/// Parse helm's list timestamp, e.g. `2024-05-01 10:11:12.123456789 +0000 UTC`
fn parse_list_timestamp(value: &str) -> Option<DateTime<Utc>> {
    // Drop the trailing zone abbreviation, the numeric offset is authoritative
    let trimmed = value
        .rsplit_once(' ')
        .filter(|(_, zone)| zone.chars().all(|c| c.is_ascii_alphabetic()))
        .map(|(rest, _)| rest)
        .unwrap_or(value);

    DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f %z")
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[async_trait]
impl InstallAction for HelmCli {
    async fn install(&self, chart: &LoadedChart, opts: &InstallOptions) -> BackendResult<Release> {
        let stdout = self.run(self.install_args(chart, opts)).await?;
        parse_release(&stdout)
    }
}

#[async_trait]
impl UpgradeAction for HelmCli {
    async fn upgrade(&self, chart: &LoadedChart, opts: &UpgradeOptions) -> BackendResult<Release> {
        let stdout = self.run(self.upgrade_args(chart, opts)).await?;
        parse_release(&stdout)
    }
}

#[async_trait]
impl UninstallAction for HelmCli {
    async fn uninstall(&self, opts: &UninstallOptions) -> BackendResult<UninstallResponse> {
        let stdout = self.run(self.uninstall_args(opts)).await?;
        Ok(UninstallResponse {
            release: opts.name.clone(),
            info: stdout.trim().to_string(),
        })
    }
}

#[async_trait]
impl ListAction for HelmCli {
    async fn list(&self, opts: &ListOptions) -> BackendResult<Vec<Release>> {
        let stdout = self.run(self.list_args(opts)).await?;
        parse_list(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use semver::Version;

    fn chart() -> LoadedChart {
        LoadedChart {
            path: PathBuf::from("charts/test-db"),
            name: "test-db".to_string(),
            version: Version::new(0, 1, 0),
            app_version: None,
        }
    }

    #[test]
    fn test_install_args() {
        let helm = HelmCli::new("secrets");
        let args = helm.install_args(&chart(), &InstallOptions::new("test-db", "helm-api-pg"));
        assert_eq!(
            args,
            vec![
                "install",
                "test-db",
                "charts/test-db",
                "--namespace",
                "helm-api-pg",
                "--wait",
                "--timeout",
                "300s",
                "--output",
                "json",
            ]
        );
    }

    #[test]
    fn test_upgrade_args_force_install() {
        let helm = HelmCli::new("secrets").with_kube_context("dev");
        let args = helm.upgrade_args(&chart(), &UpgradeOptions::new("test-db", "ns"));
        assert_eq!(
            args,
            vec![
                "upgrade",
                "test-db",
                "charts/test-db",
                "--namespace",
                "ns",
                "--kube-context",
                "dev",
                "--install",
                "--force",
                "--wait",
                "--timeout",
                "300s",
                "--output",
                "json",
            ]
        );
    }

    #[test]
    fn test_uninstall_args() {
        let helm = HelmCli::new("configmap");
        let args = helm.uninstall_args(&UninstallOptions::new("test-db", "ns"));
        assert_eq!(
            args,
            vec!["uninstall", "test-db", "--namespace", "ns", "--wait", "--timeout", "300s"]
        );
    }

    #[test]
    fn test_list_args_are_unbounded() {
        let args = HelmCli::new("secrets").list_args(&ListOptions::new("ns"));
        let max = args.iter().position(|a| a == "--max").unwrap();
        assert_eq!(args[max + 1], "0");
        assert!(!args.contains(&"--filter".to_string()));
    }

    #[test]
    fn test_list_args_anchor_and_escape_prefix() {
        let helm = HelmCli::new("secrets");
        let args = helm.list_args(&ListOptions::new("ns").with_prefix("test.env-"));
        assert_eq!(
            args,
            vec![
                "list",
                "--namespace",
                "ns",
                "--all",
                "--max",
                "0",
                "--filter",
                "^test\\.env\\-",
                "--output",
                "json",
            ]
        );
    }

    #[test]
    fn test_parse_list() {
        let stdout = r#"[
            {"name":"test-a","namespace":"ns","revision":"3","updated":"2024-05-01 10:11:12.123456789 +0000 UTC","status":"deployed","chart":"test-a-0.1.0","app_version":"11.4"},
            {"name":"test-b","namespace":"ns","revision":"1","updated":"","status":"failed","chart":"test-b-0.1.0","app_version":""}
        ]"#;

        let releases = parse_list(stdout).unwrap();
        assert_eq!(releases.len(), 2);

        assert_eq!(releases[0].name, "test-a");
        assert_eq!(releases[0].revision, 3);
        assert_eq!(releases[0].status, ReleaseStatus::Deployed);
        assert_eq!(releases[0].app_version, "11.4");
        let updated = releases[0].updated.unwrap();
        assert_eq!((updated.year(), updated.month(), updated.day()), (2024, 5, 1));
        assert_eq!(updated.hour(), 10);

        assert_eq!(releases[1].status, ReleaseStatus::Failed);
        assert!(releases[1].updated.is_none());
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_list("").unwrap().is_empty());
        assert!(parse_list("[]\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_list_rejects_garbage() {
        assert!(matches!(parse_list("Error: nope"), Err(BackendError::Parse(_))));
        let bad_revision = r#"[{"name":"a","namespace":"n","revision":"x","status":"deployed","chart":"c"}]"#;
        assert!(matches!(parse_list(bad_revision), Err(BackendError::Parse(_))));
    }

    #[test]
    fn test_parse_release_document() {
        let stdout = r#"{
            "name": "test-db",
            "namespace": "ns",
            "version": 2,
            "info": {"first_deployed": "2024-05-01T10:00:00Z", "last_deployed": "2024-05-02T08:30:00.5Z", "deleted": "", "status": "deployed"},
            "chart": {"metadata": {"name": "test-db", "version": "0.2.0", "appVersion": "11.4"}},
            "manifest": "---\nkind: Service\n"
        }"#;

        let release = parse_release(stdout).unwrap();
        assert_eq!(release.name, "test-db");
        assert_eq!(release.revision, 2);
        assert_eq!(release.chart, "test-db-0.2.0");
        assert_eq!(release.app_version, "11.4");
        assert_eq!(release.updated.unwrap().day(), 2);
    }

    #[test]
    fn test_timestamp_with_offset() {
        let parsed = parse_list_timestamp("2024-05-01 12:11:12.5 +0200 CEST").unwrap();
        assert_eq!(parsed.hour(), 10);
        assert!(parse_list_timestamp("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let helm = HelmCli::new("secrets").with_binary("/nonexistent/helm-binary");
        let result = helm.list(&ListOptions::new("ns")).await;
        assert!(matches!(result, Err(BackendError::Spawn { .. })));
    }
}
