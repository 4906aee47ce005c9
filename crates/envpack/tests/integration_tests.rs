//! Integration tests for CLI commands

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "ENVPACK_NAMESPACE",
    "ENVPACK_OUTPUT_DIR",
    "ENVPACK_SOURCE_DIR",
    "ENVPACK_ENV_PREFIX",
    "ENVPACK_LOCK_TIMEOUT",
    "ENVPACK_HELM_BINARY",
    "ENVPACK_KUBE_CONTEXT",
    "ENVPACK_BIND",
    "ENVPACK_CREDENTIALS_SECRET",
    "ENVPACK_CREDENTIALS_NAMESPACE",
    "ENVPACK_CREATE_API_KEY",
    "ENVPACK_UPDATE_API_KEY",
    "ENVPACK_DELETE_API_KEY",
    "ENVPACK_LOG",
];

/// Helper to run envpack with a clean environment
fn envpack(args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_envpack"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1")
        .args(args)
        .output()
        .expect("Failed to execute envpack")
}

/// A source chart and an empty output directory
fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    std::fs::create_dir_all(source.join("templates")).unwrap();
    std::fs::create_dir_all(tmp.path().join("charts")).unwrap();
    std::fs::write(
        source.join("Chart.yaml"),
        "apiVersion: v2\nname: mariadb\nversion: 1.0.0\ndescription: source\n",
    )
    .unwrap();
    std::fs::write(source.join("values.yaml"), "replicas: 1\n").unwrap();
    std::fs::write(
        source.join("templates/service.yaml"),
        "metadata:\n  name: {{ .Release.Name }}\n",
    )
    .unwrap();
    tmp
}

fn dirs(tmp: &Path) -> (String, String) {
    (
        tmp.join("source").display().to_string(),
        tmp.join("charts").display().to_string(),
    )
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_help_lists_commands() {
    let output = envpack(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["serve", "create", "upgrade", "scale", "uninstall", "list"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

mod create_command {
    use super::*;

    #[test]
    fn test_create_without_install_writes_chart() {
        let tmp = workspace();
        let (source, charts) = dirs(tmp.path());

        let output = envpack(&[
            "create",
            "demo",
            "--chart-version",
            "0.3.0",
            "--no-install",
            "--source-dir",
            &source,
            "--output-dir",
            &charts,
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let chart = tmp.path().join("charts/test-demo");
        assert!(chart.join("values.yaml").is_file());
        let chart_yaml = std::fs::read_to_string(chart.join("Chart.yaml")).unwrap();
        assert!(chart_yaml.contains("name: test-demo"));
        assert!(chart_yaml.contains("version: 0.3.0"));
    }

    #[test]
    fn test_create_twice_is_idempotent() {
        let tmp = workspace();
        let (source, charts) = dirs(tmp.path());
        let args = [
            "create",
            "demo",
            "--no-install",
            "--source-dir",
            &source,
            "--output-dir",
            &charts,
        ];

        assert!(envpack(&args).status.success());
        let output = envpack(&args);

        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("already present"));
    }

    #[test]
    fn test_create_with_missing_source() {
        let tmp = workspace();
        let (_, charts) = dirs(tmp.path());
        let missing = tmp.path().join("nope").display().to_string();

        let output = envpack(&[
            "create",
            "demo",
            "--source-dir",
            &missing,
            "--output-dir",
            &charts,
        ]);

        assert_eq!(output.status.code(), Some(5));
        assert!(stderr(&output).contains("does not exist"));
        assert!(!tmp.path().join("charts/test-demo").exists());
    }

    #[test]
    fn test_create_with_invalid_name() {
        let tmp = workspace();
        let (source, charts) = dirs(tmp.path());

        let output = envpack(&[
            "create",
            "Bad_Name",
            "--no-install",
            "--source-dir",
            &source,
            "--output-dir",
            &charts,
        ]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("invalid release name"));
    }
}

mod backend_commands {
    use super::*;

    #[test]
    fn test_scale_rejects_unknown_action() {
        let output = envpack(&["scale", "demo", "sideways"]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_list_without_helm_is_backend_error() {
        let output = envpack(&["list", "--helm-binary", "/nonexistent/helm"]);

        assert_eq!(output.status.code(), Some(6));
        assert!(stderr(&output).contains("failed to list releases"));
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        let output = envpack(&[
            "list",
            "--env-prefix",
            "",
            "--helm-binary",
            "/nonexistent/helm",
        ]);

        assert_eq!(output.status.code(), Some(78));
        assert!(stderr(&output).contains("prefix must not be empty"));
    }

    #[test]
    fn test_upgrade_without_helm_is_backend_error() {
        let output = envpack(&["upgrade", "demo", "--helm-binary", "/nonexistent/helm"]);
        assert_eq!(output.status.code(), Some(6));
    }
}

mod serve_command {
    use super::*;

    #[test]
    fn test_serve_requires_api_keys() {
        let output = envpack(&["serve", "--bind", "127.0.0.1:0"]);

        assert_eq!(output.status.code(), Some(78));
        assert!(stderr(&output).contains("ENVPACK_CREATE_API_KEY"));
    }
}
