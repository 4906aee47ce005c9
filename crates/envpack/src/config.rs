//! Runtime settings from flags and environment

use clap::Args;
use envpack_core::Settings;
use envpack_core::settings::{
    DEFAULT_ENV_PREFIX, DEFAULT_HELM_DRIVER, DEFAULT_NAMESPACE, DEFAULT_OUTPUT_DIR,
    DEFAULT_SOURCE_DIR,
};
use envpack_kube::{HELM_BINARY, HelmCli, Ports, ReleaseManager};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CliError, Result};

/// Settings shared by every subcommand
#[derive(Debug, Clone, Args)]
pub struct SettingsArgs {
    /// Namespace all environments are installed into
    #[arg(long, global = true, env = "ENVPACK_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Directory holding one chart per environment
    #[arg(long, global = true, env = "ENVPACK_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Source chart copied for every new environment
    #[arg(long, global = true, env = "ENVPACK_SOURCE_DIR", default_value = DEFAULT_SOURCE_DIR)]
    pub source_dir: PathBuf,

    /// Helm release storage driver (secrets, configmap, memory, sql)
    #[arg(long, global = true, env = "HELM_DRIVER", default_value = DEFAULT_HELM_DRIVER)]
    pub helm_driver: String,

    /// Prefix marking releases managed by envpack
    #[arg(long, global = true, env = "ENVPACK_ENV_PREFIX", default_value = DEFAULT_ENV_PREFIX)]
    pub env_prefix: String,

    /// Seconds to wait for another operation on the same environment
    #[arg(long, global = true, env = "ENVPACK_LOCK_TIMEOUT", default_value_t = 10)]
    pub lock_timeout: u64,

    /// Helm executable
    #[arg(long, global = true, env = "ENVPACK_HELM_BINARY", default_value = HELM_BINARY)]
    pub helm_binary: PathBuf,

    /// Kubeconfig context passed to helm
    #[arg(long, global = true, env = "ENVPACK_KUBE_CONTEXT")]
    pub kube_context: Option<String>,
}

impl SettingsArgs {
    pub fn settings(&self) -> Result<Settings> {
        let settings = Settings::default()
            .with_namespace(&self.namespace)
            .with_output_dir(&self.output_dir)
            .with_source_dir(&self.source_dir)
            .with_helm_driver(&self.helm_driver)
            .with_env_prefix(&self.env_prefix)
            .with_lock_timeout(Duration::from_secs(self.lock_timeout));
        settings.validate().map_err(|e| {
            CliError::config_with_help(
                e.to_string(),
                "Set --env-prefix or ENVPACK_ENV_PREFIX to a prefix such as 'test-'",
            )
        })?;
        Ok(settings)
    }

    pub fn helm(&self) -> HelmCli {
        let helm = HelmCli::new(&self.helm_driver).with_binary(&self.helm_binary);
        match &self.kube_context {
            Some(context) => helm.with_kube_context(context),
            None => helm,
        }
    }

    /// Release manager backed by helm and the local filesystem
    pub fn manager(&self) -> Result<ReleaseManager> {
        Ok(ReleaseManager::new(self.settings()?, Ports::helm(self.helm())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: SettingsArgs,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "envpack",
            "--namespace",
            "envs",
            "--env-prefix",
            "dev-",
            "--lock-timeout",
            "3",
        ]);
        let settings = cli.settings.settings().unwrap();

        assert_eq!(settings.namespace, "envs");
        assert_eq!(settings.env_prefix, "dev-");
        assert_eq!(settings.lock_timeout, Duration::from_secs(3));
        assert_eq!(cli.settings.helm().driver(), cli.settings.helm_driver);
    }

    #[test]
    fn test_empty_prefix_is_config_error() {
        let cli = TestCli::parse_from(["envpack", "--env-prefix", ""]);
        let err = cli.settings.settings().unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::CONFIG_ERROR);
        assert!(cli.settings.manager().is_err());
    }
}
