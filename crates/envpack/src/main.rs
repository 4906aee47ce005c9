//! Envpack - Provision, scale and tear down chart-based environments

use clap::{Parser, Subcommand};
use envpack_core::ScaleAction;
use semver::Version;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;
mod exit_codes;
mod server;

use commands::serve::CredentialArgs;
use config::SettingsArgs;

#[derive(Parser)]
#[command(name = "envpack")]
#[command(version)]
#[command(about = "Provision, scale and tear down chart-based environments", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    settings: SettingsArgs,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "ENVPACK_BIND", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        /// Seconds to let in-flight requests finish after a shutdown signal
        #[arg(long, env = "ENVPACK_SHUTDOWN_TIMEOUT", default_value_t = 15)]
        shutdown_timeout: u64,

        /// Kubernetes Secret to read API keys from
        #[arg(long, env = "ENVPACK_CREDENTIALS_SECRET")]
        credentials_secret: Option<String>,

        /// Namespace of the credentials secret (defaults to --namespace)
        #[arg(long, env = "ENVPACK_CREDENTIALS_NAMESPACE")]
        credentials_namespace: Option<String>,

        /// Read a secret data key as a credential (SECRET_KEY=CREDENTIAL, repeatable)
        #[arg(long = "credential-key", value_parser = commands::serve::parse_mapping)]
        credential_keys: Vec<(String, String)>,
    },

    /// Create an environment chart and install it
    Create {
        /// Environment name, without the managed prefix
        name: String,

        /// Chart version
        #[arg(long = "chart-version", default_value = "0.1.0")]
        chart_version: Version,

        /// Chart description
        #[arg(long)]
        description: Option<String>,

        /// Only write the chart, do not install
        #[arg(long)]
        no_install: bool,
    },

    /// Upgrade an environment from its chart
    Upgrade {
        /// Environment name
        name: String,
    },

    /// Scale an environment up or down
    Scale {
        /// Environment name
        name: String,

        /// up or down
        action: ScaleAction,
    },

    /// Uninstall an environment and remove its chart
    Uninstall {
        /// Environment name
        name: String,
    },

    /// List managed environments
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(debug: bool, serving: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("ENVPACK_LOG")
            .unwrap_or_else(|_| EnvFilter::new(if serving { "info" } else { "warn" }))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug, matches!(cli.command, Commands::Serve { .. }));

    let settings = &cli.settings;
    let result = match cli.command {
        Commands::Serve {
            bind,
            shutdown_timeout,
            credentials_secret,
            credentials_namespace,
            credential_keys,
        } => {
            let credentials = CredentialArgs {
                secret: credentials_secret,
                namespace: credentials_namespace,
                mappings: credential_keys,
            };
            commands::serve::run(settings, bind, shutdown_timeout, &credentials).await
        }

        Commands::Create {
            name,
            chart_version,
            description,
            no_install,
        } => {
            commands::create::run(
                settings,
                &name,
                chart_version,
                description.as_deref(),
                no_install,
            )
            .await
        }

        Commands::Upgrade { name } => commands::upgrade::run(settings, &name).await,

        Commands::Scale { name, action } => commands::scale::run(settings, &name, action).await,

        Commands::Uninstall { name } => commands::uninstall::run(settings, &name).await,

        Commands::List { json } => commands::list::run(settings, json).await,
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
