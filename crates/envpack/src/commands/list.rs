//! List command - list managed environments

use console::style;
use envpack_kube::ReleaseStatus;

use crate::config::SettingsArgs;
use crate::error::{CliError, Result};

/// Run the list command
pub async fn run(settings: &SettingsArgs, output_json: bool) -> Result<()> {
    let manager = settings.manager()?;
    let releases = manager.list().await?;

    if output_json {
        let json = serde_json::to_string_pretty(&releases).map_err(|e| CliError::Io {
            message: e.to_string(),
        })?;
        println!("{}", json);
        return Ok(());
    }

    if releases.is_empty() {
        println!(
            "No envpack environments found in namespace {}",
            manager.settings().namespace
        );
        return Ok(());
    }

    println!(
        "{:<30} {:<10} {:<18} {:<25} {:<20}",
        style("NAME").bold(),
        style("REVISION").bold(),
        style("STATUS").bold(),
        style("CHART").bold(),
        style("UPDATED").bold()
    );

    for release in releases {
        let status = release.status.to_string();
        let status_style = match release.status {
            ReleaseStatus::Deployed => style(status).green(),
            ReleaseStatus::Failed => style(status).red(),
            s if s.is_pending() => style(status).yellow(),
            _ => style(status).dim(),
        };
        let updated = release
            .updated
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<30} {:<10} {:<18} {:<25} {:<20}",
            release.name, release.revision, status_style, release.chart, updated
        );
    }

    Ok(())
}
