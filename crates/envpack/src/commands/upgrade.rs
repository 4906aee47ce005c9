//! Upgrade command - re-apply an environment's chart

use console::style;

use crate::config::SettingsArgs;
use crate::error::Result;

/// Run the upgrade command
pub async fn run(settings: &SettingsArgs, name: &str) -> Result<()> {
    let manager = settings.manager()?;

    println!(
        "{} Upgrading environment {}",
        style("→").blue().bold(),
        style(name).cyan()
    );
    let release = manager.upgrade(name).await?;

    println!(
        "{} Upgraded {} to revision {}",
        style("✓").green().bold(),
        style(&release.name).cyan(),
        style(release.revision).yellow()
    );

    Ok(())
}
