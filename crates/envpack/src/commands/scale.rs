//! Scale command - switch an environment's replicas on or off

use console::style;
use envpack_core::ScaleAction;

use crate::config::SettingsArgs;
use crate::error::Result;

pub async fn run(settings: &SettingsArgs, name: &str, action: ScaleAction) -> Result<()> {
    let manager = settings.manager()?;

    println!(
        "{} Scaling {} {} ({} replicas)",
        style("→").blue().bold(),
        style(name).cyan(),
        action,
        action.replicas()
    );
    let release = manager.set_scale(name, action).await?;

    println!(
        "{} Scaled {} {}, now at revision {}",
        style("✓").green().bold(),
        style(&release.name).cyan(),
        action,
        style(release.revision).yellow()
    );

    Ok(())
}
