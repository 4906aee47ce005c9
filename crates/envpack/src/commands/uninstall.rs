//! Uninstall command - remove an environment and its chart

use console::style;

use crate::config::SettingsArgs;
use crate::error::Result;

/// Run the uninstall command
pub async fn run(settings: &SettingsArgs, name: &str) -> Result<()> {
    let manager = settings.manager()?;

    println!(
        "{} Uninstalling environment {} from namespace {}",
        style("→").blue().bold(),
        style(name).cyan(),
        style(&manager.settings().namespace).yellow()
    );
    let response = manager.uninstall(name).await?;

    println!(
        "{} Uninstalled {}",
        style("✓").green().bold(),
        style(&response.release).cyan()
    );
    if !response.info.is_empty() {
        println!("  {}", response.info);
    }

    Ok(())
}
