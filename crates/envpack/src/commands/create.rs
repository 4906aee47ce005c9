//! Create command - materialize an environment chart and install it

use console::style;
use envpack_core::ChartMetadata;
use semver::Version;

use crate::config::SettingsArgs;
use crate::error::Result;

/// Run the create command
pub async fn run(
    settings: &SettingsArgs,
    name: &str,
    version: Version,
    description: Option<&str>,
    no_install: bool,
) -> Result<()> {
    let manager = settings.manager()?;

    let mut metadata = ChartMetadata::new(name).with_version(version);
    if let Some(description) = description {
        metadata = metadata.with_description(description);
    }

    let chart = manager.create_release(&metadata)?;
    if chart.created {
        println!(
            "{} Created chart {} in {}",
            style("✓").green().bold(),
            style(&chart.name).cyan(),
            chart.path.display()
        );
    } else {
        println!(
            "{} Chart {} already present in {}",
            style("→").blue().bold(),
            style(&chart.name).cyan(),
            chart.path.display()
        );
    }

    if no_install {
        return Ok(());
    }

    println!(
        "{} Installing {} into namespace {}",
        style("→").blue().bold(),
        style(&chart.name).cyan(),
        style(&manager.settings().namespace).yellow()
    );
    let release = manager.install(&chart.path, name).await?;

    println!(
        "{} Installed {} (revision {}, {})",
        style("✓").green().bold(),
        style(&release.name).cyan(),
        style(release.revision).yellow(),
        release.status
    );

    Ok(())
}
