use super::{load_environment, load_registry};
use crate::console::TerminalConsole;
use colored::Colorize;
use tfvarenv_core::Console;
use tfvarenv_core::files::{self, BackupOptions};
use tfvarenv_core::workflow::BACKUP_DIR;

pub async fn handle(name: &str, yes: bool) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let env = load_environment(&registry, name)?;

    if !yes {
        println!(
            "Files in {} are kept; only the registry entry is removed.",
            env.s3_uri()
        );
        let confirmed =
            TerminalConsole.confirm(&format!("Remove environment '{}'?", env.name), false)?;
        if !confirmed {
            println!("{}", "Cancelled".yellow());
            return Ok(());
        }
    }

    let root = registry.project_root();
    let local = root.join(&env.local.tfvars_path);
    if files::exists(&local).await {
        let options = BackupOptions::new(root.join(BACKUP_DIR).join(&env.name));
        let backup = files::create_backup(&local, &options).await?;
        println!(
            "{} Backed up {} to {}",
            "✓".green(),
            env.local.tfvars_path,
            backup.display()
        );
    }

    registry.remove_environment(name)?;
    println!("{} Removed environment {}", "✓".green(), name.cyan());
    Ok(())
}
