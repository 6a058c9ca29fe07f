use super::{load_environment, load_registry, resolve_version_id, workspace};
use colored::Colorize;
use tfvarenv_core::workflow::{DownloadOutcome, DownloadRequest, download};

pub async fn handle(name: &str, version_id: Option<String>, force: bool) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let env = load_environment(&registry, name)?;
    let ws = workspace(&registry, &env).await;

    let request = DownloadRequest {
        version_id: resolve_version_id(&ws, &env, version_id).await?,
        force,
    };
    match download(&ws, &env, &request).await? {
        DownloadOutcome::AlreadyCurrent(version) => {
            println!(
                "{} {} already matches version {}",
                "✓".green(),
                env.local.tfvars_path,
                version.short_id().cyan()
            );
        }
        DownloadOutcome::Written {
            version,
            path,
            backup,
        } => {
            if let Some(backup) = backup {
                println!("  Previous file backed up to {}", backup.display());
            }
            println!(
                "{} Downloaded version {} to {}",
                "✓".green(),
                version.short_id().cyan(),
                path.display()
            );
        }
    }
    Ok(())
}
