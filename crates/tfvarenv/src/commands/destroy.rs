use super::{load_environment, load_registry, resolve_version_id, workspace};
use colored::Colorize;
use tfvarenv_core::workflow::{DestroyRequest, destroy};

pub async fn handle(
    name: &str,
    version_id: Option<String>,
    auto_approve: bool,
    extra_args: Vec<String>,
) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let env = load_environment(&registry, name)?;
    let ws = workspace(&registry, &env).await;

    let request = DestroyRequest {
        version_id: resolve_version_id(&ws, &env, version_id).await?,
        auto_approve,
        extra_args,
    };
    println!("{}", format!("Destroying {} ...", env.name).red().bold());
    let outcome = destroy(&ws, &env, &request).await?;

    println!();
    println!(
        "{} Destroyed {} (variables from version {}) in {:.1}s",
        "✓".green(),
        env.name.cyan().bold(),
        outcome.version.short_id().cyan(),
        outcome.result.duration.as_secs_f64()
    );
    Ok(())
}
