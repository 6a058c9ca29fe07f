use super::{load_environment, load_registry, resolve_version_id, workspace};
use colored::Colorize;
use tfvarenv_core::workflow::{ApplyRequest, apply};

pub async fn handle(
    name: &str,
    remote: bool,
    version_id: Option<String>,
    auto_approve: bool,
    extra_args: Vec<String>,
) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let env = load_environment(&registry, name)?;
    let ws = workspace(&registry, &env).await;

    let request = ApplyRequest {
        remote,
        version_id: resolve_version_id(&ws, &env, version_id).await?,
        auto_approve,
        extra_args,
    };
    let outcome = apply(&ws, &env, &request).await?;

    println!();
    println!(
        "{} Applied version {} to {} in {:.1}s",
        "✓".green(),
        outcome.version.short_id().cyan(),
        env.name.cyan().bold(),
        outcome.result.duration.as_secs_f64()
    );
    println!(
        "  Recorded deployment by {} at {}",
        outcome.record.deployed_by,
        outcome.record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}
