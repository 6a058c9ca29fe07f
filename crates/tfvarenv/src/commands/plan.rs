use super::{load_environment, load_registry, resolve_version_id, workspace};
use colored::Colorize;
use tfvarenv_core::workflow::{PlanRequest, plan};

pub async fn handle(
    name: &str,
    remote: bool,
    version_id: Option<String>,
    extra_args: Vec<String>,
) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let env = load_environment(&registry, name)?;
    let ws = workspace(&registry, &env).await;

    let request = PlanRequest {
        remote,
        version_id: resolve_version_id(&ws, &env, version_id).await?,
        extra_args,
    };
    println!("{}", format!("Planning {} ...", env.name).blue());
    let outcome = plan(&ws, &env, &request).await?;

    println!();
    println!(
        "{} Plan finished in {:.1}s",
        "✓".green(),
        outcome.result.duration.as_secs_f64()
    );
    Ok(())
}
