use super::{load_environment, load_registry, workspace};
use colored::Colorize;
use tfvarenv_core::RunOptions;
use tfvarenv_terraform::write_backend_config;

pub async fn handle(name: &str) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let env = load_environment(&registry, name)?;
    let ws = workspace(&registry, &env).await;

    ws.verify_account(&env).await?;

    let backend = ws.backend_path(&env);
    if write_backend_config(&backend, &env, false).await? {
        println!(
            "{} Wrote backend config {}",
            "✓".green(),
            env.backend.config_path
        );
    }

    println!(
        "{}",
        format!("Initializing terraform for {} ...", env.name).blue()
    );
    let options = RunOptions {
        reconfigure: true,
        ..ws.run_options(&env)
    };
    ws.provisioner.init(&options).await?.ensure_success()?;

    println!(
        "{} Terraform now uses the backend of {}",
        "✓".green(),
        env.name.cyan().bold()
    );
    Ok(())
}
