use super::{format_time, workspace};
use colored::Colorize;
use tfvarenv_config::Registry;
use tfvarenv_core::EnvironmentState;
use tfvarenv_core::workflow::{LocalStatus, status};

pub async fn handle(short: bool) -> anyhow::Result<()> {
    let registry = Registry::discover()?;
    let names = registry.list_environments()?;

    if names.is_empty() {
        println!("No environments registered.");
        println!(
            "Add one with: {}",
            "tfvarenv add <env> --bucket <bucket> --prefix <prefix>".cyan()
        );
        return Ok(());
    }

    if short {
        for name in names {
            println!("{}", name);
        }
        return Ok(());
    }

    println!("{}", format!("Environments ({}):", names.len()).bold());
    for name in names {
        let env = registry.get_environment(&name)?;
        println!();
        println!("{} {}", "■".blue(), env.name.cyan().bold());
        if !env.description.is_empty() {
            println!("  {}", env.description.dimmed());
        }
        println!("  S3:         {}", env.s3_uri());
        println!("  Region:     {}", env.aws.region);

        let ws = workspace(&registry, &env).await;
        let overview = match status(&ws, &env).await {
            Ok(overview) => overview,
            Err(e) => {
                println!("  {} {}", "⚠".yellow(), e);
                continue;
            }
        };

        match &overview.latest {
            Some(latest) => println!(
                "  Latest:     {} ({}, {} versions)",
                latest.short_id().cyan(),
                format_time(&latest.timestamp),
                overview.total_versions
            ),
            None => println!("  Latest:     {}", "no versions".dimmed()),
        }

        let local = match overview.local {
            LocalStatus::InSync => overview.local.to_string().green(),
            LocalStatus::Modified | LocalStatus::Untracked => overview.local.to_string().yellow(),
            LocalStatus::Missing => overview.local.to_string().red(),
        };
        println!("  Local:      {} ({})", local, env.local.tfvars_path);

        match &overview.state {
            Some(state) => {
                let label = match state.status {
                    EnvironmentState::Active => state.status.to_string().green(),
                    EnvironmentState::Destroyed => state.status.to_string().red(),
                };
                let version = state
                    .deployment
                    .as_ref()
                    .map(|d| tfvarenv_core::version::short_id(&d.version_id).to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  Deployed:   {} version {} ({})",
                    label,
                    version.cyan(),
                    format_time(&state.modified_time)
                );
            }
            None => println!("  Deployed:   {}", "never".dimmed()),
        }

        if let Some(last) = &overview.deployment
            && !last.is_success()
        {
            println!(
                "  {} last {} failed at {}",
                "⚠".yellow(),
                last.command,
                format_time(&last.timestamp)
            );
        }
    }
    Ok(())
}
