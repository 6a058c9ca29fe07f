use super::{load_environment, load_registry, resolve_version_id, workspace};
use colored::Colorize;

pub async fn handle(name: &str, old: &str, new: &str) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let env = load_environment(&registry, name)?;
    let ws = workspace(&registry, &env).await;

    let old_id = resolve_version_id(&ws, &env, Some(old.to_string()))
        .await?
        .unwrap_or_else(|| old.to_string());
    let new_id = resolve_version_id(&ws, &env, Some(new.to_string()))
        .await?
        .unwrap_or_else(|| new.to_string());

    let diffs = ws.versions(&env).compare_versions(&old_id, &new_id).await?;
    if diffs.is_empty() {
        println!("{} Versions are identical", "✓".green());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} line(s) differ:", diffs.len()).bold()
    );
    for diff in diffs {
        println!("Line {}:", diff.line);
        if let Some(old) = &diff.old {
            println!("  {}", format!("- {}", old).red());
        }
        if let Some(new) = &diff.new {
            println!("  {}", format!("+ {}", new).green());
        }
    }
    Ok(())
}
