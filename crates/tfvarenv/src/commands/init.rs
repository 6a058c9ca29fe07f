use anyhow::Context;
use colored::Colorize;
use std::path::Path;
use tfvarenv_config::Registry;
use tfvarenv_config::model::ENVS_DIR;
use tfvarenv_core::workflow::{BACKUP_DIR, TMP_DIR};

/// Entries that keep local scratch data out of version control
const GITIGNORE_ENTRIES: [&str; 2] = [".backups/", ".tmp/"];

pub async fn handle(region: &str) -> anyhow::Result<()> {
    let path = Registry::locate()?;
    let registry = Registry::init(&path, region)
        .with_context(|| format!("failed to initialize {}", path.display()))?;
    let root = registry.project_root();

    for dir in [ENVS_DIR, BACKUP_DIR, TMP_DIR] {
        tokio::fs::create_dir_all(root.join(dir))
            .await
            .with_context(|| format!("failed to create {}", root.join(dir).display()))?;
    }
    let updated = update_gitignore(&root).await?;

    println!("{} Initialized {}", "✓".green(), path.display());
    println!("  Default region: {}", registry.default_region()?.cyan());
    if updated {
        println!("  Added .backups/ and .tmp/ to .gitignore");
    }
    println!();
    println!(
        "Next: {}",
        "tfvarenv add <env> --bucket <bucket> --prefix <prefix>".cyan()
    );
    Ok(())
}

/// Appends missing entries to `.gitignore`. Returns whether the file changed.
async fn update_gitignore(root: &Path) -> anyhow::Result<bool> {
    let path = root.join(".gitignore");
    let existing = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };

    let missing: Vec<&str> = GITIGNORE_ENTRIES
        .iter()
        .copied()
        .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
        .collect();
    if missing.is_empty() {
        return Ok(false);
    }

    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str("# tfvarenv\n");
    for entry in missing {
        content.push_str(entry);
        content.push('\n');
    }
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
