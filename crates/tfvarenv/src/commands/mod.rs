pub mod add;
pub mod apply;
pub mod destroy;
pub mod diff;
pub mod download;
pub mod history;
pub mod init;
pub mod list;
pub mod plan;
pub mod remove;
pub mod update;
pub mod upload;
pub mod use_env;
pub mod versions;

use crate::console::TerminalConsole;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use std::sync::Arc;
use tfvarenv_aws::AwsStore;
use tfvarenv_config::{Environment, Registry};
use tfvarenv_core::workflow::{SyncAction, SyncReport, SyncState, UploadOutcome, current_user};
use tfvarenv_core::{VersionQuery, Workspace};
use tfvarenv_terraform::Terraform;

/// Opens the registry, requiring the file to exist.
pub fn load_registry() -> anyhow::Result<Registry> {
    let path = Registry::locate()?;
    if !path.exists() {
        anyhow::bail!(
            "{} not found. Run `tfvarenv init` first",
            path.display()
        );
    }
    tracing::debug!("Using registry {}", path.display());
    Registry::open(&path).with_context(|| format!("failed to load {}", path.display()))
}

pub fn load_environment(registry: &Registry, name: &str) -> anyhow::Result<Environment> {
    registry
        .get_environment(name)
        .with_context(|| format!("unknown environment '{}'", name))
}

/// Wires AWS, terraform and the terminal for one environment.
pub async fn workspace(registry: &Registry, env: &Environment) -> Workspace {
    let store = AwsStore::new(&env.aws.region).await;
    Workspace {
        store: Arc::new(store),
        provisioner: Arc::new(Terraform::from_env()),
        console: Arc::new(TerminalConsole),
        root: registry.project_root(),
        operator: current_user(),
    }
}

/// Expands a unique version id prefix to the full id.
pub async fn resolve_version_id(
    ws: &Workspace,
    env: &Environment,
    id: Option<String>,
) -> anyhow::Result<Option<String>> {
    let Some(id) = id else {
        return Ok(None);
    };

    let versions = ws.versions(env).versions(&VersionQuery::default()).await?;
    match expand_version_id(&id, versions.iter().map(|v| v.version_id.as_str()))? {
        Some(full) => Ok(Some(full)),
        None => anyhow::bail!("version '{}' not found for '{}'", id, env.name),
    }
}

/// The candidate equal to `id`, else the only one starting with it.
/// `Ok(None)` when nothing matches.
pub fn expand_version_id<'a>(
    id: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> anyhow::Result<Option<String>> {
    let mut matches: Vec<&str> = Vec::new();
    for candidate in candidates {
        if candidate == id {
            return Ok(Some(id.to_string()));
        }
        if candidate.starts_with(id) && !matches.contains(&candidate) {
            matches.push(candidate);
        }
    }

    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(only.to_string())),
        _ => anyhow::bail!(
            "version prefix '{}' is ambiguous ({} matches)",
            id,
            matches.len()
        ),
    }
}

/// Accepts RFC 3339 or a plain `YYYY-MM-DD` (midnight UTC).
pub fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
        .ok_or_else(|| format!("invalid time '{}': use YYYY-MM-DD or RFC 3339", value))
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_size(bytes: u64) -> String {
    match bytes {
        b if b < 1024 => format!("{} B", b),
        b if b < 1024 * 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
    }
}

pub fn print_upload_outcome(env: &Environment, outcome: &UploadOutcome) {
    match outcome {
        UploadOutcome::Unchanged(version) => {
            println!(
                "{} Local file matches the latest version {}, nothing to upload",
                "✓".green(),
                version.short_id().cyan()
            );
        }
        UploadOutcome::Uploaded(version) => {
            println!(
                "{} Uploaded version {} to {}",
                "✓".green(),
                version.short_id().cyan(),
                env.s3_uri()
            );
        }
        UploadOutcome::Unrecorded { version, error } => {
            println!(
                "{} Uploaded version {} but could not record it: {}",
                "⚠".yellow(),
                version.version_id.cyan(),
                error
            );
            println!("  Re-run `tfvarenv upload {}` to record it", env.name);
        }
    }
}

/// The workflow already warned about a diverged file through the console.
pub fn print_sync_report(env: &Environment, report: &SyncReport) {
    if let SyncAction::Uploaded(outcome) = &report.action {
        print_upload_outcome(env, outcome);
    } else if let Some(line) = sync_summary(env, report) {
        println!("{}", line);
    }
}

fn sync_summary(env: &Environment, report: &SyncReport) -> Option<String> {
    match &report.action {
        SyncAction::CreatedPlaceholder => Some(format!(
            "{} Created empty {}",
            "✓".green(),
            env.local.tfvars_path.cyan()
        )),
        SyncAction::Downloaded(version) => Some(format!(
            "{} Downloaded version {} to {}",
            "✓".green(),
            version.short_id().cyan(),
            env.local.tfvars_path
        )),
        SyncAction::Declined => Some("  Local file left unchanged".to_string()),
        SyncAction::None if report.state == SyncState::InSync => {
            Some(format!("{} Local file is in sync with S3", "✓".green()))
        }
        SyncAction::None | SyncAction::Uploaded(_) => None,
    }
}
