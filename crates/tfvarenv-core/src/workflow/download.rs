use super::{Workspace, describe_version, verify_content};
use crate::deployment::EnvironmentState;
use crate::error::{CoreError, Result};
use crate::files;
use crate::version::Version;
use std::path::PathBuf;
use tfvarenv_config::Environment;

#[derive(Debug, Clone, Default)]
pub struct DownloadRequest {
    /// Latest when unset
    pub version_id: Option<String>,
    /// Overwrite a differing local file without asking
    pub force: bool,
}

#[derive(Debug)]
pub enum DownloadOutcome {
    AlreadyCurrent(Version),
    Written {
        version: Version,
        path: PathBuf,
        backup: Option<PathBuf>,
    },
}

pub async fn download(
    ws: &Workspace,
    env: &Environment,
    request: &DownloadRequest,
) -> Result<DownloadOutcome> {
    let ledger = ws.versions(env);
    let version = match &request.version_id {
        Some(id) => ledger.version(id).await?,
        None => ledger.latest_version().await?,
    };
    ws.console
        .info(&format!("Version: {}", describe_version(&version)));
    report_deployment(ws, env, &version).await?;

    let local = ws.local_path(env);
    let mut backup = None;
    if files::exists(&local).await {
        if files::hash_file(&local).await? == version.hash {
            return Ok(DownloadOutcome::AlreadyCurrent(version));
        }

        if !request.force {
            if !ws.console.interactive() {
                return Err(CoreError::Conflict(format!(
                    "local file {} differs from version {}; pass --force to overwrite it or upload it first",
                    local.display(),
                    version.short_id()
                )));
            }
            let overwrite = ws.console.confirm(
                &format!(
                    "Local file {} differs from version {}. Overwrite?",
                    local.display(),
                    version.short_id()
                ),
                false,
            )?;
            if !overwrite {
                return Err(CoreError::Cancelled("download cancelled by user".to_string()));
            }
        }

        backup = Some(files::create_backup(&local, &ws.backup_options(env)).await?);
    }

    let content = ledger.fetch(&version).await?;
    verify_content(&version, &content, ws.console.as_ref());
    files::write_file(&local, &content, files::WriteOptions::default()).await?;
    tracing::info!("Downloaded version {} to {}", version.version_id, local.display());

    Ok(DownloadOutcome::Written {
        version,
        path: local,
        backup,
    })
}

/// Tells the operator whether `version` is what is currently deployed.
async fn report_deployment(ws: &Workspace, env: &Environment, version: &Version) -> Result<()> {
    let Some(state) = ws.deployments(env).current_state().await? else {
        ws.console.info("Deployment: never deployed");
        return Ok(());
    };

    match (&state.deployment, state.status) {
        (_, EnvironmentState::Destroyed) => ws.console.info(&format!(
            "Deployment: environment destroyed at {}",
            state.modified_time.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        (Some(record), EnvironmentState::Active) if record.version_id == version.version_id => {
            ws.console.info(&format!(
                "Deployment: this version is currently deployed (by {} at {})",
                record.deployed_by,
                record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ))
        }
        (Some(record), EnvironmentState::Active) => ws.console.info(&format!(
            "Deployment: version {} is currently deployed",
            crate::version::short_id(&record.version_id)
        )),
        (None, EnvironmentState::Active) => ws.console.info("Deployment: unknown"),
    }
    Ok(())
}
