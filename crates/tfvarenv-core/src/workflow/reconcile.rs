use super::upload::{UploadOutcome, UploadRequest, upload};
use super::{Workspace, describe_version, verify_content};
use crate::error::Result;
use crate::files;
use crate::version::Version;
use tfvarenv_config::Environment;

/// Local file presence/content against the latest ledger version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Neither side has the file
    Missing,
    RemoteOnly,
    LocalOnly,
    InSync,
    Diverged,
}

#[derive(Debug)]
pub enum SyncAction {
    None,
    CreatedPlaceholder,
    Downloaded(Version),
    Uploaded(UploadOutcome),
    Declined,
}

#[derive(Debug)]
pub struct SyncReport {
    pub state: SyncState,
    pub action: SyncAction,
    pub local_hash: Option<String>,
    pub latest: Option<Version>,
}

/// Brings a freshly registered environment's local file and ledger together.
///
/// Diverged content is reported, never resolved.
pub async fn reconcile(ws: &Workspace, env: &Environment) -> Result<SyncReport> {
    let local = ws.local_path(env);
    let local_hash = if files::exists(&local).await {
        Some(files::hash_file(&local).await?)
    } else {
        None
    };
    let latest = ws.versions(env).latest().await?;

    let state = match (&local_hash, &latest) {
        (None, None) => SyncState::Missing,
        (None, Some(_)) => SyncState::RemoteOnly,
        (Some(_), None) => SyncState::LocalOnly,
        (Some(hash), Some(version)) if *hash == version.hash => SyncState::InSync,
        (Some(_), Some(_)) => SyncState::Diverged,
    };
    tracing::debug!("{} sync state: {:?}", env.name, state);

    let action = match (state, &latest) {
        (SyncState::Missing, _) => {
            files::write_file(&local, b"", files::WriteOptions::default()).await?;
            ws.console.info(&format!(
                "Created empty variable file {}",
                local.display()
            ));
            SyncAction::CreatedPlaceholder
        }
        (SyncState::RemoteOnly, Some(version)) => {
            ws.console
                .info(&format!("Remote version found: {}", describe_version(version)));
            let accept = ws.console.confirm(
                &format!("Download it to {}?", local.display()),
                true,
            )?;
            if accept {
                let content = ws.versions(env).fetch(version).await?;
                verify_content(version, &content, ws.console.as_ref());
                files::write_file(&local, &content, files::WriteOptions::default()).await?;
                SyncAction::Downloaded(version.clone())
            } else {
                SyncAction::Declined
            }
        }
        (SyncState::LocalOnly, _) => {
            let accept = ws.console.confirm(
                &format!(
                    "Local file {} has no remote version. Upload it?",
                    local.display()
                ),
                true,
            )?;
            if accept {
                let request = UploadRequest {
                    description: format!("Initial upload from {}", env.local.tfvars_path),
                    backup: Some(false),
                };
                SyncAction::Uploaded(upload(ws, env, &request).await?)
            } else {
                SyncAction::Declined
            }
        }
        (SyncState::Diverged, Some(version)) => {
            ws.console.warn(&format!(
                "Local file differs from the latest version {}. Run `tfvarenv download {}` or `tfvarenv upload {}` to resolve.",
                version.short_id(),
                env.name,
                env.name
            ));
            SyncAction::None
        }
        _ => SyncAction::None,
    };

    Ok(SyncReport {
        state,
        action,
        local_hash,
        latest,
    })
}
