//! Reconciliation workflows
//!
//! Each workflow compares the local variable file with the ledgers and
//! drives the store, the provisioner and the ledgers accordingly.

mod apply;
mod destroy;
mod download;
mod plan;
mod reconcile;
mod status;
mod upload;

#[cfg(test)]
mod tests;

pub use apply::{ApplyOutcome, ApplyRequest, apply};
pub use destroy::{DestroyOutcome, DestroyRequest, destroy};
pub use download::{DownloadOutcome, DownloadRequest, download};
pub use plan::{PlanOutcome, PlanRequest, plan};
pub use reconcile::{SyncAction, SyncReport, SyncState, reconcile};
pub use status::{EnvironmentStatus, LocalStatus, status};
pub use upload::{UploadOutcome, UploadRequest, upload};

use crate::deployment::DeploymentLedger;
use crate::error::{CoreError, Result};
use crate::runner::{Provisioner, RunOptions};
use crate::store::ObjectStore;
use crate::version::{Version, VersionLedger};
use crate::{console::Console, files};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tfvarenv_config::Environment;

pub const BACKUP_DIR: &str = ".backups";
pub const TMP_DIR: &str = ".tmp";

/// Collaborators shared by every workflow of one invocation
#[derive(Clone)]
pub struct Workspace {
    pub store: Arc<dyn ObjectStore>,
    pub provisioner: Arc<dyn Provisioner>,
    pub console: Arc<dyn Console>,
    /// Directory relative environment paths resolve against
    pub root: PathBuf,
    /// Recorded as `uploaded_by` / `deployed_by`
    pub operator: String,
}

impl Workspace {
    pub fn versions<'a>(&'a self, env: &'a Environment) -> VersionLedger<'a> {
        VersionLedger::new(self.store.as_ref(), env)
    }

    pub fn deployments<'a>(&'a self, env: &'a Environment) -> DeploymentLedger<'a> {
        DeploymentLedger::new(self.store.as_ref(), env)
    }

    pub fn local_path(&self, env: &Environment) -> PathBuf {
        self.root.join(&env.local.tfvars_path)
    }

    pub fn backend_path(&self, env: &Environment) -> PathBuf {
        self.root.join(&env.backend.config_path)
    }

    pub fn backup_dir(&self, env: &Environment) -> PathBuf {
        self.root.join(BACKUP_DIR).join(&env.name)
    }

    pub fn backup_options(&self, env: &Environment) -> files::BackupOptions {
        files::BackupOptions::new(self.backup_dir(env))
    }

    /// Run options rooted at the workspace, with the backend file when present
    pub fn run_options(&self, env: &Environment) -> RunOptions {
        let backend = self.backend_path(env);
        RunOptions {
            working_dir: self.root.clone(),
            backend_config: backend.exists().then_some(backend),
            ..Default::default()
        }
    }

    /// Checks the caller account against the environment binding, when one is set.
    pub async fn verify_account(&self, env: &Environment) -> Result<()> {
        if env.aws.account_id.is_empty() {
            return Ok(());
        }
        let actual = self.store.caller_account_id().await?;
        if actual != env.aws.account_id {
            return Err(CoreError::Validation(format!(
                "AWS account mismatch for '{}': expected {}, current credentials belong to {}",
                env.name, env.aws.account_id, actual
            )));
        }
        tracing::debug!("Verified AWS account {} for {}", actual, env.name);
        Ok(())
    }

    /// Downloads `version` into a scratch directory under `.tmp/`.
    ///
    /// The directory and file are removed when the returned guard drops.
    pub async fn stage_version(
        &self,
        env: &Environment,
        version: &Version,
    ) -> Result<StagedVarFile> {
        let content = self.versions(env).fetch(version).await?;
        verify_content(version, &content, self.console.as_ref());

        let tmp_root = self.root.join(TMP_DIR);
        tokio::fs::create_dir_all(&tmp_root).await?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", env.name))
            .tempdir_in(&tmp_root)?;
        let path = dir.path().join(&env.s3.tfvars_key);
        files::write_file(&path, &content, files::WriteOptions::default()).await?;

        tracing::debug!("Staged version {} at {}", version.version_id, path.display());
        Ok(StagedVarFile { _dir: dir, path })
    }
}

/// A downloaded variable file living in a temporary directory
pub struct StagedVarFile {
    _dir: TempDir,
    pub path: PathBuf,
}

/// Warns when fetched bytes do not match the recorded hash.
fn verify_content(version: &Version, content: &[u8], console: &dyn Console) {
    let actual = files::hash_bytes(content);
    if actual != version.hash {
        tracing::warn!(
            "Hash mismatch for version {}: recorded {}, fetched {}",
            version.version_id,
            version.hash,
            actual
        );
        console.warn(&format!(
            "content of version {} does not match its recorded hash",
            version.short_id()
        ));
    }
}

/// Login name of the current user, used as the operator identity
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) fn describe_version(version: &Version) -> String {
    let mut line = format!(
        "{} uploaded {} by {}",
        version.short_id(),
        version.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        version.uploaded_by
    );
    if !version.description.is_empty() {
        line.push_str(&format!(" ({})", version.description));
    }
    line
}
