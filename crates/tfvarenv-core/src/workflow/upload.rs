use super::Workspace;
use crate::error::{CoreError, Result};
use crate::files;
use crate::store::PutObject;
use crate::version::Version;
use chrono::Utc;
use std::collections::HashMap;
use tfvarenv_config::Environment;

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub description: String,
    /// Overrides the environment's `auto_backup` flag
    pub backup: Option<bool>,
}

#[derive(Debug)]
pub enum UploadOutcome {
    /// Local content already matches the latest version
    Unchanged(Version),
    Uploaded(Version),
    /// The bytes were stored but the ledger append failed
    Unrecorded { version: Version, error: CoreError },
}

impl UploadOutcome {
    pub fn version(&self) -> &Version {
        match self {
            UploadOutcome::Unchanged(v) | UploadOutcome::Uploaded(v) => v,
            UploadOutcome::Unrecorded { version, .. } => version,
        }
    }
}

/// Pushes the local variable file as a new version unless it is unchanged.
pub async fn upload(
    ws: &Workspace,
    env: &Environment,
    request: &UploadRequest,
) -> Result<UploadOutcome> {
    let local = ws.local_path(env);
    if !files::exists(&local).await {
        return Err(CoreError::NotFound(format!(
            "local file {} for '{}'",
            local.display(),
            env.name
        )));
    }

    let content = files::read_file(&local).await?;
    let hash = files::hash_bytes(&content);
    let ledger = ws.versions(env);

    if let Some(latest) = ledger.latest().await?
        && latest.hash == hash
    {
        tracing::info!("{} is unchanged since version {}", env.name, latest.version_id);
        return Ok(UploadOutcome::Unchanged(latest));
    }

    if request.backup.unwrap_or(env.deployment.auto_backup) {
        let backup = files::create_backup(&local, &ws.backup_options(env)).await?;
        ws.console
            .info(&format!("Backed up local file to {}", backup.display()));
    }

    ws.store.check_versioning(&env.s3.bucket).await?;

    let description = request.description.clone();
    let put = PutObject::new(&env.s3.bucket, env.s3_key(), content.clone())
        .with_content_type("text/plain")
        .with_metadata("Hash", &hash)
        .with_metadata("Description", &description)
        .with_metadata("UploadedBy", &ws.operator);
    let output = ws.store.put_object(put).await?;
    let version_id = output.version_id.ok_or_else(|| {
        CoreError::Storage(format!(
            "bucket {} returned no version id; enable versioning on the bucket",
            env.s3.bucket
        ))
    })?;

    let version = Version {
        version_id,
        hash,
        timestamp: Utc::now(),
        description,
        uploaded_by: ws.operator.clone(),
        size: content.len() as u64,
        metadata: Some(HashMap::from([(
            "source".to_string(),
            env.local.tfvars_path.clone(),
        )])),
    };

    match ledger.add_version(version.clone()).await {
        Ok(()) => Ok(UploadOutcome::Uploaded(version)),
        Err(error) => {
            tracing::warn!(
                "Uploaded {} as {} but failed to record it: {}",
                env.s3_uri(),
                version.version_id,
                error
            );
            Ok(UploadOutcome::Unrecorded { version, error })
        }
    }
}
