use super::upload::{UploadOutcome, UploadRequest, upload};
use super::{StagedVarFile, Workspace, describe_version};
use crate::deployment::{DeployCommand, DeploymentRecord};
use crate::error::{CoreError, Result};
use crate::files;
use crate::runner::{ExecutionResult, RunOptions};
use crate::version::Version;
use std::path::PathBuf;
use tfvarenv_config::Environment;

#[derive(Debug, Clone, Default)]
pub struct ApplyRequest {
    /// Apply a ledger version instead of the local file
    pub remote: bool,
    /// Specific version; implies `remote`
    pub version_id: Option<String>,
    pub auto_approve: bool,
    pub extra_args: Vec<String>,
}

#[derive(Debug)]
pub struct ApplyOutcome {
    pub version: Version,
    pub record: DeploymentRecord,
    pub result: ExecutionResult,
}

enum Target {
    Ledger(Version),
    /// Local content not in the ledger yet; uploaded after approval
    Pending { hash: String },
}

/// Applies a version and records the attempt.
///
/// Local mode uploads changed content first so every deployment
/// references a ledger version.
pub async fn apply(
    ws: &Workspace,
    env: &Environment,
    request: &ApplyRequest,
) -> Result<ApplyOutcome> {
    let remote = request.remote || request.version_id.is_some();
    ws.verify_account(env).await?;

    let ledger = ws.versions(env);
    let local = ws.local_path(env);
    let target = if remote {
        match &request.version_id {
            Some(id) => Target::Ledger(ledger.version(id).await?),
            None => Target::Ledger(ledger.latest_version().await?),
        }
    } else {
        if !files::exists(&local).await {
            return Err(CoreError::NotFound(format!(
                "local file {} for '{}'",
                local.display(),
                env.name
            )));
        }
        let hash = files::hash_file(&local).await?;
        match ledger.latest().await? {
            Some(latest) if latest.hash == hash => Target::Ledger(latest),
            _ => Target::Pending { hash },
        }
    };

    ws.console.info(&format!("Environment: {}", env.name));
    match &target {
        Target::Ledger(version) => ws
            .console
            .info(&format!("Version: {}", describe_version(version))),
        Target::Pending { hash } => ws.console.info(&format!(
            "Version: local changes ({}) will be uploaded as a new version",
            &hash[..hash.len().min(12)]
        )),
    }

    if env.deployment.require_approval && !request.auto_approve {
        let approved = ws
            .console
            .confirm(&format!("Apply to '{}'?", env.name), false)?;
        if !approved {
            return Err(CoreError::Cancelled(
                "deployment cancelled by user".to_string(),
            ));
        }
    }

    let version = match target {
        Target::Ledger(version) => version,
        Target::Pending { .. } => {
            let request = UploadRequest {
                description: format!(
                    "Uploaded during local apply from {}",
                    env.local.tfvars_path
                ),
                backup: None,
            };
            match upload(ws, env, &request).await? {
                UploadOutcome::Uploaded(version) | UploadOutcome::Unchanged(version) => {
                    ws.console
                        .info(&format!("Uploaded new version {}", version.short_id()));
                    version
                }
                UploadOutcome::Unrecorded { version, error } => {
                    return Err(CoreError::Storage(format!(
                        "uploaded version {} but could not record it ({}); run `tfvarenv upload {}` and retry",
                        version.version_id, error, env.name
                    )));
                }
            }
        }
    };

    let mut staged: Option<StagedVarFile> = None;
    let var_file: PathBuf = if remote {
        let file = ws.stage_version(env, &version).await?;
        let path = file.path.clone();
        staged = Some(file);
        path
    } else {
        local
    };

    let options = RunOptions {
        var_file: Some(var_file.clone()),
        auto_approve: request.auto_approve,
        extra_args: request.extra_args.clone(),
        ..ws.run_options(env)
    };

    let record = DeploymentRecord::new(
        &env.name,
        &version.version_id,
        &ws.operator,
        DeployCommand::Apply,
    )
    .with_parameter("auto_approve", request.auto_approve)
    .with_parameter("remote", remote)
    .with_parameter("var_file", var_file.display());

    let run = ws.provisioner.apply(&options).await;
    drop(staged);

    let result = match run {
        Ok(result) => result,
        Err(error) => {
            let failed = record.with_failure(error.to_string());
            ws.deployments(env).add_record(failed).await?;
            return Err(error);
        }
    };

    let record = record.with_duration(result.duration);
    if !result.success {
        let failed = record.with_failure(result.error_text());
        ws.deployments(env).add_record(failed).await?;
        return Err(result.to_error());
    }

    ws.deployments(env).add_record(record.clone()).await?;
    tracing::info!("Applied version {} to {}", version.version_id, env.name);

    Ok(ApplyOutcome {
        version,
        record,
        result,
    })
}
