use super::{StagedVarFile, Workspace, describe_version};
use crate::error::{CoreError, Result};
use crate::files;
use crate::runner::ExecutionResult;
use crate::version::Version;
use tfvarenv_config::Environment;

#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    /// Use a ledger version instead of the local file
    pub remote: bool,
    /// Specific version; implies `remote`
    pub version_id: Option<String>,
    pub extra_args: Vec<String>,
}

#[derive(Debug)]
pub struct PlanOutcome {
    /// Ledger version the variables came from, if they match one
    pub version: Option<Version>,
    pub result: ExecutionResult,
}

/// Runs a plan. Nothing is recorded.
pub async fn plan(ws: &Workspace, env: &Environment, request: &PlanRequest) -> Result<PlanOutcome> {
    ws.verify_account(env).await?;

    let ledger = ws.versions(env);
    let latest = ledger.latest().await?;

    let mut staged: Option<StagedVarFile> = None;
    let (version, var_file) = if request.remote || request.version_id.is_some() {
        let version = match &request.version_id {
            Some(id) => ledger.version(id).await?,
            None => latest.clone().ok_or_else(|| {
                CoreError::NotFound(format!("no versions uploaded for '{}'", env.name))
            })?,
        };
        ws.console
            .info(&format!("Planning with version {}", describe_version(&version)));
        if let Some(latest) = &latest
            && latest.version_id != version.version_id
        {
            ws.console.warn(&format!(
                "version {} is not the latest; latest is {}",
                version.short_id(),
                latest.short_id()
            ));
        }

        let file = ws.stage_version(env, &version).await?;
        let path = file.path.clone();
        staged = Some(file);
        (Some(version), path)
    } else {
        let local = ws.local_path(env);
        if !files::exists(&local).await {
            return Err(CoreError::NotFound(format!(
                "local file {} for '{}'",
                local.display(),
                env.name
            )));
        }
        let hash = files::hash_file(&local).await?;
        let matching = latest.filter(|v| v.hash == hash);
        match &matching {
            Some(version) => ws
                .console
                .info(&format!("Local file matches version {}", version.short_id())),
            None => ws
                .console
                .warn("local file has changes that are not uploaded yet"),
        }
        (matching, local)
    };

    let options = crate::runner::RunOptions {
        var_file: Some(var_file),
        extra_args: request.extra_args.clone(),
        ..ws.run_options(env)
    };
    let result = ws.provisioner.plan(&options).await?;
    drop(staged);

    Ok(PlanOutcome {
        version,
        result: result.ensure_success()?,
    })
}
