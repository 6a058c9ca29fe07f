use super::{Workspace, describe_version};
use crate::deployment::{DeployCommand, DeploymentRecord, EnvironmentState};
use crate::error::{CoreError, Result};
use crate::runner::{ExecutionResult, RunOptions};
use crate::version::Version;
use tfvarenv_config::Environment;

#[derive(Debug, Clone, Default)]
pub struct DestroyRequest {
    /// Defaults to the version of the last successful apply
    pub version_id: Option<String>,
    /// Skip the typed confirmation
    pub auto_approve: bool,
    pub extra_args: Vec<String>,
}

#[derive(Debug)]
pub struct DestroyOutcome {
    pub version: Version,
    pub result: ExecutionResult,
}

/// Tears the environment down with the variables that are live.
///
/// Success flips the latest-deployment pointer to destroyed without a new
/// history entry; failure is recorded as a failed `destroy`.
pub async fn destroy(
    ws: &Workspace,
    env: &Environment,
    request: &DestroyRequest,
) -> Result<DestroyOutcome> {
    let deployments = ws.deployments(env);
    let last_apply = deployments.last_successful_apply().await?;

    let version_id = match (&request.version_id, &last_apply) {
        (Some(id), _) => id.clone(),
        (None, Some(record)) => record.version_id.clone(),
        (None, None) => {
            return Err(CoreError::NotFound(format!(
                "no successful deployment recorded for '{}'; pass --version-id to choose one",
                env.name
            )));
        }
    };
    let version = ws.versions(env).version(&version_id).await?;

    ws.console.info(&format!("Environment: {}", env.name));
    ws.console
        .info(&format!("Version: {}", describe_version(&version)));
    if let Some(record) = &last_apply {
        ws.console.info(&format!(
            "Last applied: {} by {} at {}",
            crate::version::short_id(&record.version_id),
            record.deployed_by,
            record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    if let Some(state) = deployments.current_state().await?
        && state.status == EnvironmentState::Destroyed
    {
        ws.console.warn(&format!(
            "'{}' was already marked as destroyed at {}",
            env.name,
            state.modified_time.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    ws.verify_account(env).await?;

    if !request.auto_approve {
        let typed = ws.console.input(&format!(
            "This destroys every resource of '{}'. Type the environment name to confirm",
            env.name
        ))?;
        if typed != env.name {
            return Err(CoreError::Cancelled("destroy cancelled by user".to_string()));
        }
    }

    let staged = ws.stage_version(env, &version).await?;
    let options = RunOptions {
        var_file: Some(staged.path.clone()),
        auto_approve: true,
        extra_args: request.extra_args.clone(),
        ..ws.run_options(env)
    };
    let run = ws.provisioner.destroy(&options).await;
    drop(staged);

    let failure = DeploymentRecord::new(
        &env.name,
        &version.version_id,
        &ws.operator,
        DeployCommand::Destroy,
    )
    .with_parameter("auto_approve", request.auto_approve);

    let result = match run {
        Ok(result) => result,
        Err(error) => {
            deployments
                .add_record(failure.with_failure(error.to_string()))
                .await?;
            return Err(error);
        }
    };

    if !result.success {
        deployments
            .add_record(
                failure
                    .with_duration(result.duration)
                    .with_failure(result.error_text()),
            )
            .await?;
        return Err(result.to_error());
    }

    deployments.mark_as_destroyed().await?;
    tracing::info!("Destroyed {} (version {})", env.name, version.version_id);

    Ok(DestroyOutcome { version, result })
}
