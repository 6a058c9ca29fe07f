use super::Workspace;
use crate::deployment::{DeploymentRecord, LatestDeployment};
use crate::error::Result;
use crate::files;
use crate::version::Version;
use std::fmt;
use tfvarenv_config::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStatus {
    Missing,
    /// Matches the latest version
    InSync,
    /// Differs from the latest version
    Modified,
    /// Present, but nothing uploaded yet
    Untracked,
}

impl fmt::Display for LocalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalStatus::Missing => write!(f, "missing"),
            LocalStatus::InSync => write!(f, "in sync"),
            LocalStatus::Modified => write!(f, "modified"),
            LocalStatus::Untracked => write!(f, "not uploaded"),
        }
    }
}

/// Overview of one environment
#[derive(Debug, Clone)]
pub struct EnvironmentStatus {
    pub latest: Option<Version>,
    pub total_versions: usize,
    pub deployment: Option<DeploymentRecord>,
    pub state: Option<LatestDeployment>,
    pub local: LocalStatus,
}

pub async fn status(ws: &Workspace, env: &Environment) -> Result<EnvironmentStatus> {
    let catalog = ws.versions(env).load().await?;
    let latest = catalog.latest().cloned();

    let deployments = ws.deployments(env).load().await?;
    let state = deployments.latest_deployment.clone();
    let deployment = state
        .as_ref()
        .and_then(|s| s.deployment.clone())
        .or_else(|| deployments.deployments.first().cloned());

    let local_path = ws.local_path(env);
    let local = match (&latest, files::exists(&local_path).await) {
        (_, false) => LocalStatus::Missing,
        (None, true) => LocalStatus::Untracked,
        (Some(version), true) => {
            if files::hash_file(&local_path).await? == version.hash {
                LocalStatus::InSync
            } else {
                LocalStatus::Modified
            }
        }
    };

    Ok(EnvironmentStatus {
        latest,
        total_versions: catalog.versions.len(),
        deployment,
        state,
        local,
    })
}
