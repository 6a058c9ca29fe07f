//! Deployment ledger
//!
//! `{prefix}/.deployments.json` keeps every apply/destroy attempt plus a
//! pointer to the latest deployment and whether the environment is
//! currently live.

use crate::error::Result;
use crate::ledger::{self, LEDGER_FORMAT_VERSION};
use crate::store::ObjectStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tfvarenv_config::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployCommand {
    Apply,
    Plan,
    Destroy,
}

impl fmt::Display for DeployCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployCommand::Apply => write!(f, "apply"),
            DeployCommand::Plan => write!(f, "plan"),
            DeployCommand::Destroy => write!(f, "destroy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    Success,
    #[serde(alias = "failed")]
    Failure,
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployStatus::Success => write!(f, "success"),
            DeployStatus::Failure => write!(f, "failure"),
        }
    }
}

/// Whether the environment's resources currently exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentState {
    Active,
    Destroyed,
}

impl fmt::Display for EnvironmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentState::Active => write!(f, "active"),
            EnvironmentState::Destroyed => write!(f, "destroyed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub timestamp: DateTime<Utc>,
    pub version_id: String,
    pub deployed_by: String,
    pub command: DeployCommand,
    pub status: DeployStatus,
    /// Absent in ledgers written before records carried it
    #[serde(default)]
    pub environment: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    /// Nanoseconds
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_ns: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DeploymentRecord {
    pub fn new(
        environment: impl Into<String>,
        version_id: impl Into<String>,
        deployed_by: impl Into<String>,
        command: DeployCommand,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            version_id: version_id.into(),
            deployed_by: deployed_by.into(),
            command,
            status: DeployStatus::Success,
            environment: environment.into(),
            parameters: BTreeMap::new(),
            duration_ns: None,
            error_message: None,
        }
    }

    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.status = DeployStatus::Failure;
        self.error_message = Some(message.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ns = Some(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.insert(key.into(), value.to_string());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_ns.map(Duration::from_nanos)
    }

    pub fn is_success(&self) -> bool {
        self.status == DeployStatus::Success
    }
}

/// The "latest deployment" pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestDeployment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentRecord>,
    pub status: EnvironmentState,
    pub modified_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentHistory {
    pub format_version: String,
    pub environment: String,
    #[serde(
        default,
        deserialize_with = "latest_pointer",
        skip_serializing_if = "Option::is_none"
    )]
    pub latest_deployment: Option<LatestDeployment>,
    #[serde(default)]
    pub deployments: Vec<DeploymentRecord>,
}

/// Older ledgers store the latest record itself as the pointer.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPointer {
    Current(LatestDeployment),
    Bare(DeploymentRecord),
}

fn latest_pointer<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<LatestDeployment>, D::Error>
where
    D: Deserializer<'de>,
{
    let pointer = Option::<StoredPointer>::deserialize(deserializer)?;
    Ok(pointer.map(|pointer| match pointer {
        StoredPointer::Current(latest) => latest,
        StoredPointer::Bare(record) => LatestDeployment {
            status: EnvironmentState::Active,
            modified_time: record.timestamp,
            deployment: Some(record),
        },
    }))
}

impl DeploymentHistory {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            format_version: LEDGER_FORMAT_VERSION.to_string(),
            environment: environment.into(),
            latest_deployment: None,
            deployments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeploymentQuery {
    pub since: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub status: Option<DeployStatus>,
    pub command: Option<DeployCommand>,
    pub deployed_by: Option<String>,
    pub version_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DeploymentStats {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub average_duration: Option<Duration>,
    /// Error messages by frequency, most common first
    pub common_errors: Vec<(String, usize)>,
    pub by_user: BTreeMap<String, usize>,
    pub last_deployment: Option<DeploymentRecord>,
}

pub struct DeploymentLedger<'a> {
    store: &'a dyn ObjectStore,
    env: &'a Environment,
}

impl<'a> DeploymentLedger<'a> {
    pub fn new(store: &'a dyn ObjectStore, env: &'a Environment) -> Self {
        Self { store, env }
    }

    pub fn key(&self) -> String {
        self.env.deployment_ledger_key()
    }

    pub async fn load(&self) -> Result<DeploymentHistory> {
        let key = self.key();
        match ledger::load::<DeploymentHistory>(self.store, &self.env.s3.bucket, &key).await? {
            Some(history) => {
                ledger::check_format_version(&history.format_version, &key)?;
                tracing::debug!(
                    "Loaded {} deployments for {}",
                    history.deployments.len(),
                    self.env.name
                );
                Ok(history)
            }
            None => Ok(DeploymentHistory::new(&self.env.name)),
        }
    }

    async fn save(&self, history: &mut DeploymentHistory) -> Result<()> {
        history.format_version = LEDGER_FORMAT_VERSION.to_string();
        history.environment = self.env.name.clone();
        ledger::save(self.store, &self.env.s3.bucket, &self.key(), history).await
    }

    /// Appends `record` and points the latest deployment at it.
    pub async fn add_record(&self, record: DeploymentRecord) -> Result<()> {
        let mut history = self.load().await?;
        tracing::info!(
            "Recording {} {} of version {} for {}",
            record.command,
            record.status,
            record.version_id,
            self.env.name
        );

        history.latest_deployment = Some(LatestDeployment {
            deployment: Some(record.clone()),
            status: EnvironmentState::Active,
            modified_time: Utc::now(),
        });
        history.deployments.push(record);
        history
            .deployments
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        self.save(&mut history).await
    }

    /// Flags the environment as torn down without adding a history entry.
    pub async fn mark_as_destroyed(&self) -> Result<()> {
        let mut history = self.load().await?;
        let now = Utc::now();
        match history.latest_deployment.as_mut() {
            Some(latest) => {
                latest.status = EnvironmentState::Destroyed;
                latest.modified_time = now;
            }
            None => {
                history.latest_deployment = Some(LatestDeployment {
                    deployment: None,
                    status: EnvironmentState::Destroyed,
                    modified_time: now,
                });
            }
        }

        tracing::info!("Marked {} as destroyed", self.env.name);
        self.save(&mut history).await
    }

    pub async fn history(&self) -> Result<Vec<DeploymentRecord>> {
        Ok(self.load().await?.deployments)
    }

    /// The pointer's record, else the newest history entry
    pub async fn latest_deployment(&self) -> Result<Option<DeploymentRecord>> {
        let history = self.load().await?;
        let from_pointer = history
            .latest_deployment
            .and_then(|latest| latest.deployment);
        Ok(from_pointer.or_else(|| history.deployments.into_iter().next()))
    }

    pub async fn current_state(&self) -> Result<Option<LatestDeployment>> {
        Ok(self.load().await?.latest_deployment)
    }

    /// Newest successful apply; its version is what is live.
    pub async fn last_successful_apply(&self) -> Result<Option<DeploymentRecord>> {
        Ok(self
            .history()
            .await?
            .into_iter()
            .find(|r| r.command == DeployCommand::Apply && r.is_success()))
    }

    pub async fn query(&self, query: &DeploymentQuery) -> Result<Vec<DeploymentRecord>> {
        let mut records: Vec<DeploymentRecord> = self
            .history()
            .await?
            .into_iter()
            .filter(|r| query.since.is_none_or(|since| r.timestamp >= since))
            .filter(|r| query.before.is_none_or(|before| r.timestamp < before))
            .filter(|r| query.status.is_none_or(|status| r.status == status))
            .filter(|r| query.command.is_none_or(|command| r.command == command))
            .filter(|r| {
                query
                    .deployed_by
                    .as_ref()
                    .is_none_or(|who| &r.deployed_by == who)
            })
            .filter(|r| {
                query
                    .version_id
                    .as_ref()
                    .is_none_or(|id| &r.version_id == id)
            })
            .collect();

        if let Some(limit) = query.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    pub async fn stats(&self) -> Result<DeploymentStats> {
        let records = self.history().await?;
        let mut stats = DeploymentStats {
            total: records.len(),
            last_deployment: records.first().cloned(),
            ..Default::default()
        };

        let mut total_ns: u128 = 0;
        let mut timed = 0u32;
        let mut errors: BTreeMap<String, usize> = BTreeMap::new();

        for record in &records {
            match record.status {
                DeployStatus::Success => stats.success_count += 1,
                DeployStatus::Failure => stats.failure_count += 1,
            }
            if let Some(ns) = record.duration_ns {
                total_ns += u128::from(ns);
                timed += 1;
            }
            if let Some(message) = &record.error_message {
                *errors.entry(message.clone()).or_default() += 1;
            }
            *stats.by_user.entry(record.deployed_by.clone()).or_default() += 1;
        }

        if timed > 0 {
            let average = total_ns / u128::from(timed);
            stats.average_duration = Some(Duration::from_nanos(
                u64::try_from(average).unwrap_or(u64::MAX),
            ));
        }

        let mut common_errors: Vec<(String, usize)> = errors.into_iter().collect();
        common_errors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        stats.common_errors = common_errors;
        Ok(stats)
    }
}
