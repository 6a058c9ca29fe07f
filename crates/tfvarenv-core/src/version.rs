//! Version ledger
//!
//! Every upload of an environment's variable file is recorded in
//! `{prefix}/.{tfvars_key}.versions.json`, newest first. Position in the
//! list is authoritative: the head is the most recently appended version
//! regardless of its timestamp.

use crate::error::{CoreError, Result};
use crate::ledger::{self, LEDGER_FORMAT_VERSION};
use crate::store::{ObjectStore, ObjectVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tfvarenv_config::Environment;

/// Upper bound on retained entries
pub const MAX_VERSIONS: usize = 100;

pub const SIZE_BUCKETS: [&str; 5] = ["< 1KB", "1KB-10KB", "10KB-100KB", "100KB-1MB", "> 1MB"];

/// One uploaded variable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub version_id: String,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    pub uploaded_by: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl Version {
    /// First 8 characters of the id, for display
    pub fn short_id(&self) -> &str {
        short_id(&self.version_id)
    }
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEnvironment {
    pub name: String,
    pub s3_path: String,
}

/// The ledger object as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionCatalog {
    pub format_version: String,
    pub last_updated: DateTime<Utc>,
    pub environment: LedgerEnvironment,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(default)]
    pub latest_version_id: String,
}

impl VersionCatalog {
    pub fn new(env: &Environment) -> Self {
        Self {
            format_version: LEDGER_FORMAT_VERSION.to_string(),
            last_updated: Utc::now(),
            environment: LedgerEnvironment {
                name: env.name.clone(),
                s3_path: env.s3_uri(),
            },
            versions: Vec::new(),
            latest_version_id: String::new(),
        }
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.first()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VersionQuery {
    pub since: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the description
    pub search: Option<String>,
    pub latest_only: bool,
    pub sort_by_date: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct VersionStats {
    pub total_versions: usize,
    pub average_size: u64,
    pub most_active_user: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub by_user: BTreeMap<String, usize>,
    /// Counts per entry of [`SIZE_BUCKETS`], in the same order
    pub size_distribution: Vec<(String, usize)>,
}

/// A positional difference between two versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    pub line: usize,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl fmt::Display for LineDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}:", self.line)?;
        if let Some(old) = &self.old {
            write!(f, "\n  - {}", old)?;
        }
        if let Some(new) = &self.new {
            write!(f, "\n  + {}", new)?;
        }
        Ok(())
    }
}

pub struct VersionLedger<'a> {
    store: &'a dyn ObjectStore,
    env: &'a Environment,
}

impl<'a> VersionLedger<'a> {
    pub fn new(store: &'a dyn ObjectStore, env: &'a Environment) -> Self {
        Self { store, env }
    }

    pub fn key(&self) -> String {
        self.env.version_ledger_key()
    }

    /// The whole catalog; empty when nothing was uploaded yet
    pub async fn load(&self) -> Result<VersionCatalog> {
        let key = self.key();
        match ledger::load::<VersionCatalog>(self.store, &self.env.s3.bucket, &key).await? {
            Some(catalog) => {
                ledger::check_format_version(&catalog.format_version, &key)?;
                tracing::debug!(
                    "Loaded {} versions for {}",
                    catalog.versions.len(),
                    self.env.name
                );
                Ok(catalog)
            }
            None => Ok(VersionCatalog::new(self.env)),
        }
    }

    pub async fn add_version(&self, version: Version) -> Result<()> {
        let mut catalog = self.load().await?;
        if catalog
            .versions
            .iter()
            .any(|v| v.version_id == version.version_id)
        {
            return Err(CoreError::AlreadyExists(format!(
                "version {} in {}",
                version.version_id, self.env.name
            )));
        }

        catalog.latest_version_id = version.version_id.clone();
        catalog.versions.insert(0, version);
        if catalog.versions.len() > MAX_VERSIONS {
            let dropped = catalog.versions.len() - MAX_VERSIONS;
            catalog.versions.truncate(MAX_VERSIONS);
            tracing::debug!("Dropped {} oldest versions of {}", dropped, self.env.name);
        }
        catalog.format_version = LEDGER_FORMAT_VERSION.to_string();
        catalog.last_updated = Utc::now();

        ledger::save(self.store, &self.env.s3.bucket, &self.key(), &catalog).await?;
        tracing::info!(
            "Recorded version {} for {}",
            catalog.latest_version_id,
            self.env.name
        );
        Ok(())
    }

    pub async fn versions(&self, query: &VersionQuery) -> Result<Vec<Version>> {
        let catalog = self.load().await?;
        let needle = query.search.as_ref().map(|s| s.to_lowercase());

        let mut versions: Vec<Version> = catalog
            .versions
            .into_iter()
            .filter(|v| query.since.is_none_or(|since| v.timestamp >= since))
            .filter(|v| query.before.is_none_or(|before| v.timestamp < before))
            .filter(|v| {
                needle
                    .as_ref()
                    .is_none_or(|n| v.description.to_lowercase().contains(n))
            })
            .collect();

        if query.latest_only {
            versions.truncate(1);
        }
        if query.sort_by_date {
            versions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }
        if let Some(limit) = query.limit {
            versions.truncate(limit);
        }
        Ok(versions)
    }

    /// Most recently appended version, if any
    pub async fn latest(&self) -> Result<Option<Version>> {
        let mut versions = self
            .versions(&VersionQuery {
                latest_only: true,
                ..Default::default()
            })
            .await?;
        Ok(versions.pop())
    }

    pub async fn latest_version(&self) -> Result<Version> {
        self.latest().await?.ok_or_else(|| {
            CoreError::NotFound(format!("no versions uploaded for '{}'", self.env.name))
        })
    }

    pub async fn version(&self, version_id: &str) -> Result<Version> {
        self.load()
            .await?
            .versions
            .into_iter()
            .find(|v| v.version_id == version_id)
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "version {} of '{}'",
                    version_id, self.env.name
                ))
            })
    }

    pub async fn stats(&self) -> Result<VersionStats> {
        let catalog = self.load().await?;
        let mut stats = VersionStats {
            total_versions: catalog.versions.len(),
            size_distribution: SIZE_BUCKETS
                .iter()
                .map(|label| (label.to_string(), 0))
                .collect(),
            ..Default::default()
        };
        if catalog.versions.is_empty() {
            return Ok(stats);
        }

        let mut total_size = 0u64;
        for version in &catalog.versions {
            total_size += version.size;
            *stats.by_user.entry(version.uploaded_by.clone()).or_default() += 1;
            stats.size_distribution[size_bucket(version.size)].1 += 1;
        }
        stats.average_size = total_size / catalog.versions.len() as u64;
        stats.most_active_user = stats
            .by_user
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(user, _)| user.clone());
        stats.last_updated = Some(catalog.last_updated);
        Ok(stats)
    }

    /// Line-level diff of two versions. Equal hashes skip the download.
    pub async fn compare_versions(&self, old_id: &str, new_id: &str) -> Result<Vec<LineDiff>> {
        let old = self.version(old_id).await?;
        let new = self.version(new_id).await?;
        if old.hash == new.hash {
            return Ok(Vec::new());
        }

        let old_content = self.fetch(&old).await?;
        let new_content = self.fetch(&new).await?;
        Ok(diff_lines(&old_content, &new_content))
    }

    /// Object versions of the variable file that the ledger does not list,
    /// newest first. These are uploads whose ledger append failed and
    /// entries pruned past [`MAX_VERSIONS`].
    pub async fn untracked(&self, limit: usize) -> Result<Vec<ObjectVersion>> {
        let catalog = self.load().await?;
        let known: HashSet<&str> = catalog
            .versions
            .iter()
            .map(|v| v.version_id.as_str())
            .collect();

        let objects = self
            .store
            .list_versions(
                &self.env.s3.bucket,
                &self.env.s3_key(),
                limit.saturating_add(known.len()),
            )
            .await?;
        Ok(objects
            .into_iter()
            .filter(|o| !known.contains(o.version_id.as_str()))
            .take(limit)
            .collect())
    }

    /// Bytes of one version of the variable file
    pub async fn fetch(&self, version: &Version) -> Result<Vec<u8>> {
        let object = self
            .store
            .get_object(
                &self.env.s3.bucket,
                &self.env.s3_key(),
                Some(&version.version_id),
            )
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "object {} version {}",
                    self.env.s3_uri(),
                    version.version_id
                ))
            })?;
        Ok(object.content)
    }
}

fn size_bucket(size: u64) -> usize {
    match size {
        s if s < 1024 => 0,
        s if s < 10 * 1024 => 1,
        s if s < 100 * 1024 => 2,
        s if s < 1024 * 1024 => 3,
        _ => 4,
    }
}

/// Compares two texts line by line at equal positions.
pub fn diff_lines(old: &[u8], new: &[u8]) -> Vec<LineDiff> {
    let old = String::from_utf8_lossy(old);
    let new = String::from_utf8_lossy(new);
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    (0..old_lines.len().max(new_lines.len()))
        .filter_map(|i| {
            let a = old_lines.get(i).copied();
            let b = new_lines.get(i).copied();
            (a != b).then(|| LineDiff {
                line: i + 1,
                old: a.map(str::to_string),
                new: b.map(str::to_string),
            })
        })
        .collect()
}
