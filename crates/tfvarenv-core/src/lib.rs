//! tfvarenv core
//!
//! Versioned Terraform variable files kept in a versioned S3 bucket.
//!
//! # Layout in the bucket
//!
//! ```text
//! s3://{bucket}/{prefix}/
//! ├── {tfvars_key}                   variable file (native object versions)
//! ├── .{tfvars_key}.versions.json    version ledger, newest first
//! └── .deployments.json              deployment history + latest pointer
//! ```
//!
//! Storage and the provisioning tool are reached through the
//! [`ObjectStore`] and [`Provisioner`] traits so the workflows in
//! [`workflow`] run the same against AWS or in-memory fakes.

pub mod console;
pub mod deployment;
pub mod error;
pub mod files;
mod ledger;
pub mod runner;
pub mod store;
pub mod version;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use console::Console;
pub use deployment::{
    DeployCommand, DeployStatus, DeploymentHistory, DeploymentLedger, DeploymentQuery,
    DeploymentRecord, DeploymentStats, EnvironmentState, LatestDeployment,
};
pub use error::{CoreError, Result};
pub use ledger::LEDGER_FORMAT_VERSION;
pub use runner::{ExecutionResult, Provisioner, RunOptions};
pub use store::{ObjectStore, ObjectVersion, PutObject, PutOutput, StoredObject};
pub use version::{
    LineDiff, MAX_VERSIONS, Version, VersionCatalog, VersionLedger, VersionQuery, VersionStats,
};
pub use workflow::Workspace;
