//! Environment definitions stored in the registry file

use serde::{Deserialize, Serialize};

pub const DEFAULT_TFVARS_KEY: &str = "terraform.tfvars";
pub const DEFAULT_REGION: &str = "ap-northeast-1";
pub const ENVS_DIR: &str = "envs";
pub const BACKEND_FILE: &str = "backend.tfvars";

/// A named provisioning target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub s3: S3Location,

    #[serde(default)]
    pub aws: AwsBinding,

    #[serde(default)]
    pub local: LocalBinding,

    #[serde(default)]
    pub deployment: DeploymentPolicy,

    #[serde(default)]
    pub backend: BackendReference,
}

/// Where the variable file and its ledgers live in the bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Location {
    pub bucket: String,
    pub prefix: String,
    #[serde(default)]
    pub tfvars_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsBinding {
    /// Expected caller account. Empty means "do not verify".
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalBinding {
    #[serde(default)]
    pub tfvars_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPolicy {
    #[serde(default)]
    pub auto_backup: bool,
    #[serde(default)]
    pub require_approval: bool,
}

/// Path to an externally managed `-backend-config` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendReference {
    #[serde(default)]
    pub config_path: String,
}

impl Environment {
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            s3: S3Location {
                bucket: bucket.into(),
                prefix: prefix.into(),
                tfvars_key: String::new(),
            },
            ..Default::default()
        }
    }

    /// Object key of the variable file: `{prefix}/{tfvars_key}`
    pub fn s3_key(&self) -> String {
        join_key(&self.s3.prefix, &self.s3.tfvars_key)
    }

    pub fn s3_uri(&self) -> String {
        format!("s3://{}/{}", self.s3.bucket, self.s3_key())
    }

    /// Object key of the version ledger: `{prefix}/.{tfvars_key}.versions.json`
    pub fn version_ledger_key(&self) -> String {
        join_key(
            &self.s3.prefix,
            &format!(".{}.versions.json", self.s3.tfvars_key),
        )
    }

    /// Object key of the deployment ledger: `{prefix}/.deployments.json`
    pub fn deployment_ledger_key(&self) -> String {
        join_key(&self.s3.prefix, ".deployments.json")
    }

    /// Key used for the Terraform state object in the default backend file.
    pub fn state_key(&self) -> String {
        join_key(&self.s3.prefix, "terraform.tfstate")
    }

    /// Checks required fields and fills every blank optional field.
    pub fn normalize(&mut self, default_region: &str) -> crate::Result<()> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(crate::RegistryError::Validation(
                "environment name is required".to_string(),
            ));
        }
        if self.name.contains('/') || self.name.contains('\\') {
            return Err(crate::RegistryError::Validation(format!(
                "environment name '{}' must not contain path separators",
                self.name
            )));
        }
        if self.s3.bucket.trim().is_empty() {
            return Err(crate::RegistryError::Validation(format!(
                "S3 bucket is required for environment '{}'",
                self.name
            )));
        }
        self.s3.prefix = self.s3.prefix.trim_matches('/').to_string();
        if self.s3.prefix.is_empty() {
            return Err(crate::RegistryError::Validation(format!(
                "S3 prefix is required for environment '{}'",
                self.name
            )));
        }

        if self.s3.tfvars_key.is_empty() {
            self.s3.tfvars_key = DEFAULT_TFVARS_KEY.to_string();
        }
        if self.aws.region.is_empty() {
            self.aws.region = default_region.to_string();
        }
        if self.local.tfvars_path.is_empty() {
            self.local.tfvars_path = format!("{}/{}/{}", ENVS_DIR, self.name, self.s3.tfvars_key);
        }
        if self.backend.config_path.is_empty() {
            self.backend.config_path = format!("{}/{}/{}", ENVS_DIR, self.name, BACKEND_FILE);
        }
        Ok(())
    }
}

fn join_key(prefix: &str, leaf: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        leaf.to_string()
    } else {
        format!("{}/{}", prefix, leaf)
    }
}
