//! tfvarenv environment registry
//!
//! Environments are stored in `.tfvarenv.json` at the project root. Each
//! entry binds a name to an S3 location, an AWS account/region, a local
//! variable file and deployment policy flags.

pub mod error;
pub mod model;
pub mod registry;

pub use error::{RegistryError, Result};
pub use model::{
    AwsBinding, BackendReference, DEFAULT_REGION, DEFAULT_TFVARS_KEY, DeploymentPolicy,
    Environment, LocalBinding, S3Location,
};
pub use registry::{CONFIG_ENV_VAR, REGISTRY_FILE, Registry, RegistryFile};
