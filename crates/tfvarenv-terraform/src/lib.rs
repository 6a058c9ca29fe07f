//! Terraform integration for tfvarenv
//!
//! - [`Terraform`]: runs the terraform CLI as a [`tfvarenv_core::Provisioner`]
//! - [`backend`]: renders the S3 backend configuration file

pub mod backend;
mod terraform;

pub use backend::{render_backend_config, write_backend_config};
pub use terraform::{INTERRUPT_GRACE, TERRAFORM_BIN_ENV_VAR, Terraform, build_args, child_running};
