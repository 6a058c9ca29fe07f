//! S3 backend configuration file
//!
//! `terraform init -backend-config=<file>` reads this file. The state object
//! sits next to the variable file under the environment prefix.

use std::path::Path;
use tera::{Context, Tera};
use tfvarenv_config::Environment;
use tfvarenv_core::files::{self, WriteOptions};
use tfvarenv_core::{CoreError, Result};

const BACKEND_TEMPLATE: &str = r#"# Managed by tfvarenv for environment "{{ name }}"
bucket  = "{{ bucket }}"
key     = "{{ key }}"
region  = "{{ region }}"
encrypt = true
"#;

/// Renders the backend configuration for `env`.
pub fn render_backend_config(env: &Environment) -> Result<String> {
    let mut context = Context::new();
    context.insert("name", &env.name);
    context.insert("bucket", &env.s3.bucket);
    context.insert("key", &env.state_key());
    context.insert("region", &env.aws.region);

    Tera::one_off(BACKEND_TEMPLATE, &context, false).map_err(|e| {
        CoreError::Validation(format!(
            "failed to render backend config for '{}': {}",
            env.name, e
        ))
    })
}

/// Writes the backend file unless one exists and `overwrite` is false.
///
/// Returns whether the file was written.
pub async fn write_backend_config(path: &Path, env: &Environment, overwrite: bool) -> Result<bool> {
    if !overwrite && files::exists(path).await {
        tracing::debug!("Keeping existing backend config {}", path.display());
        return Ok(false);
    }

    let rendered = render_backend_config(env)?;
    files::write_file(path, rendered.as_bytes(), WriteOptions::default()).await?;
    tracing::info!("Wrote backend config {}", path.display());
    Ok(true)
}
