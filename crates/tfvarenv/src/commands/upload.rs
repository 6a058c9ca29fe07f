use super::{load_environment, load_registry, print_upload_outcome, workspace};
use colored::Colorize;
use tfvarenv_core::workflow::{UploadRequest, upload};

pub async fn handle(
    name: &str,
    description: Option<String>,
    backup: Option<bool>,
) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let env = load_environment(&registry, name)?;
    let ws = workspace(&registry, &env).await;

    println!(
        "{}",
        format!("Uploading {} to {} ...", env.local.tfvars_path, env.s3_uri()).blue()
    );
    let request = UploadRequest {
        description: description.unwrap_or_default(),
        backup,
    };
    let outcome = upload(&ws, &env, &request).await?;
    print_upload_outcome(&env, &outcome);
    Ok(())
}
