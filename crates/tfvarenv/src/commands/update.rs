use super::{load_environment, load_registry};
use clap::Args;
use colored::Colorize;
use tfvarenv_config::Environment;

#[derive(Args)]
pub struct UpdateArgs {
    /// Environment name
    pub name: String,
    /// New environment name
    #[arg(long)]
    pub rename: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(long)]
    pub bucket: Option<String>,
    #[arg(long)]
    pub prefix: Option<String>,
    #[arg(long)]
    pub region: Option<String>,
    /// Expected AWS account id (empty string disables the check)
    #[arg(long)]
    pub account_id: Option<String>,
    #[arg(long)]
    pub tfvars_key: Option<String>,
    #[arg(long)]
    pub local_path: Option<String>,
    #[arg(long)]
    pub backend_config: Option<String>,
    #[arg(long)]
    pub auto_backup: Option<bool>,
    #[arg(long)]
    pub require_approval: Option<bool>,
}

impl UpdateArgs {
    fn apply_to(&self, env: &mut Environment) {
        if let Some(name) = &self.rename {
            env.name = name.clone();
        }
        if let Some(description) = &self.description {
            env.description = description.clone();
        }
        if let Some(bucket) = &self.bucket {
            env.s3.bucket = bucket.clone();
        }
        if let Some(prefix) = &self.prefix {
            env.s3.prefix = prefix.clone();
        }
        if let Some(key) = &self.tfvars_key {
            env.s3.tfvars_key = key.clone();
        }
        if let Some(region) = &self.region {
            env.aws.region = region.clone();
        }
        if let Some(account_id) = &self.account_id {
            env.aws.account_id = account_id.clone();
        }
        if let Some(path) = &self.local_path {
            env.local.tfvars_path = path.clone();
        }
        if let Some(path) = &self.backend_config {
            env.backend.config_path = path.clone();
        }
        if let Some(auto_backup) = self.auto_backup {
            env.deployment.auto_backup = auto_backup;
        }
        if let Some(require_approval) = self.require_approval {
            env.deployment.require_approval = require_approval;
        }
    }
}

pub async fn handle(args: UpdateArgs) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let mut env = load_environment(&registry, &args.name)?;
    let before = env.clone();

    args.apply_to(&mut env);
    if env == before {
        println!("Nothing to update for {}", args.name.cyan());
        return Ok(());
    }

    let env = registry.update_environment(&args.name, env)?;
    if env.name != args.name {
        println!(
            "{} Renamed {} to {}",
            "✓".green(),
            args.name,
            env.name.cyan()
        );
        println!(
            "  Local paths are unchanged: {} and {}",
            env.local.tfvars_path, env.backend.config_path
        );
    } else {
        println!("{} Updated environment {}", "✓".green(), env.name.cyan());
    }
    if env.s3 != before.s3 {
        println!(
            "{} S3 location changed to {}; existing ledgers stay at the old prefix",
            "⚠".yellow(),
            env.s3_uri()
        );
    }
    Ok(())
}
