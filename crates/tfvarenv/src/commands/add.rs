use super::{load_registry, print_sync_report, workspace};
use anyhow::Context;
use clap::Args;
use colored::Colorize;
use tfvarenv_config::Environment;
use tfvarenv_core::workflow::reconcile;
use tfvarenv_terraform::write_backend_config;

#[derive(Args)]
pub struct AddArgs {
    /// Environment name (dev, stg, prod, ...)
    pub name: String,
    /// S3 bucket with versioning enabled
    #[arg(long)]
    pub bucket: String,
    /// Key prefix inside the bucket
    #[arg(long)]
    pub prefix: String,
    /// AWS region (default: registry default region)
    #[arg(long)]
    pub region: Option<String>,
    /// Expected AWS account id, verified before plan/apply/destroy
    #[arg(long)]
    pub account_id: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    /// Object name of the variable file (default: terraform.tfvars)
    #[arg(long)]
    pub tfvars_key: Option<String>,
    /// Local variable file (default: envs/<name>/<tfvars-key>)
    #[arg(long)]
    pub local_path: Option<String>,
    /// Backend config file (default: envs/<name>/backend.tfvars)
    #[arg(long)]
    pub backend_config: Option<String>,
    /// Back up the local file before every upload
    #[arg(long)]
    pub auto_backup: bool,
    /// Ask for approval before apply
    #[arg(long)]
    pub require_approval: bool,
}

impl AddArgs {
    fn to_environment(&self) -> Environment {
        let mut env = Environment::new(&self.name, &self.bucket, &self.prefix);
        env.description = self.description.clone().unwrap_or_default();
        env.s3.tfvars_key = self.tfvars_key.clone().unwrap_or_default();
        env.aws.region = self.region.clone().unwrap_or_default();
        env.aws.account_id = self.account_id.clone().unwrap_or_default();
        env.local.tfvars_path = self.local_path.clone().unwrap_or_default();
        env.backend.config_path = self.backend_config.clone().unwrap_or_default();
        env.deployment.auto_backup = self.auto_backup;
        env.deployment.require_approval = self.require_approval;
        env
    }
}

pub async fn handle(args: AddArgs) -> anyhow::Result<()> {
    let registry = load_registry()?;
    if registry.get_environment(&args.name).is_ok() {
        anyhow::bail!("environment '{}' already exists", args.name);
    }

    let mut env = args.to_environment();
    env.normalize(&registry.default_region()?)?;

    println!("{}", format!("Checking {} ...", env.s3_uri()).blue());
    let ws = workspace(&registry, &env).await;
    ws.store
        .check_versioning(&env.s3.bucket)
        .await
        .with_context(|| {
            format!(
                "enable it with: aws s3api put-bucket-versioning --bucket {} --versioning-configuration Status=Enabled",
                env.s3.bucket
            )
        })?;
    ws.verify_account(&env).await?;

    let env = registry.add_environment(&args.name, env)?;
    println!("{} Added environment {}", "✓".green(), env.name.cyan().bold());
    println!("  S3:      {}", env.s3_uri());
    println!("  Region:  {}", env.aws.region);
    if !env.aws.account_id.is_empty() {
        println!("  Account: {}", env.aws.account_id);
    }
    println!("  Local:   {}", env.local.tfvars_path);

    if write_backend_config(&ws.backend_path(&env), &env, false).await? {
        println!(
            "{} Wrote backend config {}",
            "✓".green(),
            env.backend.config_path
        );
    }

    let report = reconcile(&ws, &env).await?;
    print_sync_report(&env, &report);
    Ok(())
}
