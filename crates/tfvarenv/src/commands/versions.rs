use super::{format_size, format_time, load_environment, load_registry, parse_time, workspace};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use tfvarenv_core::VersionQuery;

#[derive(Args)]
pub struct VersionsArgs {
    /// Environment name
    pub env: String,
    /// Maximum number of versions to show
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,
    /// Only versions uploaded at or after this time (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_time)]
    pub since: Option<DateTime<Utc>>,
    /// Only versions uploaded before this time
    #[arg(long, value_parser = parse_time)]
    pub before: Option<DateTime<Utc>>,
    /// Case-insensitive search in descriptions
    #[arg(short, long)]
    pub search: Option<String>,
    /// Show the latest version only
    #[arg(long)]
    pub latest: bool,
    /// Order by upload time instead of upload order
    #[arg(long)]
    pub sort_by_date: bool,
    /// Show ledger statistics
    #[arg(long)]
    pub stats: bool,
    /// List bucket object versions missing from the ledger instead
    #[arg(long, conflicts_with_all = ["latest", "stats"])]
    pub untracked: bool,
}

pub async fn handle(args: VersionsArgs) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let env = load_environment(&registry, &args.env)?;
    let ws = workspace(&registry, &env).await;
    let ledger = ws.versions(&env);

    if args.untracked {
        let objects = ledger.untracked(args.limit).await?;
        println!(
            "{}",
            format!("Object versions of {} not in the ledger:", env.s3_uri()).bold()
        );
        if objects.is_empty() {
            println!("  {}", "none".dimmed());
        }
        for object in &objects {
            let modified = object
                .last_modified
                .as_ref()
                .map(format_time)
                .unwrap_or_else(|| "-".to_string());
            let current = if object.is_latest {
                format!(" [{}]", "current".yellow())
            } else {
                String::new()
            };
            println!(
                "  {}  {}  {:>9}{}",
                object.version_id.cyan(),
                modified,
                format_size(object.size),
                current
            );
        }
        return Ok(());
    }

    let query = VersionQuery {
        since: args.since,
        before: args.before,
        search: args.search.clone(),
        latest_only: args.latest,
        sort_by_date: args.sort_by_date,
        limit: Some(args.limit),
    };
    let versions = ledger.versions(&query).await?;
    let latest_id = ledger.latest().await?.map(|v| v.version_id);
    let deployed_id = ws
        .deployments(&env)
        .last_successful_apply()
        .await?
        .map(|r| r.version_id);

    println!("{}", format!("Versions of {}:", env.name).bold());
    if versions.is_empty() {
        println!("  {}", "no versions".dimmed());
    }
    for version in &versions {
        let mut marks = Vec::new();
        if latest_id.as_deref() == Some(version.version_id.as_str()) {
            marks.push("latest".green().to_string());
        }
        if deployed_id.as_deref() == Some(version.version_id.as_str()) {
            marks.push("deployed".blue().to_string());
        }
        let marks = if marks.is_empty() {
            String::new()
        } else {
            format!(" [{}]", marks.join(", "))
        };

        println!(
            "  {}  {}  {:<12} {:>9}{}",
            version.short_id().cyan(),
            format_time(&version.timestamp),
            version.uploaded_by,
            format_size(version.size),
            marks
        );
        if !version.description.is_empty() {
            println!("            {}", version.description.dimmed());
        }
    }

    if args.stats {
        let stats = ledger.stats().await?;
        println!();
        println!("{}", "Statistics:".bold());
        println!("  Total versions: {}", stats.total_versions);
        println!("  Average size:   {}", format_size(stats.average_size));
        if let Some(user) = &stats.most_active_user {
            println!("  Most active:    {}", user);
        }
        if let Some(updated) = &stats.last_updated {
            println!("  Last updated:   {}", format_time(updated));
        }
        for (user, count) in &stats.by_user {
            println!("    {:<16} {}", user, count);
        }
        println!("  Size distribution:");
        for (bucket, count) in &stats.size_distribution {
            println!("    {:<16} {}", bucket, count);
        }
    }
    Ok(())
}
