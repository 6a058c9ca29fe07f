use super::{
    expand_version_id, format_time, load_environment, load_registry, parse_time, workspace,
};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use colored::Colorize;
use tfvarenv_core::version::short_id;
use tfvarenv_core::{DeployCommand, DeployStatus, DeploymentQuery, EnvironmentState};

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Success,
    Failure,
}

impl From<StatusFilter> for DeployStatus {
    fn from(value: StatusFilter) -> Self {
        match value {
            StatusFilter::Success => DeployStatus::Success,
            StatusFilter::Failure => DeployStatus::Failure,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CommandFilter {
    Apply,
    Plan,
    Destroy,
}

impl From<CommandFilter> for DeployCommand {
    fn from(value: CommandFilter) -> Self {
        match value {
            CommandFilter::Apply => DeployCommand::Apply,
            CommandFilter::Plan => DeployCommand::Plan,
            CommandFilter::Destroy => DeployCommand::Destroy,
        }
    }
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Environment name
    pub env: String,
    /// Maximum number of records to show
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,
    #[arg(long, value_enum)]
    pub status: Option<StatusFilter>,
    #[arg(long, value_enum)]
    pub command: Option<CommandFilter>,
    /// Only records by this user
    #[arg(long)]
    pub user: Option<String>,
    /// Only records of this version id or unique prefix
    #[arg(long)]
    pub version_id: Option<String>,
    /// Only records at or after this time (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_time)]
    pub since: Option<DateTime<Utc>>,
    /// Only records before this time
    #[arg(long, value_parser = parse_time)]
    pub before: Option<DateTime<Utc>>,
    /// Show deployment statistics
    #[arg(long)]
    pub stats: bool,
}

pub async fn handle(args: HistoryArgs) -> anyhow::Result<()> {
    let registry = load_registry()?;
    let env = load_environment(&registry, &args.env)?;
    let ws = workspace(&registry, &env).await;
    let ledger = ws.deployments(&env);

    match ledger.current_state().await? {
        Some(state) => {
            let label = match state.status {
                EnvironmentState::Active => state.status.to_string().green().bold(),
                EnvironmentState::Destroyed => state.status.to_string().red().bold(),
            };
            println!(
                "{} is {} since {}",
                env.name.cyan().bold(),
                label,
                format_time(&state.modified_time)
            );
        }
        None => println!("{} has never been deployed", env.name.cyan().bold()),
    }

    // Prefixes expand against the ids this ledger actually recorded.
    let version_id = match &args.version_id {
        Some(id) => {
            let history = ledger.history().await?;
            let recorded = history.iter().map(|r| r.version_id.as_str());
            Some(expand_version_id(id, recorded)?.unwrap_or_else(|| id.clone()))
        }
        None => None,
    };

    let query = DeploymentQuery {
        since: args.since,
        before: args.before,
        status: args.status.map(Into::into),
        command: args.command.map(Into::into),
        deployed_by: args.user.clone(),
        version_id,
        limit: Some(args.limit),
    };
    let records = ledger.query(&query).await?;

    println!();
    println!("{}", "Deployments:".bold());
    if records.is_empty() {
        println!("  {}", "no deployments".dimmed());
    }
    for record in &records {
        let status = if record.is_success() {
            "✓".green()
        } else {
            "✗".red()
        };
        let duration = record
            .duration()
            .map(|d| format!("{:.1}s", d.as_secs_f64()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {}  {:<8} {}  {:<12} {:>8}",
            status,
            format_time(&record.timestamp),
            record.command.to_string(),
            short_id(&record.version_id).cyan(),
            record.deployed_by,
            duration
        );
        if let Some(error) = &record.error_message {
            println!("      {}", error.red());
        }
    }

    if args.stats {
        let stats = ledger.stats().await?;
        println!();
        println!("{}", "Statistics:".bold());
        println!(
            "  Total: {}  success: {}  failure: {}",
            stats.total,
            stats.success_count.to_string().green(),
            stats.failure_count.to_string().red()
        );
        if let Some(average) = stats.average_duration {
            println!("  Average duration: {:.1}s", average.as_secs_f64());
        }
        for (user, count) in &stats.by_user {
            println!("    {:<16} {}", user, count);
        }
        if !stats.common_errors.is_empty() {
            println!("  Common errors:");
            for (error, count) in stats.common_errors.iter().take(5) {
                println!("    {}x {}", count, error);
            }
        }
    }
    Ok(())
}
