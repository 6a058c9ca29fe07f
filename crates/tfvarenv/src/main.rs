mod commands;
mod console;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tfvarenv_config::DEFAULT_REGION;
use tfvarenv_core::CoreError;

#[derive(Parser)]
#[command(name = "tfvarenv")]
#[command(about = "Versioned Terraform variable files per environment, kept in S3", long_about = None)]
struct Cli {
    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .tfvarenv.json and the working directories
    Init {
        /// Default AWS region for new environments
        #[arg(long, default_value = DEFAULT_REGION)]
        region: String,
    },
    /// Register an environment
    Add(commands::add::AddArgs),
    /// List environments with their sync and deployment status
    List {
        /// Print names only, without contacting AWS
        #[arg(short, long)]
        short: bool,
    },
    /// Unregister an environment (remote files are kept)
    Remove {
        /// Environment name
        env: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Change or rename an environment
    Update(commands::update::UpdateArgs),
    /// Run terraform init against the environment's backend
    Use {
        /// Environment name
        env: String,
    },
    /// Upload the local variable file as a new version
    Upload {
        /// Environment name
        env: String,
        /// Description recorded with the version
        #[arg(short = 'm', long)]
        description: Option<String>,
        /// Back up the local file before uploading
        #[arg(long, conflicts_with = "no_backup")]
        backup: bool,
        /// Do not back up, even when the environment enables auto backup
        #[arg(long)]
        no_backup: bool,
    },
    /// Download a version into the local variable file
    Download {
        /// Environment name
        env: String,
        /// Version id or unique prefix (default: latest)
        #[arg(long)]
        version_id: Option<String>,
        /// Overwrite local changes without asking
        #[arg(short, long)]
        force: bool,
    },
    /// Show uploaded versions
    Versions(commands::versions::VersionsArgs),
    /// Line diff between two versions
    Diff {
        /// Environment name
        env: String,
        /// Older version id or prefix
        old: String,
        /// Newer version id or prefix
        new: String,
    },
    /// Show deployment history
    History(commands::history::HistoryArgs),
    /// Run terraform plan
    Plan {
        /// Environment name
        env: String,
        /// Use a version from S3 instead of the local file
        #[arg(short, long)]
        remote: bool,
        /// Version id or unique prefix (implies --remote)
        #[arg(long)]
        version_id: Option<String>,
        /// Extra terraform arguments (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Run terraform apply and record the deployment
    Apply {
        /// Environment name
        env: String,
        /// Use a version from S3 instead of the local file
        #[arg(short, long)]
        remote: bool,
        /// Version id or unique prefix (implies --remote)
        #[arg(long)]
        version_id: Option<String>,
        /// Skip approval prompts
        #[arg(short = 'y', long)]
        auto_approve: bool,
        /// Extra terraform arguments (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Run terraform destroy with the last applied version
    Destroy {
        /// Environment name
        env: String,
        /// Version id or unique prefix (default: last successful apply)
        #[arg(long)]
        version_id: Option<String>,
        /// Skip the typed confirmation
        #[arg(short = 'y', long)]
        auto_approve: bool,
        /// Extra terraform arguments (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tokio::spawn(exit_on_interrupt());

    if let Err(e) = run(cli.command).await {
        if let Some(core) = e.downcast_ref::<CoreError>()
            && core.is_cancelled()
        {
            eprintln!("{}", core.to_string().yellow());
        } else {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
        }
        std::process::exit(1);
    }
}

/// Exits on Ctrl-C, also while a prompt blocks the main thread. A running
/// terraform child is left to the runner, which waits for it and records
/// the interrupted attempt.
async fn exit_on_interrupt() {
    while tokio::signal::ctrl_c().await.is_ok() {
        if !tfvarenv_terraform::child_running() {
            eprintln!();
            eprintln!("{}", "Interrupted".yellow());
            std::process::exit(130);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init { region } => commands::init::handle(&region).await,
        Commands::Add(args) => commands::add::handle(args).await,
        Commands::List { short } => commands::list::handle(short).await,
        Commands::Remove { env, yes } => commands::remove::handle(&env, yes).await,
        Commands::Update(args) => commands::update::handle(args).await,
        Commands::Use { env } => commands::use_env::handle(&env).await,
        Commands::Upload {
            env,
            description,
            backup,
            no_backup,
        } => {
            let backup = match (backup, no_backup) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::upload::handle(&env, description, backup).await
        }
        Commands::Download {
            env,
            version_id,
            force,
        } => commands::download::handle(&env, version_id, force).await,
        Commands::Versions(args) => commands::versions::handle(args).await,
        Commands::Diff { env, old, new } => commands::diff::handle(&env, &old, &new).await,
        Commands::History(args) => commands::history::handle(args).await,
        Commands::Plan {
            env,
            remote,
            version_id,
            args,
        } => commands::plan::handle(&env, remote, version_id, args).await,
        Commands::Apply {
            env,
            remote,
            version_id,
            auto_approve,
            args,
        } => commands::apply::handle(&env, remote, version_id, auto_approve, args).await,
        Commands::Destroy {
            env,
            version_id,
            auto_approve,
            args,
        } => commands::destroy::handle(&env, version_id, auto_approve, args).await,
        Commands::Version => {
            println!("tfvarenv {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
