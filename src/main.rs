//! Kafka GitOps CLI entrypoint.
//!
//! This is the main entrypoint for the kafka-gitops command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use kafka_gitops::accounts::{AccountDirectory, ConfluentCloudClient};
use kafka_gitops::cli::{Cli, Commands, OutputFormatter};
use kafka_gitops::config::{
    CloudConfig, ClusterConfig, ConfigParser, ConfigValidator, DesiredStateFile,
};
use kafka_gitops::error::Result;
use kafka_gitops::kafka::RestClusterClient;
use kafka_gitops::manager::{StateManager, create_accounts};
use kafka_gitops::planner::LocalPlanStore;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output, cli.plan_options());
    match runtime.block_on(run(&cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = match cli.command {
                Commands::Validate { .. } => formatter.format_invalid(&e),
                Commands::Plan { .. } => formatter.format_plan_error(&e),
                Commands::Apply { .. } => formatter.format_apply_error(&e),
                Commands::Account => format!("Error: {e}"),
            };
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: &Cli, formatter: &OutputFormatter) -> Result<()> {
    match &cli.command {
        Commands::Validate { warnings } => cmd_validate(cli, *warnings, formatter),
        Commands::Plan {
            out,
            include_unchanged,
        } => cmd_plan(cli, out.clone(), *include_unchanged, formatter).await,
        Commands::Apply { plan, yes } => cmd_apply(cli, plan.clone(), *yes, formatter).await,
        Commands::Account => cmd_account(cli, formatter).await,
    }
}

/// Validate the state file.
fn cmd_validate(cli: &Cli, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    let state = load_state(&cli.file)?;
    let result = ConfigValidator::new().validate(&state)?;
    eprintln!("{}", formatter.format_validation(&result, show_warnings));
    Ok(())
}

/// Generate and show a plan.
async fn cmd_plan(
    cli: &Cli,
    out: Option<PathBuf>,
    include_unchanged: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let state = load_state(&cli.file)?;
    let client = connect_cluster().await?;
    let accounts = connect_accounts(&state)?;
    let store = LocalPlanStore::from_option(out).with_include_unchanged(include_unchanged);

    let mut manager = StateManager::new(&state, &client, &store).with_options(cli.plan_options());
    if let Some(accounts) = accounts.as_deref() {
        manager = manager.with_accounts(accounts);
    }

    let outcome = manager.plan().await?;
    eprintln!("{}", formatter.format_plan(&outcome));
    Ok(())
}

/// Apply a stored or freshly generated plan.
async fn cmd_apply(
    cli: &Cli,
    plan: Option<PathBuf>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let state = load_state(&cli.file)?;
    let client = connect_cluster().await?;
    let accounts = connect_accounts(&state)?;
    let store = LocalPlanStore::from_option(plan);

    let mut manager = StateManager::new(&state, &client, &store).with_options(cli.plan_options());
    if let Some(accounts) = accounts.as_deref() {
        manager = manager.with_accounts(accounts);
    }

    let pending = manager.pending_plan().await?;

    if !auto_approve && !pending.overview.is_empty() {
        eprintln!("{}", formatter.format_plan(&pending));
        eprint!("Do you want to apply this plan? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(());
        }
    }

    let outcome = manager.apply_plan(pending.plan).await?;
    eprintln!("{}", formatter.format_apply(&outcome));
    Ok(())
}

/// Create missing service accounts.
async fn cmd_account(cli: &Cli, formatter: &OutputFormatter) -> Result<()> {
    let state = load_state(&cli.file)?;
    let accounts = connect_accounts(&state)?;

    let created = create_accounts(&state, accounts.as_deref()).await?;
    eprintln!("{}", formatter.format_accounts(created));
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads `.env` and the state file with its auxiliary files.
fn load_state(path: &Path) -> Result<DesiredStateFile> {
    debug!("Loading state file from: {}", path.display());

    let parser = ConfigParser::new();
    parser.load_dotenv()?;
    parser.load_file(path)
}

/// Connects to the Kafka REST proxy configured in the environment.
async fn connect_cluster() -> Result<RestClusterClient> {
    let config = ClusterConfig::from_env()?;
    info!("Using cluster configuration: {config:?}");
    RestClusterClient::connect(config).await
}

/// Creates the account directory client when identity provisioning is on.
fn connect_accounts(state: &DesiredStateFile) -> Result<Option<Box<dyn AccountDirectory>>> {
    if !state.is_cloud_enabled() {
        return Ok(None);
    }
    let config = CloudConfig::from_env()?;
    info!("Using account directory configuration: {config:?}");
    Ok(Some(Box::new(ConfluentCloudClient::new(config)?)))
}
