use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use pinpoll::credentials::{self, CredentialPair};
use pinpoll::journal::{FileSink, LogSink, NullSink};
use pinpoll::supervisor::{AccountOutcome, Supervisor};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn setup_logging(default_filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stdout)
        .init();
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None | Some(Commands::Run) => run_accounts(cli, config, None).await,
        Some(Commands::Once { cycles }) => run_accounts(cli, config, Some(*cycles)).await,
        Some(Commands::Check) => handle_check_command(cli, config),
    }
}

fn credential_paths(cli: &Cli, config: &Config) -> (PathBuf, PathBuf) {
    let tokens = cli
        .tokens
        .clone()
        .unwrap_or_else(|| config.credentials.token_file.clone());
    let proxies = cli
        .proxies
        .clone()
        .unwrap_or_else(|| config.credentials.proxy_file.clone());
    (tokens, proxies)
}

fn load_pairs(cli: &Cli, config: &Config) -> Result<Vec<CredentialPair>> {
    let (tokens, proxies) = credential_paths(cli, config);
    credentials::load_files(&tokens, &proxies, config.credentials.proxy_policy)
        .context(format!("Failed to load credentials from {}", tokens.display()))
}

fn build_sink(config: &Config) -> Result<Arc<dyn LogSink>> {
    if !config.logging.per_account_files {
        return Ok(Arc::new(NullSink));
    }
    let sink = FileSink::new(&config.logging.dir)
        .context(format!("Failed to create log directory {}", config.logging.dir.display()))?;
    info!("Account logs are written to: {}", sink.dir().display());
    Ok(Arc::new(sink))
}

async fn run_accounts(cli: &Cli, config: &Config, max_cycles: Option<u64>) -> Result<()> {
    let pairs = load_pairs(cli, config)?;
    let supervisor_config = config.supervisor_config(max_cycles)?;
    let sink = build_sink(config)?;

    let mut supervisor = Supervisor::new(supervisor_config, sink);
    supervisor.start(&pairs).context("Failed to start accounts")?;
    if supervisor.is_empty() {
        eyre::bail!("None of the {} accounts could be started; check the proxy list", pairs.len());
    }
    println!("{} {} of {} accounts", "Running:".green(), supervisor.len(), pairs.len());

    let shutdown = supervisor.shutdown_handle();
    let join = supervisor.join();
    tokio::pin!(join);

    let outcomes = tokio::select! {
        outcomes = &mut join => outcomes,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            println!("{}", "Stopping accounts...".cyan());
            shutdown.trigger();
            join.await
        }
    };

    if shutdown.is_triggered() {
        println!("{}", "Stopped on request".yellow());
    }
    print_summary(&outcomes);
    Ok(())
}

fn print_summary(outcomes: &[AccountOutcome]) {
    for outcome in outcomes {
        match &outcome.report {
            Some(report) => println!(
                "  {} {} cycles, {} claimed, {} claim failures, {} profile failures, {} task list failures",
                format!("{}:", outcome.tag).green(),
                report.cycles,
                report.claims,
                report.claim_failures,
                report.profile_failures,
                report.list_failures,
            ),
            None => println!("  {} {}", format!("{}:", outcome.tag).red(), "crashed".red()),
        }
    }
}

fn handle_check_command(cli: &Cli, config: &Config) -> Result<()> {
    info!("Checking credential files");
    let pairs = load_pairs(cli, config)?;
    let jitter = config.jitter()?;

    let with_proxy = pairs.iter().filter(|p| p.proxy.is_some()).count();
    println!("{} {} accounts, {} with a proxy", "Loaded:".green(), pairs.len(), with_proxy);
    println!(
        "{} {}-{} seconds between claims and cycles",
        "Delay:".green(),
        jitter.min_secs(),
        jitter.max_secs()
    );
    for pair in &pairs {
        match &pair.proxy {
            Some(proxy) => println!("  account_{} -> {}", pair.index + 1, proxy),
            None => println!("  account_{} -> {}", pair.index + 1, "no proxy, will be skipped".yellow()),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration; it carries the default log level
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging
    setup_logging(&config.log_filter(cli.is_verbose()));

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
