mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use roomload_runner::{
    render_run_report, render_suite_table, LoadTest, LoadTestError, SuiteRunner,
};
use roomload_session::SimulatedSessionFactory;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{LoadConfig, RunOverrides};

const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (.toml or .env)
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[command(flatten)]
    overrides: RunOverrides,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single load test (default)
    Run,
    /// Run the fixed benchmark case list
    Suite,
    /// Print the resolved configuration
    Config,
}

/// Cancels `cancel` on SIGINT or SIGTERM.
fn install_signal_handlers(cancel: CancellationToken) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let _ = flag::register(SIGTERM, Arc::clone(&shutdown));
    let _ = flag::register(SIGINT, Arc::clone(&shutdown));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SIGNAL_POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    if shutdown.load(Ordering::Relaxed) {
                        info!("shutdown signal received, stopping load test");
                        cancel.cancel();
                        return;
                    }
                }
            }
        }
    });
}

async fn run_once(config: &LoadConfig, cancel: &CancellationToken) -> ExitCode {
    let factory = Arc::new(SimulatedSessionFactory::new(config.simulation()));
    let test = LoadTest::new(config.run_parameters(), factory)
        .with_speaker_interval(config.speaker_interval);

    match test.run(cancel).await {
        Ok(outcome) => {
            print!("{}", render_run_report(&outcome));
            ExitCode::SUCCESS
        }
        Err(LoadTestError::AdmissionCancelled { spawned, partial }) => {
            print!("{}", render_run_report(&partial));
            error!("load test cancelled after admitting {spawned} participants");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("load test failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_suite(config: &LoadConfig, cancel: &CancellationToken) -> ExitCode {
    let factory = Arc::new(SimulatedSessionFactory::new(config.simulation()));
    let test = LoadTest::new(config.run_parameters(), factory)
        .with_speaker_interval(config.speaker_interval);
    let suite = SuiteRunner::new(test);

    let mut completed = Vec::new();
    let result = suite
        .run(cancel, |row| {
            info!(
                publishers = row.case.publishers,
                subscribers = row.case.subscribers,
                tracks = row.tracks,
                errors = row.errors,
                "suite case finished"
            );
            completed.push(row.clone());
        })
        .await;

    if !completed.is_empty() {
        print!("{}", render_suite_table(&completed));
    }
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("suite aborted: {err}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = std::env::var("ROOMLOAD_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match LoadConfig::new(cli.config, &cli.overrides) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Config => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                print!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("failed to render config: {err}");
                ExitCode::FAILURE
            }
        },
        Commands::Run => {
            install_signal_handlers(cancel.clone());
            run_once(&config, &cancel).await
        }
        Commands::Suite => {
            install_signal_handlers(cancel.clone());
            run_suite(&config, &cancel).await
        }
    }
}
