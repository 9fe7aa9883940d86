//! Pomodoro Tracker CLI
//!
//! This tool helps you stay focused using the Pomodoro Technique:
//! - 25 minutes of focused work
//! - 5 minutes of short break
//! - 15 minutes of long break after every 4 pomodoros
//!
//! Completed intervals are recorded and summarized by `stats`.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};

use pomodoro_tracker::cli::{auth, monitor};
use pomodoro_tracker::cli::{CategoriesCommand, Cli, Commands, Display, IpcClient, SettingsCommand};
use pomodoro_tracker::config::Config;
use pomodoro_tracker::daemon;
use pomodoro_tracker::types::ResponseData;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(&cli);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins; otherwise the daemon logs at `info`, the CLI at `warn`,
/// and `--verbose` lowers either to `debug`.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if cli.verbose {
        "debug"
    } else if matches!(cli.command, Some(Commands::Daemon)) {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Start(args)) => {
            let client = IpcClient::new()?;
            let response = if args.no_category {
                client.start_uncategorized().await?
            } else {
                client.start(args.category).await?
            };
            Display::show_timer_result(&response);
        }
        Some(Commands::Pause) => {
            let response = IpcClient::new()?.pause().await?;
            Display::show_timer_result(&response);
        }
        Some(Commands::Stop) => {
            let response = IpcClient::new()?.stop().await?;
            Display::show_timer_result(&response);
        }
        Some(Commands::Reset) => {
            let response = IpcClient::new()?.reset().await?;
            Display::show_timer_result(&response);
        }
        Some(Commands::Status) => {
            let response = IpcClient::new()?.status().await?;
            Display::show_status(&response);
        }
        Some(Commands::Stats(args)) => {
            let response = IpcClient::new()?.stats().await?;
            match response.data {
                Some(ResponseData::Statistics(report)) => Display::show_stats(&report, args.weeks),
                _ => anyhow::bail!("Unexpected response from daemon"),
            }
        }
        Some(Commands::Settings(SettingsCommand::Show)) => {
            let response = IpcClient::new()?.settings().await?;
            match response.data {
                Some(ResponseData::Settings(settings)) => Display::show_settings(&settings),
                _ => anyhow::bail!("Unexpected response from daemon"),
            }
        }
        Some(Commands::Settings(SettingsCommand::Set(args))) => {
            let patch = args.to_patch();
            if patch.is_empty() {
                anyhow::bail!("Nothing to change. See 'pomodoro-tracker settings set --help'");
            }
            let response = IpcClient::new()?.update_settings(patch).await?;
            Display::show_success(&response.message);
            if let Some(ResponseData::Settings(settings)) = &response.data {
                Display::show_settings(settings);
            }
        }
        Some(Commands::Categories(CategoriesCommand::List)) => {
            let response = IpcClient::new()?.categories().await?;
            match response.data {
                Some(ResponseData::Categories(categories)) => Display::show_categories(&categories),
                _ => anyhow::bail!("Unexpected response from daemon"),
            }
        }
        Some(Commands::Categories(CategoriesCommand::Add(args))) => {
            let response = IpcClient::new()?
                .create_category(args.to_new_category())
                .await?;
            Display::show_success(&response.message);
        }
        Some(Commands::Monitor(args)) => {
            monitor::run(&args).await?;
        }
        Some(Commands::Login(args)) => {
            let config = Config::from_env().context("Invalid configuration")?;
            let message = auth::login(&args, &config).await?;
            Display::show_success(&message);
        }
        Some(Commands::Logout) => {
            let config = Config::from_env().context("Invalid configuration")?;
            let message = auth::logout(&config).await?;
            Display::show_success(&message);
        }
        Some(Commands::Daemon) => {
            let config = Config::from_env().context("Invalid configuration")?;
            daemon::run(config).await?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
