//! Ambulance Tracker - driver terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (prompts for anything not given)
//! ambulance-tracker login -e driver@example.com
//!
//! # Open the dashboard with a fixed position
//! ambulance-tracker dashboard --latitude 12.97 --longitude 77.59
//!
//! # Log in, then open the dashboard with the emergency action
//! ambulance-tracker run --emergency-button --location-file /run/gps/fix.json
//!
//! # Forget the stored session
//! ambulance-tracker logout
//! ```
//!
//! # Commands
//!
//! - `login` - Submit credentials and store the session token
//! - `dashboard` - Share location and watch the remote status
//! - `run` - `login` followed by `dashboard`
//! - `logout` - Remove the stored session token
//!
//! Settings come from the environment (see `TrackerConfig`); flags
//! override them.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use ambulance_tracker_client::config::{TrackerConfig, parse_base_url};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod terminal;

use commands::CliError;
use commands::dashboard::DashboardArgs;
use commands::login::LoginArgs;
use terminal::Terminal;

#[derive(Debug, Parser)]
#[command(name = "ambulance-tracker")]
#[command(author, version, about = "Ambulance driver location sharing")]
struct Cli {
    /// Tracking service base URL (overrides `TRACKER_BASE_URL`)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Session token file (overrides `TRACKER_TOKEN_PATH`)
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login(LoginArgs),
    /// Open the tracking dashboard
    Dashboard(DashboardArgs),
    /// Log in, then open the tracking dashboard
    Run {
        #[command(flatten)]
        login: LoginArgs,
        #[command(flatten)]
        dashboard: DashboardArgs,
    },
    /// Remove the stored session token
    Logout,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &TrackerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(log_json: bool) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ambulance_tracker=info,ambulance_tracker_client=info".into());

    // Logs go to stderr; stdout belongs to the dashboard.
    let json_layer = log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = TrackerConfig::from_env();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing(config.as_ref().is_ok_and(|c| c.log_json));

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut config: TrackerConfig) -> Result<(), CliError> {
    if let Some(base_url) = &cli.base_url {
        config.base_url = parse_base_url(base_url)?;
    }
    if let Some(token_path) = cli.token_path {
        config.token_path = token_path;
    }

    let mut terminal = Terminal::spawn();

    match cli.command {
        Commands::Login(args) => commands::login::run(&config, &args, &mut terminal).await,
        Commands::Dashboard(args) => {
            commands::dashboard::run(&config, &args, &mut terminal).await
        }
        Commands::Run { login, dashboard } => {
            commands::login::run(&config, &login, &mut terminal).await?;
            commands::dashboard::run(&config, &dashboard, &mut terminal).await
        }
        Commands::Logout => commands::logout::run(&config),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flattens_login_and_dashboard_flags() {
        let cli = Cli::try_parse_from([
            "ambulance-tracker",
            "--base-url",
            "http://localhost:8080",
            "run",
            "-e",
            "driver@example.com",
            "--latitude",
            "-33.8688",
            "--longitude",
            "151.2093",
            "--emergency-button",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:8080"));
        let Commands::Run { login, dashboard } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(login.email.as_deref(), Some("driver@example.com"));
        assert_eq!(dashboard.latitude, Some(-33.8688));
        assert_eq!(dashboard.longitude, Some(151.2093));
        assert!(dashboard.emergency_button);
    }

    #[test]
    fn test_latitude_requires_longitude() {
        let result = Cli::try_parse_from(["ambulance-tracker", "dashboard", "--latitude", "1.0"]);
        assert!(result.is_err());
    }
}
