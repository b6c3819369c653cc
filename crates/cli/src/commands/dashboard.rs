//! Tracking dashboard.
//!
//! Reads commands from stdin until `quit`, end of input, or Ctrl-C, and
//! prints the status whenever polling changes it.

use std::path::PathBuf;
use std::time::Duration;

use ambulance_tracker_client::config::{LocationSource, TrackerConfig};
use ambulance_tracker_client::dashboard::{Dashboard, DashboardOptions};
use ambulance_tracker_client::tracking::{ReportStopCheck, TrackingLoop, TrackingOptions};
use ambulance_tracker_core::Coordinates;
use clap::Args;
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::{CliError, session_gate};
use crate::terminal::{Terminal, say};

/// How often the terminal checks for polled status changes.
const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Args)]
pub struct DashboardArgs {
    /// Show the emergency action
    #[arg(long)]
    pub emergency_button: bool,

    /// Fixed latitude (requires --longitude)
    #[arg(long, requires = "longitude", allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    /// Fixed longitude (requires --latitude)
    #[arg(long, requires = "latitude", allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// JSON position file, re-read on every request
    #[arg(long, conflicts_with = "latitude")]
    pub location_file: Option<PathBuf>,

    /// Halt reporting as soon as polling sees OFF
    #[arg(long)]
    pub live_stop_check: bool,
}

impl DashboardArgs {
    fn location(&self, configured: &LocationSource) -> LocationSource {
        if let Some(path) = &self.location_file {
            return LocationSource::File(path.clone());
        }
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => LocationSource::Fixed(Coordinates::new(lat, lon)),
            _ => configured.clone(),
        }
    }

    fn tracking_options(&self, config: &TrackerConfig) -> TrackingOptions {
        let mut options = config.tracking_options();
        if self.live_stop_check {
            options.stop_check = ReportStopCheck::Live;
        }
        options
    }

    fn dashboard_options(&self, config: &TrackerConfig) -> DashboardOptions {
        DashboardOptions {
            show_emergency_button: self.emergency_button || config.show_emergency_button,
        }
    }
}

/// Run the dashboard until the driver leaves.
pub async fn run(
    config: &TrackerConfig,
    args: &DashboardArgs,
    terminal: &mut Terminal,
) -> Result<(), CliError> {
    let (gate, api) = session_gate(config)?;
    if gate.current_token()?.is_none() {
        return Err(CliError::NotLoggedIn);
    }

    let dashboard = Dashboard::new(args.dashboard_options(config));
    let tracking = TrackingLoop::start(
        api,
        args.location(&config.location).geolocator(),
        args.tracking_options(config),
    );

    say(dashboard.render(&tracking.state().snapshot()))?;

    let mut shown = tracking.state().status();
    let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Created once so a signal arriving while a command runs is not lost.
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = terminal.next_line() => {
                let Some(line) = line else { break };

                let Some(command) = dashboard.parse_command(&line) else {
                    say(format_args!("Unknown command: {}", line.trim()))?;
                    say(dashboard.help())?;
                    continue;
                };

                let response = dashboard.handle(&tracking, command).await;
                if let Some(message) = response.message {
                    say(message)?;
                }
                shown = tracking.state().status();
                if response.quit {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = refresh.tick() => {
                let status = tracking.state().status();
                if status != shown {
                    say(format_args!("Status: {status}"))?;
                    shown = status;
                }
            }
        }
    }

    tracking.shutdown();
    Ok(())
}
