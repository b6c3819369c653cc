//! Dashboard view model.
//!
//! One configurable dashboard: status, last known position, and the
//! sharing actions. The emergency action is optional and purely local: it
//! raises a notice and a log line, nothing is sent to the server.

use std::fmt::Write as _;

use tracing::warn;

use crate::tracking::{StartOutcome, StopOutcome, TrackingLoop, TrackingSnapshot};

/// Dashboard heading.
pub const TITLE: &str = "Ambulance Driver Dashboard";

/// Shown when the emergency action is used.
pub const EMERGENCY_NOTICE: &str = "Emergency alert raised. Contact dispatch directly.";

/// Presentation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardOptions {
    /// Offer the emergency action.
    pub show_emergency_button: bool,
}

/// Something the driver can do from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardCommand {
    /// Send Location: start sharing.
    StartSharing,
    /// Stop Location: stop sharing.
    StopSharing,
    /// Re-render the dashboard.
    Status,
    /// Raise the emergency notice.
    Emergency,
    /// List commands.
    Help,
    /// Leave the dashboard.
    Quit,
}

/// Result of handling a command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardResponse {
    /// Text to show the driver.
    pub message: Option<String>,
    /// The driver asked to leave.
    pub quit: bool,
}

impl DashboardResponse {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            quit: false,
        }
    }
}

/// The tracking view.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dashboard {
    options: DashboardOptions,
}

impl Dashboard {
    #[must_use]
    pub const fn new(options: DashboardOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub const fn options(&self) -> DashboardOptions {
        self.options
    }

    /// Actions offered, as `(label, command)` pairs.
    #[must_use]
    pub fn actions(&self) -> Vec<(&'static str, &'static str)> {
        let mut actions = vec![("Send Location", "start"), ("Stop Location", "stop")];
        if self.options.show_emergency_button {
            actions.push(("Emergency Alert", "emergency"));
        }
        actions
    }

    /// Full dashboard text.
    #[must_use]
    pub fn render(&self, snapshot: &TrackingSnapshot) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{TITLE}");
        let _ = writeln!(out, "Status: {}", snapshot.status);
        if let Some(coords) = snapshot.last_location {
            let _ = writeln!(out, "Location: {coords}");
        }
        out.push_str(&self.help());
        out
    }

    /// One line per available command.
    #[must_use]
    pub fn help(&self) -> String {
        let mut out = String::new();
        for (label, command) in self.actions() {
            let _ = writeln!(out, "  [{command}] {label}");
        }
        let _ = writeln!(out, "  [status] Refresh  [help] Commands  [quit] Exit");
        out
    }

    /// Parse a typed command. Disabled actions are rejected like unknown ones.
    #[must_use]
    pub fn parse_command(&self, input: &str) -> Option<DashboardCommand> {
        let command = match input.trim().to_ascii_lowercase().as_str() {
            "start" | "send" => DashboardCommand::StartSharing,
            "stop" => DashboardCommand::StopSharing,
            "status" | "" => DashboardCommand::Status,
            "emergency" | "sos" if self.options.show_emergency_button => {
                DashboardCommand::Emergency
            }
            "help" | "?" => DashboardCommand::Help,
            "quit" | "exit" | "q" => DashboardCommand::Quit,
            _ => return None,
        };
        Some(command)
    }

    /// Run a command against the tracking session.
    ///
    /// Failures the driver should not see (network errors) produce no
    /// message; they are already logged by the tracking loop.
    pub async fn handle(
        &self,
        tracking: &TrackingLoop,
        command: DashboardCommand,
    ) -> DashboardResponse {
        match command {
            DashboardCommand::StartSharing => {
                let outcome = tracking.start_sharing().await;
                match outcome {
                    StartOutcome::Sharing => DashboardResponse::message(format!(
                        "Status: {}",
                        tracking.state().status()
                    )),
                    _ => outcome
                        .user_message()
                        .map(DashboardResponse::message)
                        .unwrap_or_default(),
                }
            }
            DashboardCommand::StopSharing => match tracking.stop_sharing().await {
                StopOutcome::Stopped => DashboardResponse::message(format!(
                    "Status: {}",
                    tracking.state().status()
                )),
                StopOutcome::NotAcknowledged => DashboardResponse::default(),
            },
            DashboardCommand::Status => {
                DashboardResponse::message(self.render(&tracking.state().snapshot()))
            }
            DashboardCommand::Emergency => {
                warn!("Emergency alert raised from dashboard");
                DashboardResponse::message(EMERGENCY_NOTICE)
            }
            DashboardCommand::Help => DashboardResponse::message(self.help()),
            DashboardCommand::Quit => DashboardResponse {
                message: None,
                quit: true,
            },
        }
    }
}
