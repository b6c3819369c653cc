//! Login view.
//!
//! Email and password come from flags, `TRACKER_EMAIL` / `TRACKER_PASSWORD`,
//! or interactive prompts. A rejected interactive login is shown inline and
//! prompted again; a rejected non-interactive login fails the command.

use ambulance_tracker_client::config::TrackerConfig;
use ambulance_tracker_client::session::LoginOutcome;
use clap::Args;
use secrecy::SecretString;

use super::{CliError, session_gate};
use crate::terminal::{Terminal, say};

#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// Driver email address
    #[arg(short, long, env = "TRACKER_EMAIL")]
    pub email: Option<String>,

    /// Driver password
    #[arg(short, long, env = "TRACKER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl LoginArgs {
    fn is_interactive(&self) -> bool {
        self.email.is_none() || self.password.is_none()
    }
}

/// Log in and persist the session token.
pub async fn run(
    config: &TrackerConfig,
    args: &LoginArgs,
    terminal: &mut Terminal,
) -> Result<(), CliError> {
    let (gate, _) = session_gate(config)?;

    loop {
        let email = match &args.email {
            Some(email) => email.clone(),
            None => ask(terminal, "Email: ", "the email").await?,
        };
        let password = match &args.password {
            Some(password) => password.clone(),
            None => ask(terminal, "Password: ", "the password").await?,
        };

        match gate.submit(&email, SecretString::from(password)).await {
            LoginOutcome::Authenticated => {
                say(format_args!("Logged in as {}", email.trim()))?;
                return Ok(());
            }
            LoginOutcome::Rejected { message } => {
                say(&message)?;
                if !args.is_interactive() {
                    return Err(CliError::LoginRejected(message));
                }
            }
        }
    }
}

async fn ask(
    terminal: &mut Terminal,
    label: &str,
    what: &'static str,
) -> Result<String, CliError> {
    terminal
        .prompt(label)
        .await?
        .ok_or(CliError::InputClosed(what))
}
