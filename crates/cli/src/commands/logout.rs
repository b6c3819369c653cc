//! Forget the stored session.

use ambulance_tracker_client::config::TrackerConfig;

use super::{CliError, session_gate};
use crate::terminal::say;

/// Remove the session token, if any.
pub fn run(config: &TrackerConfig) -> Result<(), CliError> {
    let (gate, _) = session_gate(config)?;

    if gate.logout()? {
        say("Logged out")?;
    } else {
        say("No stored session")?;
    }
    Ok(())
}
