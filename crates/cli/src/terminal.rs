//! Line-based terminal I/O.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;

/// Stdin lines delivered to async code.
///
/// A dedicated thread does the blocking reads, so a pending read never
/// holds up runtime shutdown.
#[derive(Debug)]
pub struct Terminal {
    lines: mpsc::UnboundedReceiver<String>,
}

impl Terminal {
    /// Start reading stdin in the background.
    pub fn spawn() -> Self {
        let (tx, lines) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self { lines }
    }

    /// Deliver `lines`, then behave as closed stdin.
    #[cfg(test)]
    pub fn scripted(lines: &[&str]) -> Self {
        let (tx, lines_rx) = mpsc::unbounded_channel();
        for line in lines {
            let _ = tx.send((*line).to_string());
        }
        Self { lines: lines_rx }
    }

    /// Next input line, or `None` once stdin is closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Print `label` without a newline and wait for the answer.
    pub async fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        let mut out = io::stdout().lock();
        write!(out, "{label}")?;
        out.flush()?;
        drop(out);

        Ok(self.next_line().await)
    }
}

/// Print `text` followed by a newline.
pub fn say(text: impl Display) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{text}")?;
    out.flush()
}
