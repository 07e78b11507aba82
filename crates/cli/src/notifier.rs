use std::io::{self, BufRead, Write};

use studio::Notifier;

/// Alerts go to stderr; confirmations read a y/N answer from stdin unless
/// `--yes` was given.
pub struct TerminalNotifier {
    assume_yes: bool,
}

impl TerminalNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let mut stderr = io::stderr();
        let _ = write!(stderr, "{message} [y/N] ");
        let _ = stderr.flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
