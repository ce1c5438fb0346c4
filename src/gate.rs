//! Operator confirmation before handing the upgrade to the package manager.

use crate::manager::PackageManager;
use crate::run_log::RunLog;
use colored::Colorize;
use std::io::{self, BufRead, Write};

pub const PROMPT: &str = "Proceed with upgrade? y/n ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeDecision {
    /// Confirmed; the upgrade was handed to the manager.
    Upgraded,
    /// Declined.
    Skipped,
    /// Nothing to upgrade, no prompt issued.
    NoneAvailable,
}

/// How the confirmation is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Confirmation {
    #[default]
    Prompt,
    AssumeYes,
    AssumeNo,
}

impl Confirmation {
    /// The terminal read runs on the blocking pool so the caller stays
    /// cancellable while the operator thinks.
    pub async fn confirm(self) -> bool {
        match self {
            Confirmation::AssumeYes => true,
            Confirmation::AssumeNo => false,
            Confirmation::Prompt => tokio::task::spawn_blocking(|| {
                let stdin = io::stdin();
                let mut stdout = io::stdout();
                prompt(&mut stdin.lock(), &mut stdout)
            })
            .await
            .unwrap_or(false),
        }
    }
}

/// Only a lone `y` or `Y` counts as yes.
pub fn is_affirmative(response: &str) -> bool {
    response.trim_end_matches(['\r', '\n']).eq_ignore_ascii_case("y")
}

/// Ask once; no re-prompt on anything unexpected. Read errors count as no.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> bool {
    if write!(output, "{}", PROMPT.bold()).and_then(|_| output.flush()).is_err() {
        return false;
    }

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(_) => is_affirmative(&line),
        Err(e) => {
            tracing::debug!("failed to read confirmation: {}", e);
            false
        }
    }
}

/// `confirm` is only called when there is something to upgrade.
pub fn decide(outdated_count: usize, confirm: impl FnOnce() -> bool) -> UpgradeDecision {
    if outdated_count == 0 {
        return UpgradeDecision::NoneAvailable;
    }
    if confirm() {
        UpgradeDecision::Upgraded
    } else {
        UpgradeDecision::Skipped
    }
}

/// Decide and, when confirmed, run the manager's upgrade once. Its failure is
/// logged but does not change the decision.
pub async fn apply<M, W, F, Fut>(
    manager: &M,
    out: &mut W,
    outdated_count: usize,
    confirm: F,
    log: &RunLog,
) -> io::Result<UpgradeDecision>
where
    M: PackageManager,
    W: Write,
    F: FnOnce() -> Fut,
    Fut: Future<Output = bool>,
{
    let confirmed = outdated_count > 0 && confirm().await;
    let decision = decide(outdated_count, || confirmed);
    match decision {
        UpgradeDecision::Upgraded => {
            writeln!(out, "Upgrading {} packages...", outdated_count.to_string().bold())?;
            out.flush()?;
            if let Err(e) = manager.perform_upgrade().await {
                log.record("upgrade", e);
            }
        }
        UpgradeDecision::Skipped => {
            writeln!(out, "{} Upgrade skipped", "ℹ".blue())?;
        }
        UpgradeDecision::NoneAvailable => {}
    }
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_zero_outdated_never_prompts() {
        let decision = decide(0, || panic!("confirm must not be called"));
        assert_eq!(decision, UpgradeDecision::NoneAvailable);
    }

    #[test]
    fn test_confirmation_outcomes() {
        assert_eq!(decide(3, || true), UpgradeDecision::Upgraded);
        assert_eq!(decide(1, || false), UpgradeDecision::Skipped);
    }

    #[test]
    fn test_affirmative_responses() {
        for yes in ["y", "Y", "y\n", "Y\r\n"] {
            assert!(is_affirmative(yes), "{yes:?}");
        }
        for no in ["", "\n", "n", "yes", "yy", " y", "N\n", "q"] {
            assert!(!is_affirmative(no), "{no:?}");
        }
    }

    #[test]
    fn test_prompt_reads_one_line() {
        let mut input = Cursor::new("y\nn\n");
        let mut output = Vec::new();
        assert!(prompt(&mut input, &mut output));
        assert!(String::from_utf8(output).unwrap().contains("Proceed with upgrade? y/n"));
    }

    #[test]
    fn test_prompt_eof_is_no() {
        let mut input = Cursor::new("");
        assert!(!prompt(&mut input, &mut Vec::new()));
    }

    #[tokio::test]
    async fn test_assumed_confirmations() {
        assert!(Confirmation::AssumeYes.confirm().await);
        assert!(!Confirmation::AssumeNo.confirm().await);
    }
}
