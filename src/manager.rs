//! Package manager capability and its Homebrew command-line implementation.
//!
//! The rest of the crate only talks to [`PackageManager`]; every call returns a
//! typed [`Result`] so callers decide what a failure means instead of relying on
//! process exit codes.

use crate::error::{Result, ScoutError};
use crate::package::{PackageCategory, PackageSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Operations the run needs from a system package manager.
#[allow(async_fn_in_trait)]
pub trait PackageManager {
    /// Human-readable name used in log entries.
    fn name(&self) -> &str;

    /// Whether the manager can be invoked at all.
    async fn is_available(&self) -> bool;

    async fn list_installed(&self, category: PackageCategory) -> Result<PackageSet>;

    async fn list_available(&self, category: PackageCategory) -> Result<PackageSet>;

    /// Installed packages the manager considers upgradable.
    async fn list_outdated(&self, category: PackageCategory) -> Result<PackageSet>;

    async fn refresh_index(&self) -> Result<()>;

    async fn perform_upgrade(&self) -> Result<()>;
}

/// `brew` invoked as a subprocess.
///
/// Clones share the result of the availability probe, so the manager and the
/// local metadata source only run `brew --version` once between them.
#[derive(Debug, Clone)]
pub struct Brew {
    binary: PathBuf,
    timeout: Duration,
    available: Arc<OnceCell<bool>>,
}

impl Brew {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            available: Arc::new(OnceCell::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .env("HOMEBREW_NO_AUTO_UPDATE", "1")
            .env("HOMEBREW_NO_ENV_HINTS", "1")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut parts = vec![self.binary.display().to_string()];
        parts.extend(args.iter().map(|a| a.to_string()));
        parts.join(" ")
    }

    /// Run `brew <args>` and return its stdout.
    pub(crate) async fn run(&self, args: &[&str]) -> Result<String> {
        let described = self.describe(args);
        tracing::debug!("running {}", described);

        let output = tokio::time::timeout(self.timeout, self.command(args).output())
            .await
            .map_err(|_| ScoutError::Timeout {
                command: described.clone(),
                timeout: self.timeout,
            })??;

        if !output.status.success() {
            return Err(ScoutError::CommandFailed {
                command: described,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for Brew {
    fn default() -> Self {
        Self::new("brew")
    }
}

impl PackageManager for Brew {
    fn name(&self) -> &str {
        "brew"
    }

    async fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| async {
                let probe = self.command(["--version"]).output();
                match tokio::time::timeout(self.timeout, probe).await {
                    Ok(Ok(output)) => output.status.success(),
                    Ok(Err(e)) => {
                        tracing::debug!("{} --version failed: {}", self.binary.display(), e);
                        false
                    }
                    Err(_) => false,
                }
            })
            .await
    }

    async fn list_installed(&self, category: PackageCategory) -> Result<PackageSet> {
        let stdout = self.run(&["list", category.flag(), "-1"]).await?;
        Ok(PackageSet::from_listing(&stdout))
    }

    async fn list_available(&self, category: PackageCategory) -> Result<PackageSet> {
        // `brew formulae` / `brew casks` list every known name
        let stdout = self.run(&[category.plural()]).await?;
        Ok(PackageSet::from_listing(&stdout))
    }

    async fn list_outdated(&self, category: PackageCategory) -> Result<PackageSet> {
        let stdout = self
            .run(&["outdated", category.flag(), "--quiet"])
            .await?;
        Ok(PackageSet::from_listing(&stdout))
    }

    async fn refresh_index(&self) -> Result<()> {
        let described = self.describe(&["update"]);
        let mut cmd = Command::new(&self.binary);
        cmd.arg("update").stdin(Stdio::null()).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ScoutError::Timeout {
                command: described.clone(),
                timeout: self.timeout,
            })??;

        if !output.status.success() {
            return Err(ScoutError::CommandFailed {
                command: described,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        tracing::debug!("{}", String::from_utf8_lossy(&output.stdout).trim());
        Ok(())
    }

    async fn perform_upgrade(&self) -> Result<()> {
        // Interactive: the operator watches brew's own output
        let status = self
            .command(["upgrade"])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(ScoutError::CommandFailed {
                command: self.describe(&["upgrade"]),
                status: status.to_string(),
                stderr: String::new(),
            })
        }
    }
}
