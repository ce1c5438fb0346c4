//! End-to-end run: snapshot, refresh, snapshot, diff, report, confirm.
//!
//! # Flow
//!
//! 1. Check that the manager and the metadata source exist (fatal otherwise)
//! 2. Capture the *before* inventory
//! 3. Refresh the manager's index
//! 4. Capture the *after* inventory
//! 5. Ask the manager what is outdated
//! 6. Diff the available sets for new packages
//! 7. Render the four report sections in fixed order
//! 8. Confirm and hand the upgrade to the manager
//! 9. Keep the run log if anything went wrong, delete it otherwise
//!
//! Every step after (1) degrades instead of failing: a broken query leaves an
//! empty set and a run log entry behind, and the run carries on.
//!
//! Dropping the run future at any await point (e.g. on Ctrl-C) releases the
//! scoped staging directory and removes the run log if it is still empty.

use crate::config::Config;
use crate::diff::{self, DiffResult};
use crate::error::{Result, ScoutError};
use crate::gate::{self, UpgradeDecision};
use crate::inventory::{self, Inventory};
use crate::manager::PackageManager;
use crate::metadata::{MetadataLookup, MetadataSource};
use crate::package::PackageRecord;
use crate::report::{Reporter, Section, SectionKind};
use crate::run_log::RunLog;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// What a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub diff: DiffResult,
    pub sections: Vec<(Section, Vec<PackageRecord>)>,
    pub decision: UpgradeDecision,
    /// Set only when the run log recorded at least one error.
    pub log_path: Option<PathBuf>,
}

/// Where inventories are staged during a run.
enum Staging {
    /// Removed when dropped, on every exit path.
    Scoped(TempDir),
    Persistent(PathBuf),
}

impl Staging {
    fn new(config: &Config) -> std::io::Result<Self> {
        match &config.save_snapshots {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Ok(Staging::Persistent(dir.clone()))
            }
            None => {
                std::fs::create_dir_all(&config.staging_root)?;
                Ok(Staging::Scoped(
                    tempfile::Builder::new()
                        .prefix("brewscout-")
                        .tempdir_in(&config.staging_root)?,
                ))
            }
        }
    }

    fn dir(&self) -> &Path {
        match self {
            Staging::Scoped(dir) => dir.path(),
            Staging::Persistent(dir) => dir,
        }
    }

    fn stage(&self, name: &str, inventory: &Inventory, log: &RunLog) {
        let path = self.dir().join(format!("{}.json", name));
        match inventory.save(&path) {
            Ok(()) => tracing::debug!("staged {} inventory at {}", name, path.display()),
            Err(e) => log.record(&format!("staging {} inventory", name), e),
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub struct RunCoordinator<M, S> {
    manager: M,
    lookup: MetadataLookup<S>,
    config: Config,
}

impl<M: PackageManager, S: MetadataSource> RunCoordinator<M, S> {
    pub fn new(manager: M, metadata: S, config: Config) -> Self {
        let lookup = MetadataLookup::new(metadata).with_timeout(config.metadata_timeout);
        Self {
            manager,
            lookup,
            config,
        }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Fatal checks, done once before any other work.
    pub async fn check_preconditions(&self) -> Result<()> {
        if !self.manager.is_available().await {
            return Err(ScoutError::ManagerMissing(self.config.brew.display().to_string()));
        }
        self.check_metadata().await
    }

    async fn check_metadata(&self) -> Result<()> {
        if !self.lookup.source().is_available().await {
            return Err(ScoutError::MetadataToolMissing(
                self.lookup.source().name().to_string(),
            ));
        }
        Ok(())
    }

    /// Full run. `confirm` is only called if something is outdated.
    pub async fn run<W, F, Fut>(&self, out: &mut W, confirm: F) -> Result<RunOutcome>
    where
        W: Write,
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        self.check_preconditions().await?;

        let staging = Staging::new(&self.config)?;
        tracing::info!("staging inventories in {}", staging.dir().display());

        let progress = spinner("Capturing package inventory...");
        let log = RunLog::create(&self.config.log_dir)?.with_progress(progress.clone());
        let before = inventory::capture(&self.manager, &log).await;
        staging.stage("before", &before, &log);

        progress.set_message(format!("Refreshing {} index...", self.manager.name()));
        if let Err(e) = self.manager.refresh_index().await {
            log.record("index refresh", e);
        }

        progress.set_message("Capturing refreshed inventory...");
        let after = inventory::capture(&self.manager, &log).await;
        staging.stage("after", &after, &log);

        progress.set_message("Checking for outdated packages...");
        let (outdated_formulae, outdated_casks) = diff::fetch_outdated(&self.manager, &log).await;
        progress.finish_and_clear();

        let new = diff::diff_new(Some(&before), Some(&after), &log);
        let diff = DiffResult::new(outdated_formulae, outdated_casks, new);

        let sections = self.report(out, &diff, &Section::ALL, &log).await?;
        write_summary(out, &diff)?;

        let decision = gate::apply(&self.manager, out, diff.outdated_count(), confirm, &log).await?;

        let log_path = finish_log(out, log)?;
        drop(staging);

        Ok(RunOutcome {
            diff,
            sections,
            decision,
            log_path,
        })
    }

    /// Render `sections` from an already computed diff. No manager calls.
    pub async fn report<W: Write>(
        &self,
        out: &mut W,
        diff: &DiffResult,
        sections: &[Section],
        log: &RunLog,
    ) -> Result<Vec<(Section, Vec<PackageRecord>)>> {
        let reporter = Reporter::new(&self.lookup, log).with_jobs(self.config.jobs);
        let mut rendered = Vec::with_capacity(sections.len());
        for &section in sections {
            let names = match section.kind {
                SectionKind::Outdated => diff.outdated(section.category),
                SectionKind::New => diff.new_packages(section.category),
            };
            let records = reporter.render(out, section, names).await?;
            rendered.push((section, records));
        }
        Ok(rendered)
    }

    /// Diff two saved snapshots and report the new packages. Outdated sections
    /// are omitted since inventories cannot express version comparisons.
    pub async fn diff_snapshots<W: Write>(
        &self,
        out: &mut W,
        before: &Path,
        after: &Path,
    ) -> Result<RunOutcome> {
        self.check_metadata().await?;
        let log = RunLog::create(&self.config.log_dir)?;

        let load = |label: &str, path: &Path| match Inventory::load(path) {
            Ok(inventory) => Some(inventory),
            Err(e) => {
                log.record(&format!("loading {} snapshot {}", label, path.display()), e);
                None
            }
        };
        let before = load("before", before);
        let after = load("after", after);

        let new = diff::diff_new(before.as_ref(), after.as_ref(), &log);
        let diff = DiffResult {
            new_formulae: new.formulae,
            new_casks: new.casks,
            ..DiffResult::default()
        };

        let sections = self.report(out, &diff, &Section::ALL[2..], &log).await?;
        let log_path = finish_log(out, log)?;

        Ok(RunOutcome {
            diff,
            sections,
            decision: UpgradeDecision::NoneAvailable,
            log_path,
        })
    }
}

fn write_summary<W: Write>(out: &mut W, diff: &DiffResult) -> std::io::Result<()> {
    let outdated = diff.outdated_count();
    let marker = if outdated > 0 {
        "↑".yellow()
    } else {
        "✓".green()
    };
    writeln!(
        out,
        "{} {} updates available, {} new packages discovered",
        marker,
        outdated.to_string().bold(),
        diff.new_count().to_string().bold()
    )?;
    out.flush()
}

fn finish_log<W: Write>(out: &mut W, log: RunLog) -> Result<Option<PathBuf>> {
    let count = log.len();
    let path = log.finalize()?;
    if let Some(path) = &path {
        writeln!(
            out,
            "{} {} errors were logged to {}",
            "⚠".yellow(),
            count.to_string().bold(),
            path.display().to_string().cyan()
        )?;
    }
    Ok(path)
}
