//! Report sections: one enriched block per package.
//!
//! Each section looks up every package concurrently (bounded by `jobs`) but
//! prints them in the input order once all lookups are done, so the same input
//! always renders the same bytes.

use crate::metadata::{MetadataLookup, MetadataSource};
use crate::package::{PackageCategory, PackageRecord, PackageSet};
use crate::run_log::RunLog;
use colored::Colorize;
use futures::StreamExt;
use std::io::{self, Write};

pub const DEFAULT_JOBS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Outdated,
    New,
}

/// One of the four report sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub category: PackageCategory,
}

impl Section {
    /// Fixed report order.
    pub const ALL: [Section; 4] = [
        Section::outdated(PackageCategory::Formula),
        Section::outdated(PackageCategory::Cask),
        Section::new_packages(PackageCategory::Formula),
        Section::new_packages(PackageCategory::Cask),
    ];

    pub const fn outdated(category: PackageCategory) -> Self {
        Self {
            kind: SectionKind::Outdated,
            category,
        }
    }

    pub const fn new_packages(category: PackageCategory) -> Self {
        Self {
            kind: SectionKind::New,
            category,
        }
    }

    pub fn title(&self) -> String {
        match self.kind {
            SectionKind::Outdated => format!("Outdated {}", self.category.plural()),
            SectionKind::New => format!("New {}", self.category.plural()),
        }
    }

    pub fn empty_message(&self) -> String {
        match self.kind {
            SectionKind::Outdated => format!("No {} updates available.", self.category),
            SectionKind::New => format!("No new {} available.", self.category.plural()),
        }
    }
}

pub struct Reporter<'a, S> {
    lookup: &'a MetadataLookup<S>,
    log: &'a RunLog,
    jobs: usize,
}

impl<'a, S: MetadataSource> Reporter<'a, S> {
    pub fn new(lookup: &'a MetadataLookup<S>, log: &'a RunLog) -> Self {
        Self {
            lookup,
            log,
            jobs: DEFAULT_JOBS,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Print `section` for `names` and return the records in input order.
    ///
    /// An empty set prints a single status line and performs no lookups.
    pub async fn render<W: Write>(
        &self,
        out: &mut W,
        section: Section,
        names: &PackageSet,
    ) -> io::Result<Vec<PackageRecord>> {
        if names.is_empty() {
            writeln!(out, "{} {}", "✓".green(), section.empty_message())?;
            writeln!(out)?;
            return Ok(Vec::new());
        }

        let records: Vec<PackageRecord> = futures::stream::iter(names.iter())
            .map(|name| self.lookup.lookup(name, section.category, self.log))
            .buffered(self.jobs)
            .collect()
            .await;

        writeln!(
            out,
            "{} {}",
            format!("==> {}", section.title()).bold().green(),
            format!("({})", records.len()).dimmed()
        )?;
        for record in &records {
            write_record(out, record)?;
        }
        writeln!(out)?;

        Ok(records)
    }
}

/// Three-line block: name, homepage, description.
pub fn write_record<W: Write>(out: &mut W, record: &PackageRecord) -> io::Result<()> {
    writeln!(out, "{}", record.name.bold().cyan())?;
    writeln!(out, "  {} {}", "Homepage:".dimmed(), record.homepage)?;
    writeln!(out, "  {} {}", "Description:".dimmed(), record.description)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::package::DEFAULT_HOMEPAGE;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Counting {
        calls: AtomicUsize,
    }

    impl MetadataSource for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn query(&self, category: PackageCategory, name: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if name == "broken" {
                return Err(anyhow::anyhow!("lookup exploded").into());
            }
            Ok(format!(
                r#"{{"{}": [{{"homepage": "https://{}.example", "desc": "{} tool"}}]}}"#,
                category.json_key(),
                name,
                name
            ))
        }
    }

    fn counting() -> MetadataLookup<Counting> {
        MetadataLookup::new(Counting {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_section_order_and_messages() {
        let messages: Vec<_> = Section::ALL.iter().map(|s| s.empty_message()).collect();
        assert_eq!(
            messages,
            vec![
                "No formula updates available.",
                "No cask updates available.",
                "No new formulae available.",
                "No new casks available.",
            ]
        );
        assert_eq!(Section::ALL[2].title(), "New formulae");
    }

    #[tokio::test]
    async fn test_empty_section_skips_lookups() {
        let dir = TempDir::new().unwrap();
        let log = RunLog::create(dir.path()).unwrap().quiet();
        let lookup = counting();
        let reporter = Reporter::new(&lookup, &log);

        let mut out = Vec::new();
        let records = reporter
            .render(&mut out, Section::outdated(PackageCategory::Formula), &PackageSet::new())
            .await
            .unwrap();

        assert!(records.is_empty());
        assert_eq!(lookup.source().calls.load(Ordering::SeqCst), 0);
        let text = String::from_utf8(out).unwrap();
        let status_lines: Vec<_> = text.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(status_lines.len(), 1);
        assert!(status_lines[0].contains("No formula updates available."));
    }

    #[tokio::test]
    async fn test_records_follow_input_order() {
        let dir = TempDir::new().unwrap();
        let log = RunLog::create(dir.path()).unwrap().quiet();
        let lookup = counting();
        let reporter = Reporter::new(&lookup, &log).with_jobs(3);
        let names: PackageSet = ["zsh", "bat", "mpv", "git", "fd"].into_iter().collect();

        let mut out = Vec::new();
        let records = reporter
            .render(&mut out, Section::new_packages(PackageCategory::Cask), &names)
            .await
            .unwrap();

        let order: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, vec!["zsh", "bat", "mpv", "git", "fd"]);
        assert_eq!(records[1].homepage, "https://bat.example");
        assert_eq!(lookup.source().calls.load(Ordering::SeqCst), 5);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("mpv tool"));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_others() {
        let dir = TempDir::new().unwrap();
        let log = RunLog::create(dir.path()).unwrap().quiet();
        let lookup = counting();
        let reporter = Reporter::new(&lookup, &log);
        let names: PackageSet = ["jq", "broken", "wget"].into_iter().collect();

        let mut out = Vec::new();
        let records = reporter
            .render(&mut out, Section::outdated(PackageCategory::Formula), &names)
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].homepage, "https://jq.example");
        assert_eq!(records[1].homepage, DEFAULT_HOMEPAGE);
        assert_eq!(records[2].description, "wget tool");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_write_record_is_three_lines() {
        let mut out = Vec::new();
        write_record(
            &mut out,
            &PackageRecord {
                name: "ripgrep".into(),
                homepage: "https://github.com/BurntSushi/ripgrep".into(),
                description: "Search tool like grep and The Silver Searcher".into(),
            },
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
    }
}
