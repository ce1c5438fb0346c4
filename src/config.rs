//! Run configuration, resolved once from CLI flags and environment variables.

use crate::api::BrewApi;
use crate::error::{Result, ScoutError};
use crate::gate::Confirmation;
use crate::manager::{Brew, DEFAULT_COMMAND_TIMEOUT};
use crate::metadata::{DEFAULT_METADATA_TIMEOUT, Metadata};
use crate::report::DEFAULT_JOBS;
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// Where package homepages and descriptions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MetadataBackend {
    /// `brew info --json=v2`
    #[default]
    Local,
    /// formulae.brew.sh JSON API
    Api,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Package manager binary.
    pub brew: PathBuf,
    pub metadata: MetadataBackend,
    /// Directory the run log is written to.
    pub log_dir: PathBuf,
    /// Concurrent metadata lookups per report section.
    pub jobs: usize,
    pub command_timeout: Duration,
    pub metadata_timeout: Duration,
    pub confirmation: Confirmation,
    /// Parent of the scoped staging directory.
    pub staging_root: PathBuf,
    /// Persist before/after inventories here instead of a scoped temp dir.
    pub save_snapshots: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            brew: PathBuf::from("brew"),
            metadata: MetadataBackend::default(),
            log_dir: std::env::temp_dir(),
            jobs: DEFAULT_JOBS,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            confirmation: Confirmation::default(),
            staging_root: std::env::temp_dir(),
            save_snapshots: None,
        }
    }
}

impl Config {
    pub fn manager(&self) -> Brew {
        Brew::new(&self.brew).with_timeout(self.command_timeout)
    }

    /// Build the configured metadata backend. The local backend shares
    /// `manager`. An API client that cannot be constructed counts as a missing
    /// metadata tool.
    pub fn metadata_source(&self, manager: &Brew) -> Result<Metadata> {
        match self.metadata {
            MetadataBackend::Local => Ok(Metadata::Local(manager.clone())),
            MetadataBackend::Api => BrewApi::new()
                .map(Metadata::Remote)
                .map_err(|e| ScoutError::MetadataToolMissing(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.brew, PathBuf::from("brew"));
        assert_eq!(config.metadata, MetadataBackend::Local);
        assert_eq!(config.jobs, DEFAULT_JOBS);
        assert_eq!(config.confirmation, Confirmation::Prompt);
        assert!(config.save_snapshots.is_none());
    }

    #[test]
    fn test_local_metadata_uses_configured_brew() {
        let config = Config {
            brew: PathBuf::from("/opt/homebrew/bin/brew"),
            ..Config::default()
        };
        match config.metadata_source(&config.manager()).unwrap() {
            Metadata::Local(brew) => {
                assert_eq!(brew.binary(), std::path::Path::new("/opt/homebrew/bin/brew"))
            }
            Metadata::Remote(_) => panic!("expected local metadata"),
        }
    }
}
