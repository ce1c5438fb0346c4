//! Library interface for brewscout
//!
//! Snapshots installed and available Homebrew packages, refreshes the index,
//! reports what became outdated or newly available, and asks before upgrading.

pub mod api;
pub mod colors;
pub mod config;
pub mod coordinator;
pub mod diff;
pub mod error;
pub mod gate;
pub mod inventory;
pub mod manager;
pub mod metadata;
pub mod package;
pub mod report;
pub mod run_log;

// Re-export commonly used types
pub use config::{Config, MetadataBackend};
pub use coordinator::{RunCoordinator, RunOutcome};
pub use diff::{DiffResult, NewPackages, diff_new};
pub use error::{Result, ScoutError};
pub use gate::{Confirmation, UpgradeDecision};
pub use inventory::{Inventory, InventorySet};
pub use manager::{Brew, PackageManager};
pub use metadata::{Metadata, MetadataLookup, MetadataSource};
pub use package::{PackageCategory, PackageName, PackageRecord, PackageSet};
pub use run_log::RunLog;
