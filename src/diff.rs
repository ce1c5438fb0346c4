//! Before/after comparison of two inventories.
//!
//! "New" packages are names that appear in the *available* set after the index
//! refresh but not before it. Packages that vanished from the index are not
//! reported, and installed sets play no part. "Outdated" packages are not
//! derived here at all: only the manager can compare versions, so they are
//! taken verbatim from its outdated query.

use crate::inventory::{Inventory, InventorySet};
use crate::manager::PackageManager;
use crate::package::{PackageCategory, PackageSet};
use crate::run_log::RunLog;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewPackages {
    pub formulae: PackageSet,
    pub casks: PackageSet,
}

/// Everything the report sections are built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub outdated_formulae: PackageSet,
    pub outdated_casks: PackageSet,
    pub new_formulae: PackageSet,
    pub new_casks: PackageSet,
}

impl DiffResult {
    pub fn new(outdated_formulae: PackageSet, outdated_casks: PackageSet, new: NewPackages) -> Self {
        Self {
            outdated_formulae,
            outdated_casks,
            new_formulae: new.formulae,
            new_casks: new.casks,
        }
    }

    pub fn outdated(&self, category: PackageCategory) -> &PackageSet {
        match category {
            PackageCategory::Formula => &self.outdated_formulae,
            PackageCategory::Cask => &self.outdated_casks,
        }
    }

    pub fn new_packages(&self, category: PackageCategory) -> &PackageSet {
        match category {
            PackageCategory::Formula => &self.new_formulae,
            PackageCategory::Cask => &self.new_casks,
        }
    }

    /// Number of actionable updates across both categories.
    pub fn outdated_count(&self) -> usize {
        self.outdated_formulae.len() + self.outdated_casks.len()
    }

    pub fn new_count(&self) -> usize {
        self.new_formulae.len() + self.new_casks.len()
    }
}

/// `after - before`, in `after`'s order. Not symmetric.
pub fn diff_category(before: &PackageSet, after: &PackageSet) -> PackageSet {
    after.difference(before)
}

/// New formulae and casks between two inventories.
///
/// A missing inventory yields empty results and a log entry. An incomplete
/// available set still diffs (possibly overstating what is new) but is logged
/// as degraded input.
pub fn diff_new(before: Option<&Inventory>, after: Option<&Inventory>, log: &RunLog) -> NewPackages {
    let (Some(before), Some(after)) = (before, after) else {
        let missing = if before.is_none() { "before" } else { "after" };
        log.record(
            "new package diff skipped",
            format!("{} inventory is missing", missing),
        );
        return NewPackages::default();
    };

    let mut new = NewPackages::default();
    for category in PackageCategory::ALL {
        let which = InventorySet::available(category);
        for (side, inventory) in [("before", before), ("after", after)] {
            if !inventory.is_complete(which) {
                log.record(
                    &format!("new {} may be overstated", category.plural()),
                    format!("{} is incomplete in the {} inventory", which, side),
                );
            }
        }

        let set = diff_category(before.available(category), after.available(category));
        tracing::debug!("{} new {}", set.len(), category.plural());
        match category {
            PackageCategory::Formula => new.formulae = set,
            PackageCategory::Cask => new.casks = set,
        }
    }
    new
}

/// Outdated formulae and casks as reported by the manager. A failed query
/// yields an empty set and a log entry.
pub async fn fetch_outdated<M: PackageManager>(manager: &M, log: &RunLog) -> (PackageSet, PackageSet) {
    let (formulae, casks) = tokio::join!(
        manager.list_outdated(PackageCategory::Formula),
        manager.list_outdated(PackageCategory::Cask),
    );

    let resolve = |category: PackageCategory, result: crate::error::Result<PackageSet>| {
        result.unwrap_or_else(|e| {
            log.record(&format!("outdated {} unavailable", category.plural()), e);
            PackageSet::new()
        })
    };

    let formulae = resolve(PackageCategory::Formula, formulae);
    let casks = resolve(PackageCategory::Cask, casks);
    (formulae, casks)
}
