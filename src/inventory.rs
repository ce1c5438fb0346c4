//! Point-in-time inventories of installed and available packages.

use crate::error::Result;
use crate::manager::PackageManager;
use crate::package::{PackageCategory, PackageSet};
use crate::run_log::RunLog;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The four sets an [`Inventory`] is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventorySet {
    InstalledFormulae,
    InstalledCasks,
    AvailableFormulae,
    AvailableCasks,
}

impl InventorySet {
    pub const ALL: [InventorySet; 4] = [
        InventorySet::InstalledFormulae,
        InventorySet::InstalledCasks,
        InventorySet::AvailableFormulae,
        InventorySet::AvailableCasks,
    ];

    pub fn available(category: PackageCategory) -> Self {
        match category {
            PackageCategory::Formula => InventorySet::AvailableFormulae,
            PackageCategory::Cask => InventorySet::AvailableCasks,
        }
    }

    pub fn installed(category: PackageCategory) -> Self {
        match category {
            PackageCategory::Formula => InventorySet::InstalledFormulae,
            PackageCategory::Cask => InventorySet::InstalledCasks,
        }
    }
}

impl fmt::Display for InventorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InventorySet::InstalledFormulae => "installed formulae",
            InventorySet::InstalledCasks => "installed casks",
            InventorySet::AvailableFormulae => "available formulae",
            InventorySet::AvailableCasks => "available casks",
        };
        f.write_str(label)
    }
}

/// Snapshot of the four package sets. Immutable once captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub captured_at: DateTime<Local>,
    pub installed_formulae: PackageSet,
    pub installed_casks: PackageSet,
    pub available_formulae: PackageSet,
    pub available_casks: PackageSet,
    /// Sets whose query failed and were recorded as empty.
    #[serde(default)]
    pub incomplete: Vec<InventorySet>,
}

impl Inventory {
    pub fn empty() -> Self {
        Self {
            captured_at: Local::now(),
            installed_formulae: PackageSet::new(),
            installed_casks: PackageSet::new(),
            available_formulae: PackageSet::new(),
            available_casks: PackageSet::new(),
            incomplete: Vec::new(),
        }
    }

    /// Inventory with only the available sets filled in.
    pub fn with_available(formulae: PackageSet, casks: PackageSet) -> Self {
        Self {
            available_formulae: formulae,
            available_casks: casks,
            ..Self::empty()
        }
    }

    pub fn set(&self, which: InventorySet) -> &PackageSet {
        match which {
            InventorySet::InstalledFormulae => &self.installed_formulae,
            InventorySet::InstalledCasks => &self.installed_casks,
            InventorySet::AvailableFormulae => &self.available_formulae,
            InventorySet::AvailableCasks => &self.available_casks,
        }
    }

    fn set_mut(&mut self, which: InventorySet) -> &mut PackageSet {
        match which {
            InventorySet::InstalledFormulae => &mut self.installed_formulae,
            InventorySet::InstalledCasks => &mut self.installed_casks,
            InventorySet::AvailableFormulae => &mut self.available_formulae,
            InventorySet::AvailableCasks => &mut self.available_casks,
        }
    }

    pub fn available(&self, category: PackageCategory) -> &PackageSet {
        self.set(InventorySet::available(category))
    }

    pub fn installed(&self, category: PackageCategory) -> &PackageSet {
        self.set(InventorySet::installed(category))
    }

    pub fn is_complete(&self, which: InventorySet) -> bool {
        !self.incomplete.contains(&which)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Query all four sets concurrently. A failed query leaves its set empty,
/// marks it incomplete and appends to `log`.
pub async fn capture<M: PackageManager>(manager: &M, log: &RunLog) -> Inventory {
    let (installed_formulae, installed_casks, available_formulae, available_casks) = tokio::join!(
        manager.list_installed(PackageCategory::Formula),
        manager.list_installed(PackageCategory::Cask),
        manager.list_available(PackageCategory::Formula),
        manager.list_available(PackageCategory::Cask),
    );

    let mut inventory = Inventory::empty();
    let results = [
        (InventorySet::InstalledFormulae, installed_formulae),
        (InventorySet::InstalledCasks, installed_casks),
        (InventorySet::AvailableFormulae, available_formulae),
        (InventorySet::AvailableCasks, available_casks),
    ];

    for (which, result) in results {
        match result {
            Ok(set) => {
                tracing::debug!("{}: {} packages", which, set.len());
                *inventory.set_mut(which) = set;
            }
            Err(e) => {
                log.record(&format!("{} incomplete", which), e);
                inventory.incomplete.push(which);
            }
        }
    }

    inventory
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_accessors_by_category() {
        let inv = Inventory::with_available(
            ["wget", "jq"].into_iter().collect(),
            ["firefox"].into_iter().collect(),
        );
        assert_eq!(inv.available(PackageCategory::Formula).len(), 2);
        assert!(inv.available(PackageCategory::Cask).contains("firefox"));
        assert!(inv.installed(PackageCategory::Formula).is_empty());
        assert!(inv.is_complete(InventorySet::AvailableCasks));
    }

    #[test]
    fn test_save_and_load_preserve_sets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/before.json");

        let mut inv = Inventory::with_available(
            ["b", "a"].into_iter().collect(),
            PackageSet::new(),
        );
        inv.incomplete.push(InventorySet::AvailableCasks);
        inv.save(&path).unwrap();

        let loaded = Inventory::load(&path).unwrap();
        assert_eq!(loaded.available_formulae.as_slice(), &["b", "a"]);
        assert_eq!(loaded.incomplete, vec![InventorySet::AvailableCasks]);
        assert_eq!(loaded.captured_at, inv.captured_at);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Inventory::load(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_set_labels() {
        assert_eq!(
            InventorySet::available(PackageCategory::Cask).to_string(),
            "available casks"
        );
        assert_eq!(
            InventorySet::installed(PackageCategory::Formula).to_string(),
            "installed formulae"
        );
    }
}
