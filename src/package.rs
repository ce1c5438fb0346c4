//! Package identifiers, categories and name sets.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Opaque package identifier. Unique within its category.
pub type PackageName = String;

pub const DEFAULT_HOMEPAGE: &str = "Unable to retrieve homepage";
pub const DEFAULT_DESCRIPTION: &str = "Unable to retrieve description";

/// Formulae and casks are independent namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageCategory {
    Formula,
    Cask,
}

impl PackageCategory {
    pub const ALL: [PackageCategory; 2] = [PackageCategory::Formula, PackageCategory::Cask];

    /// Flag understood by `brew list`, `brew outdated` and `brew info`.
    pub fn flag(self) -> &'static str {
        match self {
            PackageCategory::Formula => "--formula",
            PackageCategory::Cask => "--cask",
        }
    }

    /// Top-level key of a `brew info --json=v2` document.
    pub fn json_key(self) -> &'static str {
        match self {
            PackageCategory::Formula => "formulae",
            PackageCategory::Cask => "casks",
        }
    }

    pub fn plural(self) -> &'static str {
        self.json_key()
    }
}

impl fmt::Display for PackageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageCategory::Formula => f.write_str("formula"),
            PackageCategory::Cask => f.write_str("cask"),
        }
    }
}

/// Names in the manager's listing order, without duplicates.
///
/// Equality ignores order: two sets are equal when they hold the same names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PackageName>", into = "Vec<PackageName>")]
pub struct PackageSet {
    names: Vec<PackageName>,
    index: HashSet<PackageName>,
}

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse line-oriented command output, one name per line.
    pub fn from_listing(output: &str) -> Self {
        output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }

    /// Returns false if the name was already present.
    pub fn insert(&mut self, name: impl Into<PackageName>) -> bool {
        let name = name.into();
        if self.index.contains(&name) {
            return false;
        }
        self.index.insert(name.clone());
        self.names.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageName> {
        self.names.iter()
    }

    pub fn as_slice(&self) -> &[PackageName] {
        &self.names
    }

    /// Names in `self` that are absent from `other`, in `self`'s order.
    pub fn difference(&self, other: &PackageSet) -> PackageSet {
        self.names
            .iter()
            .filter(|name| !other.contains(name))
            .cloned()
            .collect()
    }
}

impl PartialEq for PackageSet {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for PackageSet {}

impl FromIterator<PackageName> for PackageSet {
    fn from_iter<I: IntoIterator<Item = PackageName>>(iter: I) -> Self {
        let mut set = PackageSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

impl<'a> FromIterator<&'a str> for PackageSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(String::from).collect()
    }
}

impl From<Vec<PackageName>> for PackageSet {
    fn from(names: Vec<PackageName>) -> Self {
        names.into_iter().collect()
    }
}

impl From<PackageSet> for Vec<PackageName> {
    fn from(set: PackageSet) -> Self {
        set.names
    }
}

impl<'a> IntoIterator for &'a PackageSet {
    type Item = &'a PackageName;
    type IntoIter = std::slice::Iter<'a, PackageName>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

/// One enriched entry of a report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: PackageName,
    pub homepage: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_listing_skips_blank_lines_and_duplicates() {
        let set = PackageSet::from_listing("wget\n\n  jq  \nwget\ngh\n");
        assert_eq!(set.as_slice(), &["wget", "jq", "gh"]);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a: PackageSet = ["a", "b", "c"].into_iter().collect();
        let b: PackageSet = ["c", "a", "b"].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_difference_keeps_left_order() {
        let after: PackageSet = ["zsh", "a", "m", "b"].into_iter().collect();
        let before: PackageSet = ["a", "b"].into_iter().collect();
        assert_eq!(after.difference(&before).as_slice(), &["zsh", "m"]);
    }

    #[test]
    fn test_serde_round_trip_deduplicates() {
        let set: PackageSet = serde_json::from_str(r#"["git","git","node"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["git","node"]"#);
    }

    #[test]
    fn test_category_flags() {
        assert_eq!(PackageCategory::Formula.flag(), "--formula");
        assert_eq!(PackageCategory::Cask.json_key(), "casks");
        assert_eq!(PackageCategory::Cask.to_string(), "cask");
    }
}
