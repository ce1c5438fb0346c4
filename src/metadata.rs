//! Homepage and description lookup for a single package.
//!
//! A lookup never fails: when the query errors out, times out or returns
//! something unusable, the record carries [`DEFAULT_HOMEPAGE`] /
//! [`DEFAULT_DESCRIPTION`] instead.

use crate::api::BrewApi;
use crate::error::{Result, ScoutError};
use crate::manager::{Brew, PackageManager};
use crate::package::{
    DEFAULT_DESCRIPTION, DEFAULT_HOMEPAGE, PackageCategory, PackageName, PackageRecord,
};
use crate::run_log::RunLog;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Stand-in document used when the query itself failed.
const ERROR_DOCUMENT: &str = r#"{"error":"metadata query failed"}"#;

/// Anything that can answer "what is this package?" with a `brew info --json=v2`
/// shaped document.
#[allow(async_fn_in_trait)]
pub trait MetadataSource {
    fn name(&self) -> &str;

    async fn is_available(&self) -> bool;

    async fn query(&self, category: PackageCategory, name: &str) -> Result<String>;
}

impl MetadataSource for Brew {
    fn name(&self) -> &str {
        "brew info"
    }

    async fn is_available(&self) -> bool {
        PackageManager::is_available(self).await
    }

    async fn query(&self, category: PackageCategory, name: &str) -> Result<String> {
        self.run(&["info", "--json=v2", category.flag(), name]).await
    }
}

impl MetadataSource for BrewApi {
    fn name(&self) -> &str {
        "formulae.brew.sh"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn query(&self, category: PackageCategory, name: &str) -> Result<String> {
        let value = self.fetch(category, name).await?;
        Ok(BrewApi::as_info_document(category, value).to_string())
    }
}

/// Metadata backend chosen at startup.
#[derive(Clone)]
pub enum Metadata {
    Local(Brew),
    Remote(BrewApi),
}

impl MetadataSource for Metadata {
    fn name(&self) -> &str {
        match self {
            Metadata::Local(brew) => MetadataSource::name(brew),
            Metadata::Remote(api) => api.name(),
        }
    }

    async fn is_available(&self) -> bool {
        match self {
            Metadata::Local(brew) => MetadataSource::is_available(brew).await,
            Metadata::Remote(api) => api.is_available().await,
        }
    }

    async fn query(&self, category: PackageCategory, name: &str) -> Result<String> {
        match self {
            Metadata::Local(brew) => brew.query(category, name).await,
            Metadata::Remote(api) => api.query(category, name).await,
        }
    }
}

/// Pull `field` out of the first entry under the category key, falling back to
/// `default` when the document is unparsable or the value is absent, null or blank.
pub fn extract_field(raw: &str, category: PackageCategory, field: &str, default: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();

    let Ok(doc) = serde_json::from_str::<Value>(&cleaned) else {
        return default.to_string();
    };

    let pointer = format!("/{}/0/{}", category.json_key(), field);
    match doc.pointer(&pointer).and_then(Value::as_str).map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

/// Turns package names into [`PackageRecord`]s.
pub struct MetadataLookup<S> {
    source: S,
    timeout: Duration,
}

impl<S: MetadataSource> MetadataLookup<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            timeout: DEFAULT_METADATA_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Look up one package. A failed query is recorded in `log` and replaced by
    /// an error document; missing fields are not logged.
    pub async fn lookup(
        &self,
        name: &PackageName,
        category: PackageCategory,
        log: &RunLog,
    ) -> PackageRecord {
        let raw = match self.query(name, category).await {
            Ok(raw) => raw,
            Err(e) => {
                log.record(&format!("metadata for {} {}", category, name), &e);
                ERROR_DOCUMENT.to_string()
            }
        };

        PackageRecord {
            name: name.clone(),
            homepage: extract_field(&raw, category, "homepage", DEFAULT_HOMEPAGE),
            description: extract_field(&raw, category, "desc", DEFAULT_DESCRIPTION),
        }
    }

    async fn query(&self, name: &str, category: PackageCategory) -> Result<String> {
        tokio::time::timeout(self.timeout, self.source.query(category, name))
            .await
            .map_err(|_| ScoutError::Timeout {
                command: format!("{} {}", self.source.name(), name),
                timeout: self.timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WGET_INFO: &str = r#"{
        "formulae": [{"name": "wget", "homepage": "https://www.gnu.org/software/wget/",
                      "desc": "Internet file retriever"}],
        "casks": []
    }"#;

    #[test]
    fn test_extract_present_fields() {
        assert_eq!(
            extract_field(WGET_INFO, PackageCategory::Formula, "homepage", DEFAULT_HOMEPAGE),
            "https://www.gnu.org/software/wget/"
        );
        assert_eq!(
            extract_field(WGET_INFO, PackageCategory::Formula, "desc", DEFAULT_DESCRIPTION),
            "Internet file retriever"
        );
    }

    #[test]
    fn test_extract_wrong_category_uses_default() {
        assert_eq!(
            extract_field(WGET_INFO, PackageCategory::Cask, "homepage", DEFAULT_HOMEPAGE),
            DEFAULT_HOMEPAGE
        );
    }

    #[test]
    fn test_extract_null_and_blank_use_default() {
        let doc = r#"{"casks": [{"homepage": null, "desc": "   "}]}"#;
        assert_eq!(
            extract_field(doc, PackageCategory::Cask, "homepage", DEFAULT_HOMEPAGE),
            DEFAULT_HOMEPAGE
        );
        assert_eq!(
            extract_field(doc, PackageCategory::Cask, "desc", DEFAULT_DESCRIPTION),
            DEFAULT_DESCRIPTION
        );
    }

    #[test]
    fn test_extract_strips_control_characters() {
        let doc = "{\"formulae\": [{\"desc\": \"Fast\u{0007} grep\u{0000}\"}]}\u{001b}";
        assert_eq!(
            extract_field(doc, PackageCategory::Formula, "desc", DEFAULT_DESCRIPTION),
            "Fast grep"
        );
    }

    #[test]
    fn test_extract_garbage_uses_default() {
        for raw in ["", "not json", ERROR_DOCUMENT, "[]", r#"{"formulae": {}}"#] {
            assert_eq!(
                extract_field(raw, PackageCategory::Formula, "homepage", DEFAULT_HOMEPAGE),
                DEFAULT_HOMEPAGE,
                "input: {raw:?}"
            );
        }
    }

    #[test]
    fn test_extract_non_string_uses_default() {
        let doc = r#"{"formulae": [{"homepage": 42}]}"#;
        assert_eq!(
            extract_field(doc, PackageCategory::Formula, "homepage", DEFAULT_HOMEPAGE),
            DEFAULT_HOMEPAGE
        );
    }

    struct Canned(Option<&'static str>);

    impl MetadataSource for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn query(&self, _category: PackageCategory, name: &str) -> Result<String> {
            self.0
                .map(String::from)
                .ok_or_else(|| anyhow::anyhow!("no metadata for {}", name).into())
        }
    }

    struct Stalled;

    impl MetadataSource for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn query(&self, _category: PackageCategory, _name: &str) -> Result<String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_lookup_success_does_not_log() {
        let dir = TempDir::new().unwrap();
        let log = RunLog::create(dir.path()).unwrap().quiet();
        let lookup = MetadataLookup::new(Canned(Some(WGET_INFO)));

        let record = lookup
            .lookup(&"wget".to_string(), PackageCategory::Formula, &log)
            .await;
        assert_eq!(record.description, "Internet file retriever");
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_defaults_and_logs() {
        let dir = TempDir::new().unwrap();
        let log = RunLog::create(dir.path()).unwrap().quiet();
        let lookup = MetadataLookup::new(Canned(None));

        let record = lookup
            .lookup(&"x".to_string(), PackageCategory::Formula, &log)
            .await;
        assert_eq!(record.name, "x");
        assert_eq!(record.homepage, DEFAULT_HOMEPAGE);
        assert_eq!(record.description, DEFAULT_DESCRIPTION);
        assert_eq!(log.len(), 1);
        assert!(log.entries()[0].context.contains("formula x"));
    }

    #[tokio::test]
    async fn test_lookup_timeout_defaults_and_logs() {
        let dir = TempDir::new().unwrap();
        let log = RunLog::create(dir.path()).unwrap().quiet();
        let lookup = MetadataLookup::new(Stalled).with_timeout(Duration::from_millis(20));

        let record = lookup
            .lookup(&"slow".to_string(), PackageCategory::Cask, &log)
            .await;
        assert_eq!(record.homepage, DEFAULT_HOMEPAGE);
        assert!(log.entries()[0].message.contains("timed out"));
    }
}
