//! Homebrew JSON API client used as a remote metadata source.
//!
//! Instead of shelling out to `brew info`, [`BrewApi`] fetches
//! `https://formulae.brew.sh/api/<kind>/<name>.json` and keeps responses in an
//! in-memory cache for the lifetime of the client, so a package that shows up
//! in more than one report section is only fetched once.

use crate::error::{Result, ScoutError};
use crate::package::PackageCategory;
use serde_json::Value;
use std::time::Duration;

const HOMEBREW_API_BASE: &str = "https://formulae.brew.sh/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Homebrew API client with in-memory caching
#[derive(Clone)]
pub struct BrewApi {
    client: reqwest::Client,
    base_url: String,
    cache: moka::future::Cache<(PackageCategory, String), Value>,
}

impl BrewApi {
    pub fn new() -> Result<Self> {
        Self::with_base_url(HOMEBREW_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(format!("brewscout/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: moka::future::Cache::new(1000),
        })
    }

    pub fn url_for(&self, category: PackageCategory, name: &str) -> String {
        let kind = match category {
            PackageCategory::Formula => "formula",
            PackageCategory::Cask => "cask",
        };
        format!("{}/{}/{}.json", self.base_url, kind, name)
    }

    /// Fetch the raw metadata object for one package.
    pub async fn fetch(&self, category: PackageCategory, name: &str) -> Result<Value> {
        let key = (category, name.to_string());
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let url = self.url_for(category, name);
        tracing::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ScoutError::NotFound {
                kind: match category {
                    PackageCategory::Formula => "Formula",
                    PackageCategory::Cask => "Cask",
                },
                name: name.to_string(),
            });
        }

        let value: Value = response.error_for_status()?.json().await?;
        self.cache.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Wrap a single API object in the `brew info --json=v2` layout so both
    /// metadata sources feed the same extractor.
    pub fn as_info_document(category: PackageCategory, value: Value) -> Value {
        let mut doc = serde_json::Map::new();
        for other in PackageCategory::ALL {
            let entries = if other == category {
                vec![value.clone()]
            } else {
                Vec::new()
            };
            doc.insert(other.json_key().to_string(), Value::Array(entries));
        }
        Value::Object(doc)
    }
}
