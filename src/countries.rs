//! Reference country names for entry pickers.
//!
//! The list is fetched from the REST Countries API, cached in the key-value
//! store for seven days, and replaced by a built-in list when the fetch fails.

use crate::store::{KeyValueStore, StoreError};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const COUNTRIES_CACHE_KEY: &str = "countries_cache";

const COUNTRIES_API: &str = "https://restcountries.com/v3.1/all?fields=name,cca2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    /// ISO 3166-1 alpha-2
    pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("country request failed: {0}")]
    Request(String),
    #[error("country response could not be decoded: {0}")]
    Decode(#[from] std::io::Error),
}

pub trait CountrySource {
    fn fetch(&self) -> Result<Vec<Country>, FetchError>;
}

#[derive(Deserialize)]
struct RestCountry {
    name: RestName,
    cca2: String,
}

#[derive(Deserialize)]
struct RestName {
    common: String,
}

pub struct RestCountries {
    agent: ureq::Agent,
    url: String,
}

impl RestCountries {
    pub fn new(timeout: std::time::Duration) -> Self {
        RestCountries {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: COUNTRIES_API.to_string(),
        }
    }
}

impl CountrySource for RestCountries {
    fn fetch(&self) -> Result<Vec<Country>, FetchError> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        let countries: Vec<RestCountry> = response.into_json()?;
        log::info!("{} countries fetched", countries.len());
        Ok(countries
            .into_iter()
            .map(|c| Country {
                name: c.name.common,
                code: c.cca2,
            })
            .collect())
    }
}

#[derive(Serialize, Deserialize)]
struct CachedCountries {
    countries: Vec<Country>,
    /// Milliseconds since the epoch
    timestamp: i64,
}

pub struct CountryCatalog {
    store: Arc<dyn KeyValueStore>,
    source: Box<dyn CountrySource>,
    ttl: Duration,
    offline: bool,
}

impl CountryCatalog {
    pub fn new(store: Arc<dyn KeyValueStore>, source: Box<dyn CountrySource>) -> Self {
        CountryCatalog {
            store,
            source,
            ttl: Duration::days(7),
            offline: false,
        }
    }

    /// Never touch the network; a fresh cache is still used.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Sorted by name. Falls back to the built-in list on any failure.
    pub fn countries(&self) -> Vec<Country> {
        if let Some(cached) = self.cached() {
            return cached;
        }
        if self.offline {
            log::debug!("offline, using built-in country list");
            return fallback_countries();
        }
        match self.source.fetch() {
            Ok(mut countries) => {
                countries.sort_by(|a, b| a.name.cmp(&b.name));
                self.store_cache(&countries);
                countries
            }
            Err(e) => {
                log::warn!("{}, using built-in country list", e);
                fallback_countries()
            }
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.countries().into_iter().map(|c| c.name).collect()
    }

    pub fn clear_cache(&self) {
        if let Err(e) = self.store.clear(COUNTRIES_CACHE_KEY) {
            log::error!("failed to clear country cache: {}", e);
        }
    }

    fn cached(&self) -> Option<Vec<Country>> {
        let blob = match self.store.load(COUNTRIES_CACHE_KEY) {
            Ok(blob) => blob?,
            Err(e) => {
                log::error!("failed to load cached countries: {}", e);
                return None;
            }
        };
        let cached: CachedCountries = match serde_json::from_value(blob) {
            Ok(cached) => cached,
            Err(e) => {
                log::error!("failed to load cached countries: {}", e);
                return None;
            }
        };
        let age = Utc::now().timestamp_millis() - cached.timestamp;
        if age < self.ttl.num_milliseconds() {
            Some(cached.countries)
        } else {
            log::debug!("country cache expired");
            None
        }
    }

    fn store_cache(&self, countries: &[Country]) {
        let cached = CachedCountries {
            countries: countries.to_vec(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let saved = serde_json::to_value(&cached)
            .map_err(StoreError::from)
            .and_then(|blob| self.store.save(COUNTRIES_CACHE_KEY, &blob));
        if let Err(e) = saved {
            log::error!("failed to cache countries: {}", e);
        }
    }
}

const FALLBACK: &[(&str, &str)] = &[
    ("Afghanistan", "AF"),
    ("Albania", "AL"),
    ("Algeria", "DZ"),
    ("Argentina", "AR"),
    ("Australia", "AU"),
    ("Austria", "AT"),
    ("Belgium", "BE"),
    ("Brazil", "BR"),
    ("Canada", "CA"),
    ("Chile", "CL"),
    ("China", "CN"),
    ("Colombia", "CO"),
    ("Denmark", "DK"),
    ("Egypt", "EG"),
    ("Finland", "FI"),
    ("France", "FR"),
    ("Germany", "DE"),
    ("Greece", "GR"),
    ("Hong Kong", "HK"),
    ("India", "IN"),
    ("Indonesia", "ID"),
    ("Ireland", "IE"),
    ("Israel", "IL"),
    ("Italy", "IT"),
    ("Japan", "JP"),
    ("Luxembourg", "LU"),
    ("Malaysia", "MY"),
    ("Mexico", "MX"),
    ("Netherlands", "NL"),
    ("New Zealand", "NZ"),
    ("Norway", "NO"),
    ("Poland", "PL"),
    ("Portugal", "PT"),
    ("Russia", "RU"),
    ("Saudi Arabia", "SA"),
    ("Singapore", "SG"),
    ("South Africa", "ZA"),
    ("South Korea", "KR"),
    ("Spain", "ES"),
    ("Sweden", "SE"),
    ("Switzerland", "CH"),
    ("Thailand", "TH"),
    ("Turkey", "TR"),
    ("United Arab Emirates", "AE"),
    ("United Kingdom", "GB"),
    ("United States", "US"),
    ("Vietnam", "VN"),
];

pub fn fallback_countries() -> Vec<Country> {
    FALLBACK
        .iter()
        .map(|(name, code)| Country {
            name: name.to_string(),
            code: code.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeSource {
        calls: Rc<Cell<usize>>,
        result: fn() -> Result<Vec<Country>, FetchError>,
    }

    impl CountrySource for FakeSource {
        fn fetch(&self) -> Result<Vec<Country>, FetchError> {
            self.calls.set(self.calls.get() + 1);
            (self.result)()
        }
    }

    fn two_countries() -> Result<Vec<Country>, FetchError> {
        Ok(vec![
            Country {
                name: "Zambia".to_string(),
                code: "ZM".to_string(),
            },
            Country {
                name: "Austria".to_string(),
                code: "AT".to_string(),
            },
        ])
    }

    fn failing() -> Result<Vec<Country>, FetchError> {
        Err(FetchError::Request("unreachable".to_string()))
    }

    fn catalog(
        store: Arc<MemoryStore>,
        result: fn() -> Result<Vec<Country>, FetchError>,
    ) -> (CountryCatalog, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let source = FakeSource {
            calls: calls.clone(),
            result,
        };
        (CountryCatalog::new(store, Box::new(source)), calls)
    }

    #[test]
    fn fetched_list_is_sorted_and_cached() {
        let store = Arc::new(MemoryStore::new());
        let (catalog, calls) = catalog(store.clone(), two_countries);
        assert_eq!(catalog.names(), ["Austria", "Zambia"]);
        assert_eq!(catalog.names(), ["Austria", "Zambia"]);
        assert_eq!(calls.get(), 1);
        assert_eq!(store.keys(), [COUNTRIES_CACHE_KEY]);
    }

    #[test]
    fn expired_cache_is_refetched() {
        let store = Arc::new(MemoryStore::new());
        let stale = Utc::now() - Duration::days(8);
        store
            .save(
                COUNTRIES_CACHE_KEY,
                &json!({ "countries": [], "timestamp": stale.timestamp_millis() }),
            )
            .unwrap();
        let (catalog, calls) = catalog(store, two_countries);
        assert_eq!(catalog.countries().len(), 2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failure_falls_back_without_caching() {
        let store = Arc::new(MemoryStore::new());
        let (catalog, _) = catalog(store.clone(), failing);
        let countries = catalog.countries();
        assert_eq!(countries.len(), 47);
        assert_eq!(countries[0].name, "Afghanistan");
        assert!(store.keys().is_empty());
    }

    #[test]
    fn offline_skips_source() {
        let store = Arc::new(MemoryStore::new());
        let (catalog, calls) = catalog(store, two_countries);
        let catalog = catalog.offline(true);
        assert_eq!(catalog.countries().len(), 47);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn clear_cache_forces_refetch() {
        let store = Arc::new(MemoryStore::new());
        let (catalog, calls) = catalog(store, two_countries);
        catalog.countries();
        catalog.clear_cache();
        catalog.countries();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn fallback_is_sorted() {
        let names: Vec<_> = fallback_countries().into_iter().map(|c| c.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
