use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bevy::prelude::*;
use reqwest::header::USER_AGENT;

use super::tle::{parse_catalog, ElementSets};
use crate::config::{CACHE_TEXT_KEY, CACHE_TIME_KEY, TrackerConfig};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("cache store error: {0}")]
    Store(#[from] io::Error),
    #[error("catalog loader thread panicked")]
    Panicked,
}

/// String-valued persistent storage with get/set.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.dir.join(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!("Unreadable cache file {:?}: {err}", path);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(key), value)
    }
}

/// Where the raw element-set text comes from when the cache is stale.
pub trait CatalogSource {
    fn fetch(&self) -> impl Future<Output = Result<String, CatalogError>> + Send;
}

pub struct HttpCatalog {
    client: reqwest::Client,
    url: String,
    user_agent: String,
}

impl HttpCatalog {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(&config.catalog_url, &config.user_agent)
    }
}

impl CatalogSource for HttpCatalog {
    async fn fetch(&self) -> Result<String, CatalogError> {
        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?;

        info!("Fetched TLE data from remote URL: {}", self.url);
        Ok(response.text().await?)
    }
}

/// Raw catalog text plus the instant it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub raw_text: String,
    pub fetched_at_ms: i64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms - self.fetched_at_ms < ttl_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    Cache,
    Network,
}

#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub records: ElementSets,
    pub origin: CatalogOrigin,
    pub fetched_at_ms: i64,
}

/// Serves element sets from the store while fresh, from the source otherwise.
pub struct ElementSetCache<S, C> {
    store: S,
    source: C,
    ttl_ms: i64,
}

impl<S: KeyValueStore, C: CatalogSource> ElementSetCache<S, C> {
    pub fn new(store: S, source: C, ttl_ms: i64) -> Self {
        Self { store, source, ttl_ms }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // both keys must be present and the timestamp must parse
    pub fn cached_entry(&self) -> Option<CacheEntry> {
        let raw_text = self.store.get(CACHE_TEXT_KEY)?;
        let fetched_at_ms = self.store.get(CACHE_TIME_KEY)?.trim().parse().ok()?;
        Some(CacheEntry { raw_text, fetched_at_ms })
    }

    pub async fn load(&mut self, now_ms: i64) -> Result<LoadedCatalog, CatalogError> {
        let entry = match self.cached_entry() {
            Some(entry) if entry.is_fresh(now_ms, self.ttl_ms) => {
                info!("Using cached TLE data from {} ms", entry.fetched_at_ms);
                return Ok(Self::compile(entry, CatalogOrigin::Cache));
            }
            _ => CacheEntry {
                raw_text: self.source.fetch().await?,
                fetched_at_ms: now_ms,
            },
        };

        // a failed write only costs us a refetch next time
        if let Err(err) = self.persist(&entry) {
            warn!("Failed to persist TLE cache: {err}");
        }

        Ok(Self::compile(entry, CatalogOrigin::Network))
    }

    fn persist(&mut self, entry: &CacheEntry) -> io::Result<()> {
        self.store.set(CACHE_TEXT_KEY, &entry.raw_text)?;
        self.store.set(CACHE_TIME_KEY, &entry.fetched_at_ms.to_string())
    }

    fn compile(entry: CacheEntry, origin: CatalogOrigin) -> LoadedCatalog {
        let records: ElementSets = Arc::from(parse_catalog(&entry.raw_text));
        info!("Successfully parsed {} satellites.", records.len());

        LoadedCatalog {
            records,
            origin,
            fetched_at_ms: entry.fetched_at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::CACHE_TTL_MS;
    use crate::satellites::tle::tests::{ISS_LINE1, ISS_LINE2, ISS_NAME};

    struct FakeSource {
        text: Option<String>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn serving(text: &str) -> Self {
            Self { text: Some(text.to_string()), calls: AtomicUsize::new(0) }
        }

        fn offline() -> Self {
            Self { text: None, calls: AtomicUsize::new(0) }
        }
    }

    impl CatalogSource for FakeSource {
        async fn fetch(&self) -> Result<String, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text
                .clone()
                .ok_or_else(|| CatalogError::Store(io::Error::other("offline")))
        }
    }

    fn one_satellite() -> String {
        format!("{ISS_NAME}\n{ISS_LINE1}\n{ISS_LINE2}\n")
    }

    fn seeded_store(text: &str, fetched_at_ms: i64) -> MemoryStore {
        let mut store = MemoryStore::default();
        store.set(CACHE_TEXT_KEY, text).unwrap();
        store.set(CACHE_TIME_KEY, &fetched_at_ms.to_string()).unwrap();
        store
    }

    #[test]
    fn freshness_boundary() {
        let entry = CacheEntry { raw_text: String::new(), fetched_at_ms: 1_000 };
        assert!(entry.is_fresh(1_000, CACHE_TTL_MS));
        assert!(entry.is_fresh(1_000 + CACHE_TTL_MS - 1, CACHE_TTL_MS));
        assert!(!entry.is_fresh(1_000 + CACHE_TTL_MS, CACHE_TTL_MS));
    }

    #[tokio::test]
    async fn fresh_cache_skips_network() {
        let store = seeded_store(&one_satellite(), 5_000);
        let mut cache = ElementSetCache::new(store, FakeSource::offline(), CACHE_TTL_MS);

        let loaded = cache.load(5_000 + CACHE_TTL_MS - 1).await.unwrap();
        assert_eq!(loaded.origin, CatalogOrigin::Cache);
        assert_eq!(loaded.fetched_at_ms, 5_000);
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_cache_refetches_and_persists() {
        let store = seeded_store("OLD\n", 0);
        let mut cache = ElementSetCache::new(store, FakeSource::serving(&one_satellite()), CACHE_TTL_MS);

        let now = CACHE_TTL_MS;
        let loaded = cache.load(now).await.unwrap();
        assert_eq!(loaded.origin, CatalogOrigin::Network);
        assert_eq!(loaded.records[0].name, ISS_NAME);
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 1);

        assert_eq!(cache.store().get(CACHE_TEXT_KEY), Some(one_satellite()));
        assert_eq!(cache.store().get(CACHE_TIME_KEY), Some(now.to_string()));
    }

    #[tokio::test]
    async fn missing_timestamp_counts_as_no_cache() {
        let mut store = MemoryStore::default();
        store.set(CACHE_TEXT_KEY, &one_satellite()).unwrap();
        let mut cache = ElementSetCache::new(store, FakeSource::serving(&one_satellite()), CACHE_TTL_MS);

        let loaded = cache.load(10).await.unwrap();
        assert_eq!(loaded.origin, CatalogOrigin::Network);
    }

    #[tokio::test]
    async fn unparsable_timestamp_counts_as_no_cache() {
        let mut store = seeded_store(&one_satellite(), 0);
        store.set(CACHE_TIME_KEY, "yesterday").unwrap();
        let mut cache = ElementSetCache::new(store, FakeSource::offline(), CACHE_TTL_MS);

        assert!(cache.load(10).await.is_err());
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_store_untouched() {
        let store = seeded_store("OLD\n", 0);
        let mut cache = ElementSetCache::new(store, FakeSource::offline(), CACHE_TTL_MS);

        let result = cache.load(CACHE_TTL_MS * 2).await;
        assert!(matches!(result, Err(CatalogError::Store(_))));
        assert_eq!(cache.store().get(CACHE_TEXT_KEY).as_deref(), Some("OLD\n"));
        assert_eq!(cache.store().get(CACHE_TIME_KEY).as_deref(), Some("0"));
    }

    // reads nothing, refuses every write
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[tokio::test]
    async fn persist_failure_still_loads() {
        let mut cache = ElementSetCache::new(ReadOnlyStore, FakeSource::serving(&one_satellite()), CACHE_TTL_MS);

        let loaded = cache.load(42).await.unwrap();
        assert_eq!(loaded.origin, CatalogOrigin::Network);
        assert_eq!(loaded.fetched_at_ms, 42);
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].name, ISS_NAME);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get(CACHE_TEXT_KEY), None);
        store.set(CACHE_TEXT_KEY, "payload").unwrap();
        assert_eq!(store.get(CACHE_TEXT_KEY).as_deref(), Some("payload"));
    }
}
