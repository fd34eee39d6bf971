//! Catalog fetch pipeline: listing, per-entry enrichment and detail-by-id.
//!
//! HTTP is reached through [`CatalogSource`], so the pipeline can be driven by
//! the caching [`HttpSource`] or by anything else that returns bytes for a URL.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::state::{DetailRecord, IndexEntry, StatEntry};

#[derive(Clone, Debug, Deserialize)]
struct NamedResource {
    name: String,
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct ListResponse {
    results: Vec<NamedResource>,
    #[serde(default)]
    count: usize,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonResponse {
    id: u32,
    name: String,
    height: u32,
    weight: u32,
    types: Vec<PokemonTypeSlot>,
    stats: Vec<PokemonStatSlot>,
    #[serde(default)]
    sprites: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonTypeSlot {
    #[serde(rename = "type")]
    type_info: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonStatSlot {
    base_stat: u16,
    stat: NamedResource,
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError>;

    /// Called when bytes returned for `url` did not parse.
    async fn invalidate(&self, _url: &str) {}
}

pub type SharedSource = Arc<dyn CatalogSource>;

/// One page of the upstream listing.
#[derive(Clone, Debug, PartialEq)]
pub struct Listing {
    pub entries: Vec<IndexEntry>,
    /// Size of the whole upstream catalog.
    pub count: usize,
}

/// Records that enriched successfully, in index order, plus the names of the
/// entries that did not.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Enrichment {
    pub records: Vec<DetailRecord>,
    pub failed: Vec<String>,
}

pub fn listing_url(base_url: &str, page: usize, limit: usize) -> String {
    let offset = (page.max(1) - 1) * limit;
    format!("{base_url}/pokemon?offset={offset}&limit={limit}")
}

pub fn detail_url(base_url: &str, id: u32) -> String {
    format!("{base_url}/pokemon/{id}")
}

pub async fn fetch_listing<S>(
    source: &S,
    base_url: &str,
    page: usize,
    limit: usize,
) -> Result<Listing, CatalogError>
where
    S: CatalogSource + ?Sized,
{
    let url = listing_url(base_url, page, limit);
    let response: ListResponse = fetch_json(source, &url).await?;
    let entries: Vec<IndexEntry> = response
        .results
        .into_iter()
        .map(|entry| IndexEntry {
            name: entry.name,
            url: entry.url,
        })
        .collect();
    info!(page, limit, entries = entries.len(), count = response.count, "listing loaded");
    Ok(Listing {
        entries,
        count: response.count,
    })
}

/// Full-catalog mode: the first `limit` entries as a single page.
pub async fn fetch_catalog_index<S>(
    source: &S,
    base_url: &str,
    limit: usize,
) -> Result<Vec<IndexEntry>, CatalogError>
where
    S: CatalogSource + ?Sized,
{
    Ok(fetch_listing(source, base_url, 1, limit).await?.entries)
}

pub async fn fetch_detail<S>(source: &S, url: &str) -> Result<DetailRecord, CatalogError>
where
    S: CatalogSource + ?Sized,
{
    let response: PokemonResponse = fetch_json(source, url).await?;
    detail_from_response(response)
}

pub async fn fetch_detail_by_id<S>(
    source: &S,
    base_url: &str,
    id: u32,
) -> Result<DetailRecord, CatalogError>
where
    S: CatalogSource + ?Sized,
{
    fetch_detail(source, &detail_url(base_url, id)).await
}

/// Fetches every entry's detail at once and waits for all of them.
///
/// Output keeps index order regardless of completion order. Entries that fail
/// are left out and reported by name.
pub async fn enrich(source: SharedSource, entries: &[IndexEntry]) -> Enrichment {
    info!(total = entries.len(), "enrichment started");
    let mut join_set = JoinSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let source = Arc::clone(&source);
        let url = entry.url.clone();
        join_set.spawn(async move { (index, fetch_detail(source.as_ref(), &url).await) });
    }

    let mut slots: Vec<Option<Result<DetailRecord, CatalogError>>> = vec![None; entries.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(result);
                }
            }
            Err(err) => warn!(error = %err, "detail task did not finish"),
        }
    }

    let mut enrichment = Enrichment {
        records: Vec::with_capacity(entries.len()),
        failed: Vec::new(),
    };
    for (entry, slot) in entries.iter().zip(slots) {
        match slot {
            Some(Ok(record)) => enrichment.records.push(record),
            Some(Err(err)) => {
                warn!(name = %entry.name, error = %err, "dropping catalog entry");
                enrichment.failed.push(entry.name.clone());
            }
            None => enrichment.failed.push(entry.name.clone()),
        }
    }
    info!(
        loaded = enrichment.records.len(),
        failed = enrichment.failed.len(),
        "enrichment finished"
    );
    enrichment
}

fn detail_from_response(response: PokemonResponse) -> Result<DetailRecord, CatalogError> {
    if response.types.is_empty() {
        return Err(CatalogError::InvalidRecord {
            name: response.name,
            reason: "no types".to_string(),
        });
    }

    let sprite = pointer_string(&response.sprites, "/front_shiny")
        .or_else(|| pointer_string(&response.sprites, "/front_default"));
    Ok(DetailRecord {
        id: response.id,
        name: response.name,
        height: response.height,
        weight: response.weight,
        types: response
            .types
            .into_iter()
            .map(|slot| slot.type_info.name)
            .collect(),
        sprite,
        stats: response
            .stats
            .into_iter()
            .map(|slot| StatEntry {
                name: slot.stat.name,
                base_value: slot.base_stat,
            })
            .collect(),
    })
}

fn pointer_string(value: &serde_json::Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
}

async fn fetch_json<S, T>(source: &S, url: &str) -> Result<T, CatalogError>
where
    S: CatalogSource + ?Sized,
    T: DeserializeOwned,
{
    let bytes = source.fetch_bytes(url).await?;
    let parsed = serde_json::from_slice::<T>(&bytes);
    match parsed {
        Ok(value) => Ok(value),
        Err(err) => {
            source.invalidate(url).await;
            Err(err.into())
        }
    }
}

/// reqwest-backed source with an optional on-disk response cache.
pub struct HttpSource {
    client: reqwest::Client,
    cache_dir: Option<PathBuf>,
}

impl HttpSource {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_dir,
        }
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let root = self.cache_dir.as_ref()?;
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        Some(root.join("http").join(hex::encode(hasher.finalize())))
    }
}

#[async_trait]
impl CatalogSource for HttpSource {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let cache_path = self.cache_path(url);
        if let Some(path) = cache_path.as_deref() {
            if let Some(bytes) = read_cache(path).await {
                debug!(url, "cache hit");
                return Ok(bytes);
            }
        }

        debug!(url, "cache miss");
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?.to_vec();
        if let Some(path) = cache_path.as_deref() {
            write_cache(path, &bytes).await;
        }
        Ok(bytes)
    }

    async fn invalidate(&self, url: &str) {
        if let Some(path) = self.cache_path(url) {
            debug!(url, "evicting unparseable response");
            let _ = fs::remove_file(&path).await;
        }
    }
}

pub fn default_cache_dir() -> PathBuf {
    dirs_next::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("dexgrid")
}

async fn read_cache(path: &Path) -> Option<Vec<u8>> {
    fs::read(path).await.ok()
}

async fn write_cache(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent).await;
    }
    if let Err(err) = fs::write(path, bytes).await {
        warn!(path = %path.display(), error = %err, "failed to write cache entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const BASE: &str = "https://example.test/api/v2";

    #[derive(Default)]
    struct StaticSource {
        responses: HashMap<String, Vec<u8>>,
        invalidated: Mutex<Vec<String>>,
    }

    impl StaticSource {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.responses.insert(url.to_string(), body.as_bytes().to_vec());
            self
        }
    }

    #[async_trait]
    impl CatalogSource for StaticSource {
        async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| CatalogError::Network(format!("404 for {url}")))
        }

        async fn invalidate(&self, url: &str) {
            if let Ok(mut invalidated) = self.invalidated.lock() {
                invalidated.push(url.to_string());
            }
        }
    }

    const CHARMANDER: &str = r#"{
        "id": 4,
        "name": "charmander",
        "height": 6,
        "weight": 85,
        "types": [{"slot": 1, "type": {"name": "fire", "url": "https://example.test/type/10/"}}],
        "stats": [
            {"base_stat": 39, "effort": 0, "stat": {"name": "hp", "url": "u"}},
            {"base_stat": 52, "effort": 0, "stat": {"name": "attack", "url": "u"}}
        ],
        "sprites": {"front_default": "front.png", "front_shiny": "shiny.png"}
    }"#;

    #[test]
    fn listing_url_uses_page_offset() {
        assert_eq!(
            listing_url(BASE, 1, 20),
            format!("{BASE}/pokemon?offset=0&limit=20")
        );
        assert_eq!(
            listing_url(BASE, 3, 6),
            format!("{BASE}/pokemon?offset=12&limit=6")
        );
        assert_eq!(
            listing_url(BASE, 0, 6),
            format!("{BASE}/pokemon?offset=0&limit=6")
        );
    }

    #[tokio::test]
    async fn listing_passes_upstream_order_through() {
        let body = r#"{"count": 1302, "results": [
            {"name": "zubat", "url": "z"},
            {"name": "abra", "url": "a"},
            {"name": "zubat", "url": "z"}
        ]}"#;
        let source = StaticSource::default().with(&listing_url(BASE, 2, 3), body);
        let listing = fetch_listing(&source, BASE, 2, 3).await.unwrap();
        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zubat", "abra", "zubat"]);
        assert_eq!(listing.count, 1302);
    }

    #[tokio::test]
    async fn listing_network_failure_surfaces() {
        let source = StaticSource::default();
        let err = fetch_catalog_index(&source, BASE, 1000).await.unwrap_err();
        assert!(matches!(err, CatalogError::Network(_)));
    }

    #[tokio::test]
    async fn unparseable_listing_is_a_parse_failure_and_invalidates() {
        let url = listing_url(BASE, 1, 10);
        let source = StaticSource::default().with(&url, "<html>oops</html>");
        let err = fetch_catalog_index(&source, BASE, 10).await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
        assert_eq!(*source.invalidated.lock().unwrap(), vec![url]);
    }

    #[tokio::test]
    async fn detail_by_id_decodes_record() {
        let source = StaticSource::default().with(&detail_url(BASE, 4), CHARMANDER);
        let record = fetch_detail_by_id(&source, BASE, 4).await.unwrap();
        assert_eq!(record.id, 4);
        assert_eq!(record.name, "charmander");
        assert_eq!(record.types, vec!["fire"]);
        assert_eq!(record.primary_type(), "fire");
        assert_eq!(record.sprite.as_deref(), Some("shiny.png"));
        assert_eq!(record.stats.len(), 2);
        assert_eq!(record.stats[1].name, "attack");
        assert_eq!(record.stats[1].base_value, 52);
        assert!((record.height_m() - 0.6).abs() < f32::EPSILON);
        assert!((record.weight_kg() - 8.5).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn record_without_types_is_invalid() {
        let body = r#"{"id": 0, "name": "missingno", "height": 1, "weight": 1,
            "types": [], "stats": [], "sprites": {}}"#;
        let source = StaticSource::default().with("m", body);
        let err = fetch_detail(&source, "m").await.unwrap_err();
        assert_eq!(
            err,
            CatalogError::InvalidRecord {
                name: "missingno".to_string(),
                reason: "no types".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn record_missing_fields_is_a_parse_failure() {
        let source = StaticSource::default().with("m", r#"{"id": 1, "name": "x"}"#);
        let err = fetch_detail(&source, "m").await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn http_cache_path_is_stable_per_url() {
        let source = HttpSource::new(Some(PathBuf::from("/tmp/dexgrid-test")));
        let a = source.cache_path("https://example.test/a").unwrap();
        let b = source.cache_path("https://example.test/b").unwrap();
        assert_eq!(a, source.cache_path("https://example.test/a").unwrap());
        assert_ne!(a, b);
        assert!(a.starts_with("/tmp/dexgrid-test/http"));
        assert!(HttpSource::new(None).cache_path("x").is_none());
    }
}
