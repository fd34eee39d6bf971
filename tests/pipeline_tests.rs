//! Fetch pipeline tests against a scripted in-memory source.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dexgrid::api::{self, CatalogSource, SharedSource};
use dexgrid::catalog::derive_facets;
use dexgrid::error::CatalogError;
use dexgrid::state::IndexEntry;
use pretty_assertions::assert_eq;
use serde_json::json;

const BASE: &str = "https://example.test/api/v2";

/// Serves canned bodies per URL, with optional failures and delays.
#[derive(Default)]
struct ScriptedSource {
    responses: HashMap<String, Vec<u8>>,
    failures: HashSet<String>,
    delays: HashMap<String, Duration>,
    hold: Option<Duration>,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedSource {
    fn respond(mut self, url: &str, body: serde_json::Value) -> Self {
        self.responses.insert(url.to_string(), body.to_string().into_bytes());
        self
    }

    fn respond_raw(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), body.as_bytes().to_vec());
        self
    }

    fn fail(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }

    fn delay(mut self, url: &str, millis: u64) -> Self {
        self.delays.insert(url.to_string(), Duration::from_millis(millis));
        self
    }

    /// Every request stays in flight for at least `millis`.
    fn hold_each(mut self, millis: u64) -> Self {
        self.hold = Some(Duration::from_millis(millis));
        self
    }

    fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        self.requests.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(hold) = self.hold {
            tokio::time::sleep(hold).await;
        }
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failures.contains(url) {
            return Err(CatalogError::Network(format!("connection reset: {url}")));
        }
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| CatalogError::Network(format!("404 Not Found: {url}")))
    }
}

fn detail_url(id: u32) -> String {
    format!("{BASE}/pokemon/{id}/")
}

fn detail(id: u32, name: &str, types: &[&str]) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "height": 10 + id,
        "weight": 100 + id,
        "types": types
            .iter()
            .enumerate()
            .map(|(slot, name)| json!({"slot": slot + 1, "type": {"name": name, "url": "t"}}))
            .collect::<Vec<_>>(),
        "stats": [
            {"base_stat": 45, "effort": 0, "stat": {"name": "hp", "url": "s"}},
            {"base_stat": 65, "effort": 1, "stat": {"name": "special-attack", "url": "s"}}
        ],
        "sprites": {"front_shiny": format!("https://img.test/shiny/{id}.png")}
    })
}

/// Seven entries; the fourth (pikachu) is the only electric one.
fn roster() -> Vec<(u32, &'static str, Vec<&'static str>)> {
    vec![
        (1, "bulbasaur", vec!["grass", "poison"]),
        (4, "charmander", vec!["fire"]),
        (7, "squirtle", vec!["water"]),
        (25, "pikachu", vec!["electric"]),
        (6, "charizard", vec!["fire", "flying"]),
        (16, "pidgey", vec!["normal", "flying"]),
        (19, "rattata", vec!["normal"]),
    ]
}

fn entries() -> Vec<IndexEntry> {
    roster()
        .into_iter()
        .map(|(id, name, _)| IndexEntry {
            name: name.to_string(),
            url: detail_url(id),
        })
        .collect()
}

fn roster_source() -> ScriptedSource {
    roster()
        .into_iter()
        .fold(ScriptedSource::default(), |source, (id, name, types)| {
            source.respond(&detail_url(id), detail(id, name, &types))
        })
}

fn names(records: &[dexgrid::state::DetailRecord]) -> Vec<&str> {
    records.iter().map(|record| record.name.as_str()).collect()
}

#[tokio::test]
async fn partial_failure_keeps_survivors_in_order() {
    let source: SharedSource = Arc::new(roster_source().fail(&detail_url(25)));

    let enrichment = api::enrich(source, &entries()).await;

    assert_eq!(
        names(&enrichment.records),
        vec!["bulbasaur", "charmander", "squirtle", "charizard", "pidgey", "rattata"]
    );
    assert_eq!(enrichment.failed, vec!["pikachu".to_string()]);
    assert_eq!(
        derive_facets(&enrichment.records),
        vec!["grass", "poison", "fire", "water", "flying", "normal"]
    );
}

#[tokio::test]
async fn order_holds_when_completion_order_differs() {
    // First entries finish last.
    let source = roster_source()
        .delay(&detail_url(1), 40)
        .delay(&detail_url(4), 30)
        .delay(&detail_url(7), 20)
        .delay(&detail_url(25), 10);
    let source: SharedSource = Arc::new(source);

    let enrichment = api::enrich(source, &entries()).await;

    assert!(enrichment.failed.is_empty());
    assert_eq!(
        names(&enrichment.records),
        vec!["bulbasaur", "charmander", "squirtle", "pikachu", "charizard", "pidgey", "rattata"]
    );
}

#[tokio::test]
async fn every_entry_is_fetched_once() {
    let scripted = Arc::new(roster_source());
    let source: SharedSource = scripted.clone();

    api::enrich(source, &entries()).await;

    let mut requested = scripted.requested();
    requested.sort();
    let mut expected: Vec<String> = entries().into_iter().map(|entry| entry.url).collect();
    expected.sort();
    assert_eq!(requested, expected);
}

#[tokio::test]
async fn every_fetch_is_in_flight_at_once() {
    let scripted = Arc::new(roster_source().hold_each(50));
    let source: SharedSource = scripted.clone();

    let enrichment = api::enrich(source, &entries()).await;

    assert_eq!(enrichment.records.len(), entries().len());
    assert_eq!(scripted.peak_in_flight(), entries().len());
}

#[tokio::test]
async fn records_without_types_are_dropped() {
    let source = roster_source().respond(&detail_url(19), detail(19, "rattata", &[]));
    let source: SharedSource = Arc::new(source);

    let enrichment = api::enrich(source, &entries()).await;

    assert_eq!(enrichment.records.len(), 6);
    assert_eq!(enrichment.failed, vec!["rattata".to_string()]);
}

#[tokio::test]
async fn unparseable_detail_is_dropped() {
    let source = roster_source().respond_raw(&detail_url(7), "{\"id\": ");
    let source: SharedSource = Arc::new(source);

    let enrichment = api::enrich(source, &entries()).await;

    assert!(!names(&enrichment.records).contains(&"squirtle"));
    assert_eq!(enrichment.failed, vec!["squirtle".to_string()]);
}

#[tokio::test]
async fn enrichment_of_empty_index_is_empty() {
    let source: SharedSource = Arc::new(ScriptedSource::default());
    let enrichment = api::enrich(source, &[]).await;
    assert!(enrichment.records.is_empty());
    assert!(enrichment.failed.is_empty());
}

#[tokio::test]
async fn listing_requests_offset_window() {
    let url = format!("{BASE}/pokemon?offset=12&limit=6");
    let body = json!({
        "count": 1302,
        "results": [
            {"name": "paras", "url": detail_url(46)},
            {"name": "parasect", "url": detail_url(47)}
        ]
    });
    let source = ScriptedSource::default().respond(&url, body);

    let listing = api::fetch_listing(&source, BASE, 3, 6).await.unwrap();

    assert_eq!(source.requested(), vec![url]);
    assert_eq!(listing.count, 1302);
    assert_eq!(
        listing.entries,
        vec![
            IndexEntry {
                name: "paras".into(),
                url: detail_url(46),
            },
            IndexEntry {
                name: "parasect".into(),
                url: detail_url(47),
            },
        ]
    );
}

#[tokio::test]
async fn full_catalog_mode_uses_one_large_page() {
    let url = format!("{BASE}/pokemon?offset=0&limit=1000");
    let source = ScriptedSource::default().respond(&url, json!({"count": 0, "results": []}));

    let entries = api::fetch_catalog_index(&source, BASE, 1000).await.unwrap();

    assert!(entries.is_empty());
    assert_eq!(source.requested(), vec![url]);
}

#[tokio::test]
async fn listing_failure_reaches_the_caller() {
    let url = format!("{BASE}/pokemon?offset=0&limit=1000");
    let source = ScriptedSource::default().fail(&url);
    let err = api::fetch_catalog_index(&source, BASE, 1000).await.unwrap_err();
    assert!(matches!(err, CatalogError::Network(_)));

    let source = ScriptedSource::default().respond_raw(&url, "not json");
    let err = api::fetch_catalog_index(&source, BASE, 1000).await.unwrap_err();
    assert!(matches!(err, CatalogError::Parse(_)));
}

#[tokio::test]
async fn stats_come_from_detail_by_id() {
    let url = format!("{BASE}/pokemon/6");
    let source =
        ScriptedSource::default().respond(&url, detail(6, "charizard", &["fire", "flying"]));

    let record = api::fetch_detail_by_id(&source, BASE, 6).await.unwrap();

    assert_eq!(record.id, 6);
    assert_eq!(record.stats.len(), 2);
    assert_eq!(record.stats[0].name, "hp");
    assert_eq!(record.stats[0].base_value, 45);
    assert_eq!(record.stats[1].name, "special-attack");
    assert_eq!(record.sprite.as_deref(), Some("https://img.test/shiny/6.png"));
}
