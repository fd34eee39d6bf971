use serde::{Deserialize, Serialize};
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::catalog::{self, FilterState, Page};
use crate::config::CatalogConfig;
use crate::stats_cache::StatsCache;

/// One row of the upstream listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub id: u32,
    pub name: String,
    /// Decimetres.
    pub height: u32,
    /// Hectograms.
    pub weight: u32,
    /// Never empty; the first entry is the primary type.
    pub types: Vec<String>,
    pub sprite: Option<String>,
    pub stats: Vec<StatEntry>,
}

impl DetailRecord {
    pub fn primary_type(&self) -> &str {
        self.types.first().map(String::as_str).unwrap_or_default()
    }

    pub fn height_m(&self) -> f32 {
        self.height as f32 / 10.0
    }

    pub fn weight_kg(&self) -> f32 {
        self.weight as f32 / 10.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub name: String,
    pub base_value: u16,
}

/// Where the current catalog load stands.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadPhase {
    #[default]
    Idle,
    Listing,
    Enriching {
        total: usize,
    },
    Ready,
    Failed(String),
}

impl LoadPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadPhase::Listing | LoadPhase::Enriching { .. })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub config: CatalogConfig,
    pub terminal_size: (u16, u16),

    /// Bumped on every catalog load; results tagged with an older value are dropped.
    pub generation: u64,
    pub phase: LoadPhase,
    pub records: Vec<DetailRecord>,
    /// Names of index entries whose detail could not be loaded.
    pub failed_entries: Vec<String>,

    pub filter: FilterState,
    pub search_active: bool,
    pub facet_cursor: usize,
    /// Card index within the current page.
    pub selected: usize,

    pub stats: StatsCache,

    pub message: Option<String>,
    pub tick: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

impl AppState {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config,
            terminal_size: (80, 24),
            generation: 0,
            phase: LoadPhase::Idle,
            records: Vec::new(),
            failed_entries: Vec::new(),
            filter: FilterState::default(),
            search_active: false,
            facet_cursor: 0,
            selected: 0,
            stats: StatsCache::default(),
            message: None,
            tick: 0,
        }
    }

    pub fn facets(&self) -> Vec<String> {
        catalog::derive_facets(&self.records)
    }

    pub fn filtered(&self) -> Vec<&DetailRecord> {
        catalog::filter_catalog(&self.records, &self.filter)
    }

    pub fn total_pages(&self) -> usize {
        catalog::total_pages(self.filtered().len(), self.config.effective_page_size())
    }

    pub fn current_page(&self) -> Page<&DetailRecord> {
        catalog::paginate(
            &self.filtered(),
            self.filter.page,
            self.config.effective_page_size(),
        )
    }

    pub fn selected_record(&self) -> Option<&DetailRecord> {
        self.current_page().items.get(self.selected).copied()
    }

    pub fn cursor_facet(&self) -> Option<String> {
        self.facets().into_iter().nth(self.facet_cursor)
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let page = self.current_page();
        vec![
            DebugSection::new("Catalog")
                .entry("generation", ron_string(&self.generation))
                .entry("phase", ron_string(&self.phase))
                .entry("records", ron_string(&self.records.len()))
                .entry("failed", ron_string(&self.failed_entries.len())),
            DebugSection::new("Filters")
                .entry("search", ron_string(&self.filter.search))
                .entry("search_active", ron_string(&self.search_active))
                .entry("facets", ron_string(&self.filter.facets))
                .entry("facet_cursor", ron_string(&self.facet_cursor))
                .entry("page", ron_string(&page.page))
                .entry("total_pages", ron_string(&page.total_pages))
                .entry("selected", ron_string(&self.selected)),
            DebugSection::new("Status")
                .entry("stats_cached", ron_string(&self.stats.len()))
                .entry("stats_in_flight", ron_string(&self.stats.in_flight()))
                .entry("message", ron_string(&self.message)),
        ]
    }
}
