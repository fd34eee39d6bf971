//! Catalog configuration

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
/// Full-catalog mode requests the whole index as one page of this size.
pub const DEFAULT_CATALOG_LIMIT: usize = 1000;
pub const DEFAULT_PAGE_SIZE: usize = 6;
/// Number of slots in a stat bar.
pub const STAT_BAR_SLOTS: u16 = 15;
/// Base stat rendered as a full bar. Anything above it saturates.
pub const STAT_BAR_SCALE: u16 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub catalog_limit: usize,
    pub page_size: usize,
    pub stat_slots: u16,
    pub stat_scale: u16,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            catalog_limit: DEFAULT_CATALOG_LIMIT,
            page_size: DEFAULT_PAGE_SIZE,
            stat_slots: STAT_BAR_SLOTS,
            stat_scale: STAT_BAR_SCALE,
        }
    }
}

impl CatalogConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Page size used for slicing; never zero.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.max(1)
    }
}
