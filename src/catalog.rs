//! Pure catalog queries: facet derivation, filtering and pagination.
//!
//! Everything here is a function of its arguments. The reducer and the UI call
//! these with fresh inputs instead of keeping derived copies around.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::state::DetailRecord;

/// Search term, selected facets and page pointer.
///
/// Values are never edited in place: every interaction builds a new state, and
/// any change to the search term or facet selection lands back on page 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    pub facets: BTreeSet<String>,
    pub page: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            facets: BTreeSet::new(),
            page: 1,
        }
    }
}

impl FilterState {
    pub fn with_search(&self, search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            facets: self.facets.clone(),
            page: 1,
        }
    }

    pub fn with_facet_toggled(&self, facet: &str) -> Self {
        let mut facets = self.facets.clone();
        if !facets.remove(facet) {
            facets.insert(facet.to_string());
        }
        Self {
            search: self.search.clone(),
            facets,
            page: 1,
        }
    }

    pub fn with_facets_cleared(&self) -> Self {
        Self {
            search: self.search.clone(),
            facets: BTreeSet::new(),
            page: 1,
        }
    }

    pub fn with_page(&self, page: usize, total_pages: usize) -> Self {
        Self {
            page: clamp_page(page, total_pages),
            ..self.clone()
        }
    }

    /// Saturates at the last page.
    pub fn next_page(&self, total_pages: usize) -> Self {
        self.with_page(self.page.saturating_add(1), total_pages)
    }

    /// Saturates at page 1.
    pub fn prev_page(&self, total_pages: usize) -> Self {
        self.with_page(self.page.saturating_sub(1), total_pages)
    }

    pub fn is_selected(&self, facet: &str) -> bool {
        self.facets.contains(facet)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.search.is_empty() && self.facets.is_empty()
    }
}

/// Distinct types across the collection, in first-seen order.
pub fn derive_facets(records: &[DetailRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .flat_map(|record| record.types.iter())
        .filter(|type_name| seen.insert(type_name.as_str()))
        .cloned()
        .collect()
}

pub fn name_matches(record: &DetailRecord, search: &str) -> bool {
    search.is_empty() || record.name.to_lowercase().contains(&search.to_lowercase())
}

/// A record matches when it carries any of the selected facets.
pub fn facet_matches(record: &DetailRecord, facets: &BTreeSet<String>) -> bool {
    facets.is_empty() || record.types.iter().any(|type_name| facets.contains(type_name))
}

pub fn matches(record: &DetailRecord, filter: &FilterState) -> bool {
    name_matches(record, &filter.search) && facet_matches(record, &filter.facets)
}

pub fn filter_catalog<'a>(
    records: &'a [DetailRecord],
    filter: &FilterState,
) -> Vec<&'a DetailRecord> {
    records.iter().filter(|record| matches(record, filter)).collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The page actually sliced, after clamping.
    pub page: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// Clamps into `[1, max(1, total_pages)]`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(items.len(), page_size);
    let page = clamp_page(page, total_pages);
    let start = ((page - 1) * page_size).min(items.len());
    let end = (start + page_size).min(items.len());
    Page {
        items: items[start..end].to_vec(),
        page,
        total_pages,
    }
}
