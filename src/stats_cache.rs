//! Per-record stats, keyed by record id.
//!
//! A record's stats are requested at most once while a request is in flight
//! or after it has landed. Failed lookups may be requested again.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tui_dispatch::DataResource;

use crate::state::StatEntry;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsCache {
    entries: HashMap<u32, DataResource<Vec<StatEntry>>>,
}

impl StatsCache {
    /// Marks `id` as loading and returns whether a fetch should be issued.
    pub fn begin(&mut self, id: u32) -> bool {
        match self.entries.get(&id) {
            Some(DataResource::Loading) | Some(DataResource::Loaded(_)) => false,
            _ => {
                self.entries.insert(id, DataResource::Loading);
                true
            }
        }
    }

    pub fn complete(&mut self, id: u32, stats: Vec<StatEntry>) {
        self.entries.insert(id, DataResource::Loaded(stats));
    }

    pub fn fail(&mut self, id: u32, error: String) {
        self.entries.insert(id, DataResource::Failed(error));
    }

    pub fn get(&self, id: u32) -> Option<&DataResource<Vec<StatEntry>>> {
        self.entries.get(&id)
    }

    pub fn stats(&self, id: u32) -> Option<&[StatEntry]> {
        self.entries
            .get(&id)
            .and_then(|entry| entry.data())
            .map(Vec::as_slice)
    }

    pub fn is_loading(&self, id: u32) -> bool {
        matches!(self.entries.get(&id), Some(DataResource::Loading))
    }

    pub fn in_flight(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.is_loading())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
