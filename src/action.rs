use serde::{Deserialize, Serialize};

use crate::state::{DetailRecord, IndexEntry, StatEntry};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[action(infer_categories)]
pub enum Action {
    Init,
    CatalogReload,

    ListingDidLoad {
        generation: u64,
        entries: Vec<IndexEntry>,
    },
    ListingDidError {
        generation: u64,
        error: String,
    },
    CatalogDidLoad {
        generation: u64,
        records: Vec<DetailRecord>,
        failed: Vec<String>,
    },

    SearchStart,
    SearchCancel,
    SearchSubmit,
    SearchInput(char),
    SearchBackspace,

    FacetCursorNext,
    FacetCursorPrev,
    FacetToggle,
    FacetClear,

    PageNext,
    PagePrev,
    SelectionMove(i16),
    CardSelect(usize),

    StatsDidLoad { id: u32, stats: Vec<StatEntry> },
    StatsDidError { id: u32, error: String },

    UiTerminalResize(u16, u16),
    Tick,
    Quit,
}
