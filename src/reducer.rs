use tracing::debug;
use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::catalog::FilterState;
use crate::effect::Effect;
use crate::state::{AppState, LoadPhase};

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init | Action::CatalogReload => start_load(state),

        Action::ListingDidLoad {
            generation,
            entries,
        } => {
            if is_stale(state, generation) {
                return DispatchResult::unchanged();
            }
            state.phase = LoadPhase::Enriching {
                total: entries.len(),
            };
            DispatchResult::changed_with(Effect::EnrichCatalog {
                generation,
                entries,
            })
        }

        Action::ListingDidError { generation, error } => {
            if is_stale(state, generation) {
                return DispatchResult::unchanged();
            }
            state.phase = LoadPhase::Failed(error);
            state.records.clear();
            state.failed_entries.clear();
            state.selected = 0;
            DispatchResult::changed()
        }

        Action::CatalogDidLoad {
            generation,
            records,
            failed,
        } => {
            if is_stale(state, generation) {
                return DispatchResult::unchanged();
            }
            state.records = records;
            state.failed_entries = failed;
            state.phase = LoadPhase::Ready;
            state.filter = state
                .filter
                .with_page(state.filter.page, state.total_pages());
            let facet_count = state.facets().len();
            if state.facet_cursor >= facet_count {
                state.facet_cursor = 0;
            }
            clamp_selection(state);
            DispatchResult::changed_with_many(request_visible_stats(state))
        }

        // ===== Search =====
        Action::SearchStart => {
            if state.search_active {
                return DispatchResult::unchanged();
            }
            state.search_active = true;
            DispatchResult::changed()
        }

        Action::SearchSubmit => {
            if !state.search_active {
                return DispatchResult::unchanged();
            }
            state.search_active = false;
            DispatchResult::changed()
        }

        Action::SearchCancel => {
            state.search_active = false;
            if state.filter.search.is_empty() {
                return DispatchResult::changed();
            }
            set_search(state, String::new())
        }

        Action::SearchInput(ch) => {
            let mut search = state.filter.search.clone();
            search.push(ch);
            set_search(state, search)
        }

        Action::SearchBackspace => {
            let mut search = state.filter.search.clone();
            if search.pop().is_none() {
                return DispatchResult::unchanged();
            }
            set_search(state, search)
        }

        // ===== Facets =====
        Action::FacetCursorNext => move_facet_cursor(state, 1),
        Action::FacetCursorPrev => move_facet_cursor(state, -1),

        Action::FacetToggle => {
            let Some(facet) = state.cursor_facet() else {
                return DispatchResult::unchanged();
            };
            state.filter = state.filter.with_facet_toggled(&facet);
            filter_changed(state)
        }

        Action::FacetClear => {
            if state.filter.facets.is_empty() {
                return DispatchResult::unchanged();
            }
            state.filter = state.filter.with_facets_cleared();
            filter_changed(state)
        }

        // ===== Paging & selection =====
        Action::PageNext => {
            let next = state.filter.next_page(state.total_pages());
            change_page(state, next)
        }

        Action::PagePrev => {
            let prev = state.filter.prev_page(state.total_pages());
            change_page(state, prev)
        }

        Action::SelectionMove(delta) => {
            let len = state.current_page().items.len();
            if len == 0 {
                return DispatchResult::unchanged();
            }
            let next = (state.selected as i64 + delta as i64).clamp(0, len as i64 - 1) as usize;
            if next == state.selected {
                return DispatchResult::unchanged();
            }
            state.selected = next;
            DispatchResult::changed()
        }

        Action::CardSelect(index) => {
            if index >= state.current_page().items.len() || index == state.selected {
                return DispatchResult::unchanged();
            }
            state.selected = index;
            DispatchResult::changed()
        }

        // ===== Stats =====
        Action::StatsDidLoad { id, stats } => {
            state.stats.complete(id, stats);
            DispatchResult::changed()
        }

        Action::StatsDidError { id, error } => {
            state.stats.fail(id, error);
            DispatchResult::changed()
        }

        // ===== Global =====
        Action::UiTerminalResize(width, height) => {
            if state.terminal_size == (width, height) {
                return DispatchResult::unchanged();
            }
            state.terminal_size = (width, height);
            DispatchResult::changed()
        }

        Action::Tick => {
            if !state.is_loading() && state.stats.in_flight() == 0 {
                return DispatchResult::unchanged();
            }
            state.tick = state.tick.wrapping_add(1);
            DispatchResult::changed()
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn start_load(state: &mut AppState) -> DispatchResult<Effect> {
    state.generation = state.generation.wrapping_add(1);
    state.phase = LoadPhase::Listing;
    state.message = None;
    state.tick = 0;
    DispatchResult::changed_with(Effect::LoadListing {
        generation: state.generation,
        limit: state.config.catalog_limit,
    })
}

fn is_stale(state: &AppState, generation: u64) -> bool {
    if generation == state.generation {
        return false;
    }
    debug!(
        generation,
        current = state.generation,
        "discarding result from superseded load"
    );
    true
}

fn set_search(state: &mut AppState, search: String) -> DispatchResult<Effect> {
    state.filter = state.filter.with_search(search);
    filter_changed(state)
}

fn filter_changed(state: &mut AppState) -> DispatchResult<Effect> {
    state.selected = 0;
    DispatchResult::changed_with_many(request_visible_stats(state))
}

fn change_page(state: &mut AppState, next: FilterState) -> DispatchResult<Effect> {
    if next == state.filter {
        return DispatchResult::unchanged();
    }
    state.filter = next;
    state.selected = 0;
    DispatchResult::changed_with_many(request_visible_stats(state))
}

fn move_facet_cursor(state: &mut AppState, step: i64) -> DispatchResult<Effect> {
    let len = state.facets().len() as i64;
    if len == 0 {
        return DispatchResult::unchanged();
    }
    let next = (state.facet_cursor as i64 + step).rem_euclid(len) as usize;
    if next == state.facet_cursor {
        return DispatchResult::unchanged();
    }
    state.facet_cursor = next;
    DispatchResult::changed()
}

fn clamp_selection(state: &mut AppState) {
    let len = state.current_page().items.len();
    state.selected = state.selected.min(len.saturating_sub(1));
}

/// Stats requests for visible cards that have none cached or in flight.
fn request_visible_stats(state: &mut AppState) -> Vec<Effect> {
    let ids: Vec<u32> = state
        .current_page()
        .items
        .iter()
        .map(|record| record.id)
        .collect();
    ids.into_iter()
        .filter(|id| state.stats.begin(*id))
        .map(|id| Effect::LoadStats { id })
        .collect()
}
