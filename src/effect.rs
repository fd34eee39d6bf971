use crate::state::IndexEntry;

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    LoadListing { generation: u64, limit: usize },
    EnrichCatalog { generation: u64, entries: Vec<IndexEntry> },
    LoadStats { id: u32 },
}
