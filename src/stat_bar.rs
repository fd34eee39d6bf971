//! Discrete stat bars: a base stat becomes a row of filled and empty slots.

use crate::config::{STAT_BAR_SCALE, STAT_BAR_SLOTS};

pub const FILLED_GLYPH: char = '█';
pub const EMPTY_GLYPH: char = '░';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Filled,
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatBar {
    pub filled: u16,
    pub empty: u16,
}

impl StatBar {
    /// `round(value * slots / scale)` clamped to `slots`, rounding halves up.
    pub fn encode(base_value: u16, slots: u16, scale: u16) -> Self {
        let scale = u64::from(scale.max(1));
        let slots64 = u64::from(slots);
        let scaled = (2 * u64::from(base_value) * slots64 + scale) / (2 * scale);
        let filled = scaled.min(slots64) as u16;
        Self {
            filled,
            empty: slots - filled,
        }
    }

    pub fn len(&self) -> u16 {
        self.filled + self.empty
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Filled slots first, then empty ones.
    pub fn slots(&self) -> impl Iterator<Item = Slot> {
        std::iter::repeat(Slot::Filled)
            .take(self.filled as usize)
            .chain(std::iter::repeat(Slot::Empty).take(self.empty as usize))
    }

    pub fn render(&self) -> (String, String) {
        (
            FILLED_GLYPH.to_string().repeat(self.filled as usize),
            EMPTY_GLYPH.to_string().repeat(self.empty as usize),
        )
    }
}

/// Encodes with the default slot count and scale.
pub fn encode(base_value: u16) -> StatBar {
    StatBar::encode(base_value, STAT_BAR_SLOTS, STAT_BAR_SCALE)
}

pub fn stat_label(name: &str) -> String {
    match name {
        "hp" => "HP".to_string(),
        "special-attack" => "Sp. Atk".to_string(),
        "special-defense" => "Sp. Def".to_string(),
        _ => capitalize(name),
    }
}

pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
