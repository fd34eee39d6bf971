//! dexgrid - creature catalog browser
//!
//! The library holds the fetch pipeline, the pure catalog queries and the
//! tui-dispatch store; the binary wires them to a terminal.

pub mod action;
pub mod api;
pub mod catalog;
pub mod config;
pub mod effect;
pub mod error;
pub mod reducer;
pub mod stat_bar;
pub mod state;
pub mod stats_cache;
pub mod ui;
