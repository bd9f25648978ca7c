//! Listening-history analysis over exported `endsong_<N>.json` files.
//!
//! Load once with [`loader::load_table`], then pass the resulting
//! [`HistoryTable`] to the pure functions in [`filter`], [`stats`] and
//! [`devices`].

pub mod app;
pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod report;
pub mod stats;
pub mod table;
pub mod ui;

pub use error::{HistoryError, Result};
pub use model::PlayEvent;
pub use table::HistoryTable;
