//! Output module for reporting on the price database
//!
//! Backs the `--stats` mode of the binary.

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, CatalogStatistics};
