//! # relaygrid-io: Network Import
//!
//! Turns case files into [`relaygrid_core::Network`] graphs and ships the
//! IEEE 14-bus reference system.
//!
//! ```rust
//! use relaygrid_io::ieee14::case14;
//!
//! let network = case14();
//! assert_eq!(network.stats().num_buses, 14);
//! ```
//!
//! Case files are plain records (see [`case::CaseFile`]) in JSON, YAML or
//! TOML. Import never panics on bad records: they are skipped and listed in
//! [`ImportResult::diagnostics`], and callers decide whether errors there
//! are fatal.

pub mod case;
pub mod ieee14;

pub use case::{load_case, parse_case, CaseFile, CaseFormat, ImportResult};
