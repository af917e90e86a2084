//! Observer implementations for presenting benchmark runs.
//!
//! - [`table`] - Pretty-print run comparisons as tables using the `tabled` crate
//! - [`json`] - Serialize runs to JSON format
//!
//! # Feature Flags
//!
//! - `table` - Enables the [`table`] module
//! - `json` - Enables the [`json`] module
//! - `full` - Enables all observer modules

mod error;

pub use error::{ObserverError, Result};

#[cfg(feature = "table")]
pub mod table;

#[cfg(feature = "json")]
pub mod json;
