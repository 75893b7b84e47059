//! Data backbone for the field-trial dashboard.
//!
//! The crate takes raw snapshots of the pre-joined trial view, normalizes
//! them, appends every derived column (status, material category, adoption
//! tier, area bands, season labels) and serves the filtered aggregations the
//! dashboard renders. It owns no I/O beyond the `RecordSource` seam and no
//! presentation.

pub mod aggregate;
pub mod config;
pub mod derive;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod performance;
pub mod schema;
pub mod source;

#[cfg(test)]
mod testkit;

pub use aggregate::{kpis, KpiSnapshot};
pub use config::EngineConfig;
pub use derive::enrich;
pub use error::TrialError;
pub use filter::{Dimension, FilterSelection};
pub use source::{CachedSource, RecordSource};
