//! Snapshot acquisition with a time-boxed cache.

use std::time::{Duration, Instant};

use polars::prelude::DataFrame;

use crate::error::TrialError;

/// How long a fetched snapshot stays fresh unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Anything that can deliver a raw snapshot of the pre-joined trial view.
pub trait RecordSource {
    fn fetch(&self) -> Result<DataFrame, TrialError>;
}

/// Single-slot cache around a `RecordSource`.
///
/// `load` returns the cached snapshot while it is younger than the TTL and
/// refetches otherwise. `invalidate` drops the slot so the next `load`
/// refetches regardless of age.
pub struct CachedSource<S> {
    source: S,
    ttl: Duration,
    slot: Option<(Instant, DataFrame)>,
}

impl<S: RecordSource> CachedSource<S> {
    pub fn new(source: S) -> Self {
        Self::with_ttl(source, DEFAULT_TTL)
    }

    pub fn with_ttl(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: None,
        }
    }

    pub fn load(&mut self) -> Result<DataFrame, TrialError> {
        if let Some((fetched_at, df)) = &self.slot {
            if fetched_at.elapsed() < self.ttl {
                tracing::debug!(rows = df.height(), "serving cached snapshot");
                return Ok(df.clone());
            }
        }
        tracing::info!("fetching trial snapshot from source");
        let df = self.source.fetch()?;
        self.slot = Some((Instant::now(), df.clone()));
        Ok(df)
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}
