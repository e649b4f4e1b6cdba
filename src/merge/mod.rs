//! Merge module for combining per-source harvests
//!
//! This module turns the record sequences of several sources into one merged
//! result:
//! - Concatenation in source order
//! - Source exclusion by source id
//! - First-occurrence-wins deduplication
//! - Optional year-range filtering
//!
//! The merged result is never persisted as state of its own; it is rebuilt from
//! the caches on every run.

mod dedup;
mod filter;

pub use dedup::{deduplicate, DedupKey, DedupMode};
pub use filter::YearRange;

use crate::record::Record;
use std::collections::HashSet;

/// Outcome of a merge, with the counts dropped at each step
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// Merged, deduplicated records in source-then-discovery order
    pub records: Vec<Record>,

    /// Records across all sources before exclusion
    pub raw_count: usize,

    /// Records dropped because their source was excluded
    pub excluded_count: usize,

    /// Records dropped as duplicates
    pub duplicate_count: usize,
}

/// Removes every record tagged with one of the excluded source ids
pub fn exclude_sources(records: Vec<Record>, excluded: &HashSet<String>) -> Vec<Record> {
    if excluded.is_empty() {
        return records;
    }

    records
        .into_iter()
        .filter(|record| !excluded.contains(&record.source))
        .collect()
}

/// Combines per-source record batches into one deduplicated sequence
#[derive(Debug, Clone)]
pub struct MergeEngine {
    excluded: HashSet<String>,
    mode: DedupMode,
}

impl MergeEngine {
    /// Creates an engine excluding the given source ids
    pub fn new(excluded: HashSet<String>, mode: DedupMode) -> Self {
        Self { excluded, mode }
    }

    pub fn mode(&self) -> DedupMode {
        self.mode
    }

    /// Merges batches in the order given
    ///
    /// Batch order is significant: when two sources share a record, the copy
    /// from the earlier batch is the one kept.
    pub fn merge<I>(&self, batches: I) -> MergeReport
    where
        I: IntoIterator<Item = Vec<Record>>,
    {
        let combined: Vec<Record> = batches.into_iter().flatten().collect();
        let raw_count = combined.len();

        let kept = exclude_sources(combined, &self.excluded);
        let excluded_count = raw_count - kept.len();

        let before_dedup = kept.len();
        let records = deduplicate(kept, self.mode);
        let duplicate_count = before_dedup - records.len();

        tracing::info!(
            "Merged {} records: {} excluded, {} duplicates ({}), {} kept",
            raw_count,
            excluded_count,
            duplicate_count,
            self.mode,
            records.len()
        );

        MergeReport {
            records,
            raw_count,
            excluded_count,
            duplicate_count,
        }
    }
}
