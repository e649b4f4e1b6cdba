//! Harvest statistics
//!
//! This module collects the per-source and merge counts of one harvest run and
//! prints them once the run is over.

use crate::output::segmented::Manifest;
use std::path::PathBuf;

/// Counts for one harvested source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStatistics {
    pub source_id: String,
    pub locator: String,

    /// Records already in the cache before this run
    pub cached_records: usize,

    /// Records appended during this run
    pub new_records: usize,

    /// Pages fetched during this run, including the terminating one
    pub pages_fetched: usize,
}

impl SourceStatistics {
    pub fn total_records(&self) -> usize {
        self.cached_records + self.new_records
    }
}

/// Statistics for a complete harvest run
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    pub sources: Vec<SourceStatistics>,

    /// Records across all sources before exclusion and dedup
    pub raw_records: usize,
    pub excluded_records: usize,
    pub duplicate_records: usize,
    pub merged_records: usize,

    /// Records surviving the year filter; None when no bound was configured
    pub filtered_records: Option<usize>,

    pub merged_target: Option<PathBuf>,
    pub merged_manifest: Option<Manifest>,
    pub filtered_target: Option<PathBuf>,
    pub filtered_manifest: Option<Manifest>,
}

impl HarvestSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_new_records(&self) -> usize {
        self.sources.iter().map(|s| s.new_records).sum()
    }

    pub fn total_pages(&self) -> usize {
        self.sources.iter().map(|s| s.pages_fetched).sum()
    }

    /// Share of raw records removed as duplicates, as a percentage
    pub fn duplicate_rate(&self) -> f64 {
        let considered = self.raw_records.saturating_sub(self.excluded_records);
        if considered == 0 {
            return 0.0;
        }
        (self.duplicate_records as f64 / considered as f64) * 100.0
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &HarvestSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Sources ({}):", summary.sources.len());
    for source in &summary.sources {
        println!(
            "  - {}: {} records ({} cached, {} new) from {} page(s)",
            source.source_id,
            source.total_records(),
            source.cached_records,
            source.new_records,
            source.pages_fetched
        );
    }
    println!();

    println!("Merge:");
    println!("  Raw records: {}", summary.raw_records);
    println!("  Excluded: {}", summary.excluded_records);
    println!(
        "  Duplicates: {} ({:.1}%)",
        summary.duplicate_records,
        summary.duplicate_rate()
    );
    println!("  Merged: {}", summary.merged_records);
    if let Some(filtered) = summary.filtered_records {
        println!("  After year filter: {}", filtered);
    }
    println!();

    print_output("Merged output", &summary.merged_target, &summary.merged_manifest);
    if summary.filtered_records.is_some() {
        print_output(
            "Filtered output",
            &summary.filtered_target,
            &summary.filtered_manifest,
        );
    }
}

fn print_output(label: &str, target: &Option<PathBuf>, manifest: &Option<Manifest>) {
    match (target, manifest) {
        (Some(target), Some(manifest)) => {
            println!("{}: {} ({} chunk(s))", label, target.display(), manifest.chunks.len());
            for chunk in &manifest.chunks {
                println!(
                    "  - {} items {}-{}",
                    chunk.file, chunk.start_item, chunk.end_item
                );
            }
        }
        _ => println!("{}: nothing written (no records)", label),
    }
}
