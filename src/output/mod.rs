//! Output module for generating harvest documents
//!
//! This module handles:
//! - Encoding record sets as RSS 2.0 documents
//! - Splitting record sets into bounded chunks with a manifest
//! - Recording and printing harvest statistics

mod rss;
mod segmented;
pub mod stats;
mod traits;

pub use rss::{escape_xml, year_to_pub_date, RssEncoder, DEFAULT_FEED_DESCRIPTION, DEFAULT_FEED_TITLE};
pub use segmented::{
    chunk_path, chunk_plan, manifest_path, read_manifest, ChunkSpan, Manifest, ManifestChunk,
    SegmentedWriter,
};
pub use stats::{print_summary, HarvestSummary, SourceStatistics};
pub use traits::{DocumentEncoder, FeedMeta, OutputError, OutputResult};

use crate::config::{CacheConfig, OutputConfig};
use crate::storage::WriteOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the merged, deduplicated output under the output root
pub const MERGED_FILE_NAME: &str = "merged_all_doulists.xml";

/// File name of the year-filtered output under the filtered root
pub const FILTERED_FILE_NAME: &str = "merged_filtered.xml";

/// Builds the RSS chunk writer described by the configuration
pub fn open_writer(output: &OutputConfig, cache: &CacheConfig) -> OutputResult<SegmentedWriter> {
    SegmentedWriter::with_options(
        Arc::new(RssEncoder),
        output.chunk_size,
        WriteOptions::for_output(cache.keep_backups),
    )
}

/// Target of the live progress feed of one source: `<root>/<id>/doulist_<id>_progress.xml`
pub fn progress_target(output_root: &Path, source_id: &str) -> PathBuf {
    output_root
        .join(source_id)
        .join(format!("doulist_{}_progress.xml", source_id))
}
