//! Crawler module for harvesting paginated lists
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with bounded retry rounds
//! - HTML extraction of records and pagination links
//! - Randomized pacing between pages
//! - The per-source crawl state machine
//! - Overall harvest orchestration: crawl, merge, filter, write

mod controller;
mod delay;
mod fetcher;
mod parser;

pub use controller::{CrawlController, CrawlOptions, CrawlPhase, SourceOutcome};
pub use delay::DelayRange;
pub use fetcher::{
    build_http_client, AbortOnExhaustion, ContentFetcher, ExhaustionHandler, FetchError,
    HttpFetcher, RetryDecision,
};
pub use parser::{DoulistExtractor, ExtractedPage, RecordExtractor};

use crate::config::Config;
use crate::merge::MergeEngine;
use crate::output::{
    open_writer, FeedMeta, HarvestSummary, SegmentedWriter, SourceStatistics,
    FILTERED_FILE_NAME, MERGED_FILE_NAME,
};
use crate::storage::{open_cache_store, JsonCacheStore};
use crate::url::source_ids;
use crate::{HarvestError, Result};
use std::sync::Arc;

const MERGED_TITLE: &str = "多个豆瓣豆列合并（去重后全量）";
const MERGED_DESCRIPTION: &str = "从多个豆列抓取并合并的电影列表，已去重";
const FILTERED_TITLE: &str = "多个豆瓣豆列合并（按年份过滤）";

/// Runs every configured source, then merges and writes the combined output
pub struct Harvester<F, E> {
    config: Config,
    fetcher: F,
    extractor: E,
    store: JsonCacheStore,
    writer: SegmentedWriter,
    options: CrawlOptions,
}

impl Harvester<HttpFetcher, DoulistExtractor> {
    /// Creates a harvester fetching over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - Validated run configuration
    /// * `handler` - Consulted whenever a page exhausts its retry round
    pub fn from_config(config: Config, handler: Arc<dyn ExhaustionHandler>) -> Result<Self> {
        let fetcher = HttpFetcher::with_handler(&config.fetch, handler)?;
        Self::new(config, fetcher, DoulistExtractor)
    }
}

impl<F, E> Harvester<F, E>
where
    F: ContentFetcher,
    E: RecordExtractor,
{
    pub fn new(config: Config, fetcher: F, extractor: E) -> Result<Self> {
        let store = open_cache_store(&config.output, &config.cache);
        let writer = open_writer(&config.output, &config.cache)?;
        let options = CrawlOptions::from_config(&config);

        Ok(Self {
            config,
            fetcher,
            extractor,
            store,
            writer,
            options,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Crawls one source to completion
    pub async fn crawl_source(&self, source: &str) -> Result<SourceOutcome> {
        let mut controller = CrawlController::new(
            source,
            &self.fetcher,
            &self.extractor,
            &self.store,
            &self.writer,
            &self.options,
        );
        controller.run().await
    }

    /// Runs the full harvest
    ///
    /// Sources are crawled one after another in configured order. A source that
    /// fails aborts the run before any merged output is written; the caches of
    /// sources finished so far are kept.
    pub async fn run(&self) -> Result<HarvestSummary> {
        let output = &self.config.output;
        for root in [&output.output_root, &output.cache_root, &output.filtered_root] {
            std::fs::create_dir_all(root)?;
        }

        let sources = self.config.active_sources();
        let mut summary = HarvestSummary::new();
        let mut batches = Vec::with_capacity(sources.len());

        for (i, source) in sources.iter().enumerate() {
            tracing::info!("Source {}/{}: {}", i + 1, sources.len(), source);

            let outcome = match self.crawl_source(source).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let source_id = crate::url::source_id(source);
                    tracing::error!("Source {} failed: {}", source_id, e);
                    return Err(HarvestError::Source {
                        source_id,
                        message: e.to_string(),
                    });
                }
            };

            tracing::info!(
                "Source {} done: {} records ({} new)",
                outcome.source_id,
                outcome.records.len(),
                outcome.new_records
            );

            summary.sources.push(SourceStatistics {
                source_id: outcome.source_id,
                locator: outcome.locator,
                cached_records: outcome.cached_records,
                new_records: outcome.new_records,
                pages_fetched: outcome.pages_fetched,
            });
            batches.push(outcome.records);
        }

        let engine = MergeEngine::new(
            source_ids(&self.config.harvest.exclude),
            self.config.harvest.dedup_mode,
        );
        let report = engine.merge(batches);

        summary.raw_records = report.raw_count;
        summary.excluded_records = report.excluded_count;
        summary.duplicate_records = report.duplicate_count;
        summary.merged_records = report.records.len();

        let link = sources.join(";");
        let merged_target = output.output_root.join(MERGED_FILE_NAME);
        let merged_meta = FeedMeta::new(
            output.feed_title.as_deref().unwrap_or(MERGED_TITLE),
            link.as_str(),
            output.feed_description.as_deref().unwrap_or(MERGED_DESCRIPTION),
        );
        summary.merged_manifest = self.writer.write(&report.records, &merged_target, &merged_meta)?;
        summary.merged_target = Some(merged_target);

        let range = self.config.year_range();
        if range.is_active() {
            let filtered = range.apply(&report.records);
            tracing::info!("{} records left after year filter ({})", filtered.len(), range.describe());

            let filtered_target = output.filtered_root.join(FILTERED_FILE_NAME);
            let filtered_meta = FeedMeta::new(
                FILTERED_TITLE,
                link.as_str(),
                format!("（{}）", range.describe()),
            );
            summary.filtered_records = Some(filtered.len());
            summary.filtered_manifest = self.writer.write(&filtered, &filtered_target, &filtered_meta)?;
            summary.filtered_target = Some(filtered_target);
        }

        Ok(summary)
    }
}

/// Runs a complete harvest over HTTP
///
/// This is the main library entry point. It will:
/// 1. Create the output, cache and filtered roots
/// 2. Crawl every source, checkpointing each page
/// 3. Merge, exclude and deduplicate the per-source records
/// 4. Write the merged and (if a year bound is set) filtered chunk sets
///
/// A page whose retry round is exhausted aborts the harvest.
pub async fn run_harvest(config: Config) -> Result<HarvestSummary> {
    Harvester::from_config(config, Arc::new(AbortOnExhaustion))?
        .run()
        .await
}
