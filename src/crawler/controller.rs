//! Per-source crawl controller
//!
//! Drives one source from its start page to the last page, strictly in series.
//! Every page that yields records is checkpointed to the cache before the next
//! one is requested, so a crash loses at most the page in flight.

use crate::config::Config;
use crate::crawler::delay::DelayRange;
use crate::crawler::fetcher::ContentFetcher;
use crate::crawler::parser::{ExtractedPage, RecordExtractor};
use crate::output::{progress_target, FeedMeta, SegmentedWriter};
use crate::record::Record;
use crate::storage::CacheStore;
use crate::url::{page_locator, source_id};
use crate::Result;
use std::fmt;
use std::path::PathBuf;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Current step of a source crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// Source id derived; the cache is loaded when `run` starts
    Primed,
    Fetching,
    Extracting,
    Accumulating,
    Persisting,
    Advancing,
    Done,
}

impl CrawlPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlPhase::Done)
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrawlPhase::Primed => "primed",
            CrawlPhase::Fetching => "fetching",
            CrawlPhase::Extracting => "extracting",
            CrawlPhase::Accumulating => "accumulating",
            CrawlPhase::Persisting => "persisting",
            CrawlPhase::Advancing => "advancing",
            CrawlPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Run parameters shared by every source of a harvest
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// 1-based page every source resumes from
    pub start_page: u32,
    pub delay: DelayRange,

    /// Fail on an unreadable cache instead of starting from nothing
    pub strict_cache: bool,

    /// Root under which progress feeds are written
    pub output_root: PathBuf,
}

impl CrawlOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            start_page: config.harvest.start_page,
            delay: DelayRange::from(&config.delay),
            strict_cache: config.cache.strict,
            output_root: config.output.output_root.clone(),
        }
    }
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of crawling one source to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source_id: String,
    pub locator: String,

    /// Cached records followed by every record found in this run
    pub records: Vec<Record>,

    pub pages_fetched: usize,
    pub new_records: usize,
    pub cached_records: usize,
}

/// State machine crawling a single source
pub struct CrawlController<'a, F, E> {
    source: String,
    source_id: String,
    fetcher: &'a F,
    extractor: &'a E,
    store: &'a dyn CacheStore,
    writer: &'a SegmentedWriter,
    options: &'a CrawlOptions,
    phase: CrawlPhase,
}

impl<'a, F, E> CrawlController<'a, F, E>
where
    F: ContentFetcher,
    E: RecordExtractor,
{
    pub fn new(
        source: impl Into<String>,
        fetcher: &'a F,
        extractor: &'a E,
        store: &'a dyn CacheStore,
        writer: &'a SegmentedWriter,
        options: &'a CrawlOptions,
    ) -> Self {
        let source = source.into();
        let source_id = source_id(&source);

        Self {
            source,
            source_id,
            fetcher,
            extractor,
            store,
            writer,
            options,
            phase: CrawlPhase::Primed,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Crawls the source until a page is empty or has no next link
    ///
    /// # Returns
    ///
    /// * `Ok(SourceOutcome)` - The source reached its last page
    /// * `Err(HarvestError)` - A fetch was given up on, or a cache save failed;
    ///   nothing is saved for this source after the failure
    pub async fn run(&mut self) -> Result<SourceOutcome> {
        let mut records = if self.options.strict_cache {
            self.store.load_strict(&self.source_id)?
        } else {
            self.store.load(&self.source_id)
        };
        // Everything in this cache belongs to this source
        for record in &mut records {
            if record.source != self.source_id {
                record.source = self.source_id.clone();
            }
        }
        let cached_records = records.len();
        let mut locator = page_locator(&self.source, self.options.start_page)?;
        let mut page = self.options.start_page;
        let mut pages_fetched = 0;

        tracing::info!(
            "Crawling source {} from page {} ({} cached records)",
            self.source_id,
            page,
            cached_records
        );

        loop {
            self.transition(CrawlPhase::Fetching);
            tracing::info!("Fetching page {} of {}: {}", page, self.source_id, locator);
            let content = self.fetcher.fetch(&locator).await?;
            pages_fetched += 1;

            self.transition(CrawlPhase::Extracting);
            let ExtractedPage { records: found, next } = self.extractor.extract(&content, &locator);
            if found.is_empty() {
                tracing::info!("Page {} of {} has no records, stopping", page, self.source_id);
                break;
            }

            self.transition(CrawlPhase::Accumulating);
            let found_count = found.len();
            records.extend(found.into_iter().map(|r| r.with_source(&self.source_id)));
            tracing::info!(
                "Page {} of {}: {} records ({} total)",
                page,
                self.source_id,
                found_count,
                records.len()
            );

            self.transition(CrawlPhase::Persisting);
            self.save_checkpoint(&records)?;
            self.write_progress(&records);

            self.transition(CrawlPhase::Advancing);
            let Some(next) = next else {
                tracing::info!("No next page after page {} of {}", page, self.source_id);
                break;
            };

            let pause = self.options.delay.sample();
            tracing::debug!("Sleeping {:?} before page {}", pause, page + 1);
            tokio::time::sleep(pause).await;

            locator = next;
            page += 1;
        }

        self.transition(CrawlPhase::Done);

        Ok(SourceOutcome {
            source_id: self.source_id.clone(),
            locator: self.source.clone(),
            new_records: records.len() - cached_records,
            records,
            pages_fetched,
            cached_records,
        })
    }

    /// Saves the cache; a locked save may sleep while polling, so on a
    /// multi-threaded runtime it runs via `block_in_place`
    fn save_checkpoint(&self, records: &[Record]) -> Result<()> {
        let save = || self.store.save(&self.source_id, records);
        let saved = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(save)
            }
            _ => save(),
        };
        Ok(saved?)
    }

    fn transition(&mut self, next: CrawlPhase) {
        tracing::trace!("Source {}: {} -> {}", self.source_id, self.phase, next);
        self.phase = next;
    }

    /// Regenerates the live progress feed; failures are logged only
    fn write_progress(&self, records: &[Record]) {
        let target = progress_target(&self.options.output_root, &self.source_id);
        let meta = FeedMeta::new(
            format!("豆瓣豆列 {} 实时进度", self.source_id),
            self.source.as_str(),
            format!("豆列 {} 抓取进度 RSS（未去重、未过滤）", self.source),
        );

        if let Err(e) = self.writer.write(records, &target, &meta) {
            tracing::warn!(
                "Failed to write progress feed {}: {}",
                target.display(),
                e
            );
        }
    }
}
