use crate::merge::{DedupMode, YearRange};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Doulist-Harvester
///
/// This is the fully resolved run configuration; nothing in the library asks
/// the user for parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub delay: DelayConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Year bounds used for the filtered output
    pub fn year_range(&self) -> YearRange {
        YearRange::new(self.harvest.min_year, self.harvest.max_year)
    }

    /// Source locators with blank entries removed, in configured order
    pub fn active_sources(&self) -> Vec<String> {
        self.harvest
            .sources
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Which lists to harvest and how to combine them
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarvestConfig {
    /// List locators, harvested in this order
    #[serde(default)]
    pub sources: Vec<String>,

    /// Locators whose records are dropped at merge time
    #[serde(default)]
    pub exclude: Vec<String>,

    /// 1-based page to resume every source from
    #[serde(default = "default_start_page")]
    pub start_page: u32,

    #[serde(default)]
    pub dedup_mode: DedupMode,

    /// Inclusive lower bound for the filtered output
    #[serde(default)]
    pub min_year: Option<u32>,

    /// Inclusive upper bound for the filtered output
    #[serde(default)]
    pub max_year: Option<u32>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            exclude: Vec::new(),
            start_page: default_start_page(),
            dedup_mode: DedupMode::default(),
            min_year: None,
            max_year: None,
        }
    }
}

/// Output locations and chunking
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root for merged output and per-source progress feeds
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Root for per-source cache files
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    /// Root for the year-filtered merged output
    #[serde(default = "default_filtered_root")]
    pub filtered_root: PathBuf,

    /// Maximum number of items per output document
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default)]
    pub feed_title: Option<String>,

    #[serde(default)]
    pub feed_description: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            cache_root: default_cache_root(),
            filtered_root: default_filtered_root(),
            chunk_size: default_chunk_size(),
            feed_title: None,
            feed_description: None,
        }
    }
}

/// Randomized pause between two page fetches of the same source
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DelayConfig {
    #[serde(default = "default_delay_min")]
    pub min_secs: u64,

    #[serde(default = "default_delay_max")]
    pub max_secs: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_secs: default_delay_min(),
            max_secs: default_delay_max(),
        }
    }
}

/// HTTP fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Attempts per round before the exhaustion handler is consulted
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Raw `Cookie` header, copied from a browser session
    #[serde(default)]
    pub cookie: Option<String>,
}

impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_delay_secs: default_retry_delay(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            cookie: None,
        }
    }
}

/// Cache persistence behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Guard every cache save with an exclusive lock file
    #[serde(default)]
    pub lock: bool,

    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,

    #[serde(default = "default_lock_poll")]
    pub lock_poll_ms: u64,

    /// Surface corrupt cache files as errors instead of starting empty
    #[serde(default)]
    pub strict: bool,

    /// Timestamped backups retained per file
    #[serde(default = "default_keep_backups")]
    pub keep_backups: usize,
}

impl CacheConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn lock_poll(&self) -> Duration {
        Duration::from_millis(self.lock_poll_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lock: false,
            lock_timeout_secs: default_lock_timeout(),
            lock_poll_ms: default_lock_poll(),
            strict: false,
            keep_backups: default_keep_backups(),
        }
    }
}

fn default_start_page() -> u32 {
    1
}

fn default_output_root() -> PathBuf {
    PathBuf::from("rss_files")
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("cache_doulist")
}

fn default_filtered_root() -> PathBuf {
    PathBuf::from("rss_filtered")
}

fn default_chunk_size() -> usize {
    500
}

fn default_delay_min() -> u64 {
    5
}

fn default_delay_max() -> u64 {
    10
}

fn default_retries() -> u32 {
    10
}

fn default_retry_delay() -> u64 {
    10
}

fn default_timeout() -> u64 {
    20
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
        .to_string()
}

fn default_lock_timeout() -> u64 {
    30
}

fn default_lock_poll() -> u64 {
    100
}

fn default_keep_backups() -> usize {
    5
}
