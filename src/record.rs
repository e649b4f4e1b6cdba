//! Harvested record model
//!
//! A `Record` is one entry of a list page. Records are created by the extractor,
//! tagged with their source id during accumulation, and never edited after being
//! appended to a cache.

use serde::{Deserialize, Serialize};

/// One harvested list entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Entry title as shown on the list page
    pub title: String,

    /// Entry link; closest thing to an identity, but never validated
    pub link: String,

    /// Release year as scraped; may be empty or non-numeric
    #[serde(default)]
    pub year: String,

    #[serde(default)]
    pub director: String,

    #[serde(default)]
    pub cast: String,

    #[serde(default)]
    pub genre: String,

    #[serde(default)]
    pub country: String,

    /// Id of the source list this record was harvested from
    ///
    /// Empty until the crawl controller tags the record.
    #[serde(default)]
    pub source: String,
}

impl Record {
    /// Creates a record with only the identity-bearing fields set
    pub fn new(title: impl Into<String>, link: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            year: year.into(),
            ..Self::default()
        }
    }

    /// Returns the same record tagged with the given source id
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Parses the year as a non-negative integer
    ///
    /// Only plain ASCII digits (after trimming) are accepted; anything else,
    /// including an empty string, yields `None`.
    pub fn numeric_year(&self) -> Option<u32> {
        let year = self.year.trim();
        if year.is_empty() || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        year.parse().ok()
    }

    /// Title suffixed with the year when one is known, e.g. `Yi Yi (2000)`
    pub fn display_title(&self) -> String {
        let title = self.title.trim();
        let year = self.year.trim();
        if year.is_empty() {
            title.to_string()
        } else {
            format!("{} ({})", title, year)
        }
    }

    /// Pipe-joined summary of the non-empty descriptive attributes
    pub fn description(&self) -> String {
        let parts = [
            ("导演", &self.director),
            ("主演", &self.cast),
            ("类型", &self.genre),
            ("制片国家/地区", &self.country),
            ("年份", &self.year),
        ];

        parts
            .iter()
            .filter_map(|(label, value)| {
                let value = value.trim();
                (!value.is_empty()).then(|| format!("{}: {}", label, value))
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
