use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Field combination that decides whether two records are the same entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// `(title, year)`
    #[default]
    TitleYear,

    /// `(title, link)`
    TitleLink,

    /// `link` alone
    Link,
}

/// Identity of a record under a given mode, built from trimmed fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    TitleYear(String, String),
    TitleLink(String, String),
    Link(String),
}

impl DedupMode {
    pub fn key(&self, record: &Record) -> DedupKey {
        let title = record.title.trim().to_string();
        match self {
            Self::TitleYear => DedupKey::TitleYear(title, record.year.trim().to_string()),
            Self::TitleLink => DedupKey::TitleLink(title, record.link.trim().to_string()),
            Self::Link => DedupKey::Link(record.link.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TitleYear => "title_year",
            Self::TitleLink => "title_link",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for DedupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DedupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "title_year" => Ok(Self::TitleYear),
            "title_link" => Ok(Self::TitleLink),
            "link" => Ok(Self::Link),
            other => Err(format!(
                "unknown dedup mode '{}' (expected title_year, title_link or link)",
                other
            )),
        }
    }
}

/// Drops every record whose key was already seen, keeping the first occurrence
///
/// Input order is preserved for the surviving records.
pub fn deduplicate(records: Vec<Record>, mode: DedupMode) -> Vec<Record> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(mode.key(record)))
        .collect()
}
