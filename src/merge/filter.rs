use crate::record::Record;

/// Inclusive year bounds, each optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl YearRange {
    pub fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// True when at least one bound is configured
    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// Whether a record survives the filter
    ///
    /// Records without a numeric year never match an active range.
    pub fn contains(&self, record: &Record) -> bool {
        let Some(year) = record.numeric_year() else {
            return false;
        };

        self.min.map_or(true, |min| year >= min) && self.max.map_or(true, |max| year <= max)
    }

    /// Keeps the records inside the range, in order
    ///
    /// An inactive range returns the input unchanged.
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        if !self.is_active() {
            return records.to_vec();
        }

        records
            .iter()
            .filter(|record| self.contains(record))
            .cloned()
            .collect()
    }

    /// Human-readable bounds for feed descriptions, e.g. `年份 >= 2000，年份 <= 2010`
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(min) = self.min {
            parts.push(format!("年份 >= {}", min));
        }
        if let Some(max) = self.max {
            parts.push(format!("年份 <= {}", max));
        }

        if parts.is_empty() {
            "无年份过滤".to_string()
        } else {
            parts.join("，")
        }
    }
}
