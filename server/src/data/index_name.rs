//! Daily index naming
//!
//! Documents are bucketed into one index per document type per UTC day,
//! e.g. `zipkin:span-2017-08-11`.

use chrono::Datelike;

use crate::core::constants::{DEFAULT_DATE_SEPARATOR, DEFAULT_INDEX};
use crate::utils::time::millis_to_datetime;

/// Delimiter between index prefix and document type on clusters with mapping types
pub const LEGACY_TYPE_DELIMITER: char = ':';

/// Delimiter between index prefix and document type on typeless clusters
pub const TYPELESS_TYPE_DELIMITER: char = '-';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNameFormatter {
    index: String,
    date_separator: char,
    type_delimiter: char,
}

impl Default for IndexNameFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX, DEFAULT_DATE_SEPARATOR, LEGACY_TYPE_DELIMITER)
    }
}

impl IndexNameFormatter {
    pub fn new(index: impl Into<String>, date_separator: char, type_delimiter: char) -> Self {
        Self {
            index: index.into(),
            date_separator,
            type_delimiter,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Index name for `doc_type` on the UTC day containing `timestamp_millis`
    pub fn format_type_and_timestamp(&self, doc_type: &str, timestamp_millis: u64) -> String {
        let date = millis_to_datetime(timestamp_millis).date_naive();
        let sep = self.date_separator;

        format!(
            "{}{}{}-{:04}{}{:02}{}{:02}",
            self.index,
            self.type_delimiter,
            doc_type,
            date.year(),
            sep,
            date.month(),
            sep,
            date.day()
        )
    }
}
