//! Parsing of the `key=value;...` annotation column.

use std::collections::HashMap;

use crate::common::{parse_count, parse_f64};

use super::record::GenotypeCounts;

/// Lookup table built from one record's annotation string.
///
/// Values are kept as raw strings; numeric coercion happens at the point of
/// use and a failed coercion reads as "not available".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationMap {
    entries: HashMap<String, String>,
}

impl AnnotationMap {
    /// Parse a `;`-separated list of `key=value` pairs.
    ///
    /// Segments without `=` or with an empty key are skipped.  Keys and values
    /// are trimmed; a repeated key keeps the last value.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(';')
            .filter_map(|segment| segment.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self { entries }
    }

    /// Raw value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value for `key` as a finite real number.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(parse_f64)
    }

    /// Value for `key` as a non-negative integral count.
    pub fn get_count(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(parse_count)
    }

    /// Genotype counts from the three keys `(hom_ref, het, hom_alt)`.
    ///
    /// All three must be present and valid counts.
    pub fn get_genotype_counts(&self, keys: &[&str; 3]) -> Option<GenotypeCounts> {
        Some(GenotypeCounts {
            hom_ref: self.get_count(keys[0])?,
            het: self.get_count(keys[1])?,
            hom_alt: self.get_count(keys[2])?,
        })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
