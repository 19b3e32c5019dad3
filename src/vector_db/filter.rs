use super::StoredMetadata;
use crate::error::ValidationError;
use crate::types::ATTRIBUTE_KEYS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stored fields that can appear in a filter
pub const FILTER_FIELDS: [&str; 15] = [
    "source_file",
    "class_name",
    "method_name",
    "chunk_type",
    "archive",
    "start_line",
    "end_line",
    "content",
    ATTRIBUTE_KEYS[0],
    ATTRIBUTE_KEYS[1],
    ATTRIBUTE_KEYS[2],
    ATTRIBUTE_KEYS[3],
    ATTRIBUTE_KEYS[4],
    ATTRIBUTE_KEYS[5],
    ATTRIBUTE_KEYS[6],
];

const NUMERIC_FIELDS: [&str; 2] = ["start_line", "end_line"];

/// Conjunction of exact-match equality predicates over stored fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    conditions: BTreeMap<String, String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `field -> value` pairs. Empty values are skipped.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, ValidationError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .try_fold(Self::new(), |filter, (k, v)| filter.with(k.as_ref(), v.as_ref()))
    }

    /// Add one predicate. An empty value leaves the filter unchanged.
    pub fn with(mut self, field: &str, value: &str) -> Result<Self, ValidationError> {
        validate_field(field)?;
        if value.is_empty() {
            return Ok(self);
        }
        if NUMERIC_FIELDS.contains(&field) && value.trim().parse::<usize>().is_err() {
            return Err(ValidationError::NonNumericFilter {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
        self.conditions.insert(field.to_string(), value.to_string());
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.conditions
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn matches(&self, metadata: &StoredMetadata) -> bool {
        self.conditions.iter().all(|(field, wanted)| {
            let Some(actual) = metadata.field(field) else {
                return false;
            };
            if NUMERIC_FIELDS.contains(&field.as_str()) {
                wanted.trim().parse::<usize>().ok() == actual.parse::<usize>().ok()
            } else {
                actual == *wanted
            }
        })
    }

    /// SQL predicate for the LanceDB `only_if` clause, `None` when unfiltered
    pub fn to_sql(&self) -> Option<String> {
        if self.conditions.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self
            .conditions
            .iter()
            .map(|(field, value)| equality_sql(field, value))
            .collect();
        Some(clauses.join(" AND "))
    }
}

fn validate_field(field: &str) -> Result<(), ValidationError> {
    if FILTER_FIELDS.contains(&field) {
        Ok(())
    } else {
        Err(ValidationError::UnknownFilterField(field.to_string()))
    }
}

/// `` `field` = 'value' `` with quotes escaped; numeric fields are unquoted
fn equality_sql(field: &str, value: &str) -> String {
    if NUMERIC_FIELDS.contains(&field)
        && let Ok(n) = value.trim().parse::<usize>()
    {
        return format!("`{}` = {}", field, n);
    }
    format!("`{}` = '{}'", field, value.replace('\'', "''"))
}
