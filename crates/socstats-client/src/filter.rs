//! Filter values and their canonical comma-joined form.
//!
//! The service takes every filter as a path segment holding a comma-separated
//! list of tokens (`.../ar/2018,2019,2020`). Callers may hand in a single
//! value, a list, an integer range, or an already joined string; all of them
//! normalize the same way regardless of which filter they are used for.

use crate::error::{ClientError, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::ops::{Range, RangeInclusive};

/// One element of a list filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterItem {
    Int(i64),
    Text(String),
}

impl fmt::Display for FilterItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterItem::Int(n) => write!(f, "{n}"),
            FilterItem::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FilterItem {
    fn from(value: i64) -> Self {
        FilterItem::Int(value)
    }
}

impl From<i32> for FilterItem {
    fn from(value: i32) -> Self {
        FilterItem::Int(value.into())
    }
}

impl From<u32> for FilterItem {
    fn from(value: u32) -> Self {
        FilterItem::Int(value.into())
    }
}

impl From<&str> for FilterItem {
    fn from(value: &str) -> Self {
        FilterItem::Text(value.to_string())
    }
}

impl From<String> for FilterItem {
    fn from(value: String) -> Self {
        FilterItem::Text(value)
    }
}

/// A filter value as accepted for the measure and every named filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// A single integer id
    Int(i64),
    /// A single string id, or a pre-joined `"a,b,c"` list
    Text(String),
    /// An ordered list of ids, joined in input order
    List(Vec<FilterItem>),
    /// A half-open integer range, joined in ascending order
    Range(Range<i64>),
}

impl FilterValue {
    /// Normalize into the comma-joined form used in query paths.
    pub fn normalize(&self) -> String {
        match self {
            FilterValue::Int(n) => n.to_string(),
            FilterValue::Text(s) => s.clone(),
            FilterValue::List(items) => join(items.iter()),
            FilterValue::Range(range) => join(range.clone()),
        }
    }

    /// Returns true if the value normalizes to an empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Int(_) => false,
            FilterValue::Text(s) => s.is_empty(),
            FilterValue::List(items) => items.is_empty(),
            FilterValue::Range(range) => range.is_empty(),
        }
    }
}

fn join<I>(items: I) -> String
where
    I: Iterator,
    I::Item: fmt::Display,
{
    items
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Normalize a dynamically typed (JSON) filter value.
///
/// Integers, strings, and arrays of integers/strings are accepted. Anything
/// else (floats, booleans, null, objects, nested arrays) fails with
/// [`ClientError::InvalidFilterType`].
pub fn normalize(value: &Value) -> Result<String> {
    FilterValue::try_from(value).map(|v| v.normalize())
}

fn item_from_json(value: &Value) -> Result<FilterItem> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(FilterItem::Int)
            .ok_or_else(|| invalid_type(value)),
        Value::String(s) => Ok(FilterItem::Text(s.clone())),
        other => Err(invalid_type(other)),
    }
}

fn invalid_type(value: &Value) -> ClientError {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "non-integer number",
        Value::String(_) => "string",
        Value::Array(_) => "nested array",
        Value::Object(_) => "object",
    };
    ClientError::InvalidFilterType(format!(
        "{kind} ({value}); expected integer, string, list, or range"
    ))
}

impl TryFrom<&Value> for FilterValue {
    type Error = ClientError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(item_from_json)
                .collect::<Result<Vec<_>>>()
                .map(FilterValue::List),
            scalar => item_from_json(scalar).map(FilterValue::from),
        }
    }
}

impl From<FilterItem> for FilterValue {
    fn from(item: FilterItem) -> Self {
        match item {
            FilterItem::Int(n) => FilterValue::Int(n),
            FilterItem::Text(s) => FilterValue::Text(s),
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(value.into())
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        FilterValue::Int(value.into())
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl<T: Into<FilterItem>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        FilterValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterItem>, const N: usize> From<[T; N]> for FilterValue {
    fn from(items: [T; N]) -> Self {
        FilterValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Range<i64>> for FilterValue {
    fn from(range: Range<i64>) -> Self {
        FilterValue::Range(range)
    }
}

impl From<Range<i32>> for FilterValue {
    fn from(range: Range<i32>) -> Self {
        FilterValue::Range(i64::from(range.start)..i64::from(range.end))
    }
}

impl From<RangeInclusive<i64>> for FilterValue {
    fn from(range: RangeInclusive<i64>) -> Self {
        let (start, end) = range.into_inner();
        FilterValue::Range(start..end.saturating_add(1))
    }
}

impl From<RangeInclusive<i32>> for FilterValue {
    fn from(range: RangeInclusive<i32>) -> Self {
        let (start, end) = range.into_inner();
        FilterValue::Range(i64::from(start)..i64::from(end) + 1)
    }
}

/// Parse a year range such as `"2020-2023"` or a list such as `"2020,2022"`.
pub fn parse_year_range(input: &str) -> Result<FilterValue> {
    let input = input.trim();
    let invalid = || ClientError::Validation(format!("invalid year range: {input:?}"));

    if !input.contains(',') {
        if let Some((start, end)) = input.split_once('-') {
            let start: i64 = start.trim().parse().map_err(|_| invalid())?;
            let end: i64 = end.trim().parse().map_err(|_| invalid())?;
            if start > end {
                return Err(invalid());
            }
            return Ok(FilterValue::from(start..=end));
        }
    }

    input
        .split(',')
        .map(|year| year.trim().parse::<i64>().map(FilterItem::Int))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(FilterValue::List)
        .map_err(|_| invalid())
}

/// Ordered mapping from filter name to value.
///
/// Filters are emitted as path segments in insertion order. Setting a name
/// twice replaces the value but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    entries: IndexMap<String, FilterValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter, returning `self` for chaining.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FilterValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (name, value) in iter {
            filters.insert(name, value);
        }
        filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_scalars() {
        assert_eq!(FilterValue::from(1).normalize(), "1");
        assert_eq!(FilterValue::from("test").normalize(), "test");
        assert_eq!(FilterValue::from("already,joined").normalize(), "already,joined");
    }

    #[test]
    fn test_normalize_lists_keep_order() {
        assert_eq!(FilterValue::from(vec![1, 2, 3]).normalize(), "1,2,3");
        assert_eq!(FilterValue::from(vec![3, 1, 2]).normalize(), "3,1,2");
        assert_eq!(FilterValue::from(["B15", "I21"]).normalize(), "B15,I21");

        let mixed = FilterValue::List(vec![FilterItem::Int(1), FilterItem::from("A")]);
        assert_eq!(mixed.normalize(), "1,A");
    }

    #[test]
    fn test_normalize_ranges() {
        assert_eq!(FilterValue::from(2018..2021).normalize(), "2018,2019,2020");
        assert_eq!(FilterValue::from(2018..=2020).normalize(), "2018,2019,2020");
        assert_eq!(FilterValue::from(5..5).normalize(), "");
        assert!(FilterValue::from(5..5).is_empty());
    }

    #[test]
    fn test_normalize_json_values() {
        assert_eq!(normalize(&json!(1)).unwrap(), "1");
        assert_eq!(normalize(&json!("2020,2021")).unwrap(), "2020,2021");
        assert_eq!(normalize(&json!([2018, "2019", 2020])).unwrap(), "2018,2019,2020");
    }

    #[test]
    fn test_normalize_json_rejects_other_types() {
        for value in [
            json!({"invalid": "type"}),
            json!(null),
            json!(true),
            json!(1.5),
            json!([[1, 2]]),
            json!([{"id": 1}]),
        ] {
            let err = normalize(&value).unwrap_err();
            assert!(
                matches!(err, ClientError::InvalidFilterType(_)),
                "expected InvalidFilterType for {value}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_year_range_dash() {
        let years = parse_year_range("2020-2023").unwrap();
        assert_eq!(years.normalize(), "2020,2021,2022,2023");
    }

    #[test]
    fn test_parse_year_range_comma() {
        let years = parse_year_range("2020, 2021,2023").unwrap();
        assert_eq!(years.normalize(), "2020,2021,2023");
    }

    #[test]
    fn test_parse_year_range_invalid() {
        assert!(parse_year_range("2023-2020").is_err());
        assert!(parse_year_range("twenty").is_err());
    }

    #[test]
    fn test_filters_keep_insertion_order() {
        let filters = Filters::new()
            .with("diagnos", "99")
            .with("ar", 2020..2022)
            .with("kon", 1);

        let names: Vec<_> = filters.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["diagnos", "ar", "kon"]);

        let filters = filters.with("diagnos", vec!["A", "B"]);
        let names: Vec<_> = filters.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["diagnos", "ar", "kon"]);
        assert_eq!(filters.get("diagnos").unwrap().normalize(), "A,B");
    }
}
