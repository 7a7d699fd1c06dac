//! Response types for the statistics API.
//!
//! These types mirror the API response structures. Field names on the wire
//! are Swedish (`namn`, `nasta_sida`, `sidor`, ...); the Rust names are
//! English. Fields the client does not model are kept in `extra` so raw
//! results round-trip.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A schema-free result row: field name to scalar, in server order.
pub type Row = Map<String, Value>;

/// One page of a data (`resultat`) response, or the aggregate of several.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPage {
    /// Result rows
    #[serde(default)]
    pub data: Vec<Row>,
    /// Complete URL of the next page, absent on the last page
    #[serde(rename = "nasta_sida", default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    /// Subject echo
    #[serde(rename = "amne", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Page index
    #[serde(rename = "sida", default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// Records per page
    #[serde(rename = "per_sida", default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
    /// Total number of pages
    #[serde(rename = "sidor", default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u64>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: Row,
}

impl DataPage {
    /// The next-page locator, if the server provided a non-empty one.
    pub fn next_page_url(&self) -> Option<&str> {
        self.next_page.as_deref().filter(|url| !url.is_empty())
    }

    /// Returns the number of records held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A coded entry, as returned for API versions and languages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeText {
    #[serde(rename = "kod", default)]
    pub code: String,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub extra: Row,
}

/// A subject (statistical dataset) exposed by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Path name, e.g. "dodsorsaker"; absent on malformed entries
    #[serde(
        rename = "namn",
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    /// Display name
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Row,
}

/// A distribution variable of a subject, e.g. "kon" or "region".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Path name, absent on malformed entries
    #[serde(
        rename = "namn",
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Row,
}

/// One value of a distribution variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableValue {
    /// Identifier as it appears in data rows (integer or string)
    #[serde(default)]
    pub id: Value,
    /// Display label
    #[serde(default)]
    pub text: Value,
    #[serde(flatten)]
    pub extra: Row,
}

/// Read a string field, treating null or any non-string value as absent.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}
