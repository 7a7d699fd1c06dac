//! Adding label columns to data rows.
//!
//! Identifier columns are found by name:
//!
//! - `ar` (year) looks up variable `ar` and produces `ar_label`
//! - `<stem>Id` looks up variable `<stem>` lower-cased and produces
//!   `<stem>_label`, e.g. `konId` -> `kon_label`, `RegionId` -> `Region_label`
//!
//! `varde`, `sida`, `per_sida` and `sidor` are never identifier columns.
//! A column whose variable has no metadata gets no label column. A row
//! whose identifier has no metadata entry gets a null label.
//!
//! Two identifier columns can claim the same label name (`ar` and `arId`
//! both map to `ar_label`). The column that appears first in the rows owns
//! the label; the later one is left unenriched.
//!
//! Enrichment is a pure function of the identifier column and the
//! metadata, so enriching twice leaves existing label columns unchanged.

use crate::metadata::{lookup_key, SubjectMetadata};
use crate::types::Row;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// Fields that are never identifier columns.
pub const EXCLUDED_FIELDS: [&str; 4] = ["varde", "sida", "per_sida", "sidor"];

const YEAR_FIELD: &str = "ar";
const ID_SUFFIX: &str = "Id";
const LABEL_SUFFIX: &str = "_label";

/// An identifier column and where its labels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelColumn {
    /// Identifier field in the data rows
    pub field: String,
    /// Metadata variable the identifiers belong to
    pub variable: String,
    /// Name of the derived label field
    pub label: String,
}

/// Map a field name to its label column, ignoring metadata.
///
/// Returns `None` for excluded fields, fields that are not identifier
/// columns, and a bare `Id` field (which has no variable stem).
pub fn label_column_for(field: &str) -> Option<LabelColumn> {
    if EXCLUDED_FIELDS.contains(&field) {
        return None;
    }

    if field == YEAR_FIELD {
        return Some(LabelColumn {
            field: field.to_string(),
            variable: YEAR_FIELD.to_string(),
            label: format!("{YEAR_FIELD}{LABEL_SUFFIX}"),
        });
    }

    let stem = field.strip_suffix(ID_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }

    Some(LabelColumn {
        field: field.to_string(),
        variable: stem.to_lowercase(),
        label: format!("{stem}{LABEL_SUFFIX}"),
    })
}

/// Field names across `rows`, in first-appearance order.
pub fn columns_of(rows: &[Row]) -> Vec<String> {
    let mut columns = IndexSet::new();
    for row in rows {
        for field in row.keys() {
            if !columns.contains(field.as_str()) {
                columns.insert(field.clone());
            }
        }
    }
    columns.into_iter().collect()
}

/// The label columns `enrich` would add for these columns and metadata.
///
/// When several columns map to one label name, the first column wins.
pub fn label_columns(columns: &[String], metadata: &SubjectMetadata) -> Vec<LabelColumn> {
    let mut claimed = IndexSet::new();
    columns
        .iter()
        .filter_map(|field| label_column_for(field))
        .filter(|column| metadata.contains(&column.variable))
        .filter(|column| {
            let first = claimed.insert(column.label.clone());
            if !first {
                tracing::debug!(
                    field = %column.field,
                    label = %column.label,
                    "Label already produced by an earlier column"
                );
            }
            first
        })
        .collect()
}

/// Return `rows` with label fields added.
///
/// Original fields keep their order; new label fields are appended after
/// them, in the order their identifier columns first appear.
pub fn enrich(rows: &[Row], metadata: &SubjectMetadata) -> Vec<Row> {
    let mut enriched = rows.to_vec();
    enrich_in_place(&mut enriched, metadata);
    enriched
}

/// Add label fields to `rows` in place. Returns the label columns added.
pub fn enrich_in_place(rows: &mut [Row], metadata: &SubjectMetadata) -> Vec<LabelColumn> {
    if rows.is_empty() || metadata.is_empty() {
        return Vec::new();
    }

    let columns = label_columns(&columns_of(rows), metadata);

    for column in &columns {
        let labels: IndexMap<String, Value> = metadata
            .get(&column.variable)
            .map(|table| table.labels())
            .unwrap_or_default();

        let mut missing = 0usize;
        for row in rows.iter_mut() {
            let label = row
                .get(&column.field)
                .and_then(lookup_key)
                .and_then(|key| labels.get(&key).cloned())
                .unwrap_or(Value::Null);
            if label.is_null() {
                missing += 1;
            }
            row.insert(column.label.clone(), label);
        }

        tracing::debug!(
            field = %column.field,
            label = %column.label,
            entries = labels.len(),
            missing,
            "Added label column"
        );
    }

    columns
}
