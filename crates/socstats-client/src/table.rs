//! Tabular form of list and data results.

use crate::enrich::columns_of;
use crate::error::{ClientError, Result};
use crate::types::{DataPage, Row};
use serde::Serialize;
use serde_json::Value;

/// Result attributes carried alongside a data table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableAttrs {
    /// Subject the data belongs to
    pub subject: Option<String>,
    /// Pages the rows came from (`sidor`)
    pub total_pages: Option<u64>,
    /// Records per page as reported (`per_sida`)
    pub records_per_page: Option<u64>,
}

/// Rows with an ordered column list.
///
/// Columns are the union of row fields in first-appearance order. A row
/// that lacks a column reads as null for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub attrs: TableAttrs,
}

impl Table {
    /// Build a table from schema-free rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            columns: columns_of(&rows),
            rows,
            attrs: TableAttrs::default(),
        }
    }

    /// Build a table from typed records, one row per record.
    pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self> {
        let rows = records
            .iter()
            .map(|record| match serde_json::to_value(record)? {
                Value::Object(row) => Ok(row),
                other => Err(ClientError::InvalidResponse(format!(
                    "expected an object record, got: {other}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_rows(rows))
    }

    /// Build a table from a data page, keeping its paging attributes.
    pub fn from_page(page: DataPage) -> Self {
        let attrs = TableAttrs {
            subject: page.subject,
            total_pages: page.page_count,
            records_per_page: page.per_page,
        };
        Self {
            attrs,
            ..Self::from_rows(page.data)
        }
    }

    /// Values of one column, null where a row lacks the field.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        if !self.columns.iter().any(|c| c == name) {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|row| row.get(name).unwrap_or(&Value::Null))
                .collect(),
        )
    }

    /// Cell at `row`, `column`.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row)?.get(column)
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
