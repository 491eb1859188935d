//! Pass-through filtered view of the queries table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DashboardError;
use crate::services::column_roles::{require_column, QUERIES_TABLE};
use crate::services::table::{cell_text, Table};

/// Keep rows whose `column` equals `value` exactly (after trimming both sides).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FilterPredicate {
    pub column: String,
    pub value: String,
}

impl std::str::FromStr for FilterPredicate {
    type Err = String;

    /// Parses `COLUMN=VALUE`; the value may itself contain `=`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (column, value) = raw
            .split_once('=')
            .ok_or_else(|| format!("filter {raw:?} must look like COLUMN=VALUE"))?;
        if column.trim().is_empty() {
            return Err(format!("filter {raw:?} has an empty column name"));
        }
        Ok(Self {
            column: column.trim().to_string(),
            value: value.trim().to_string(),
        })
    }
}

/// Applies every predicate (logical AND). No predicates returns the table unchanged.
pub fn filter_rows(table: &Table, predicates: &[FilterPredicate]) -> Result<Table, DashboardError> {
    let resolved: Vec<(usize, &str)> = predicates
        .iter()
        .map(|predicate| {
            require_column(table, QUERIES_TABLE, "filter", &predicate.column)
                .map(|idx| (idx, predicate.value.trim()))
        })
        .collect::<Result<_, _>>()?;

    Ok(table.retain_rows(|row| {
        resolved.iter().all(|(idx, expected)| {
            row.get(*idx)
                .and_then(cell_text)
                .is_some_and(|actual| actual == *expected)
        })
    }))
}

/// Sorted distinct values per requested column, for building filter pickers.
pub fn filter_options(
    table: &Table,
    columns: &[String],
) -> Result<BTreeMap<String, Vec<String>>, DashboardError> {
    columns
        .iter()
        .map(|column| -> Result<(String, Vec<String>), DashboardError> {
            let idx = require_column(table, QUERIES_TABLE, "filter", column)?;
            Ok((column.trim().to_string(), table.distinct_values(idx)))
        })
        .collect()
}
