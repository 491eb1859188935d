use serde::Serialize;
use std::collections::BTreeMap;

use crate::services::column_roles::ResolvedSecondaryRoles;
use crate::services::risk_ranking::count_by_key;
use crate::services::table::{cell_text, Table};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct GroupCount {
    pub value: String,
    pub count: u64,
}

/// Missing-pages table reduced to what the dashboard needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingPagesSummary {
    /// Every row, blank keys included.
    pub total: u64,
    pub by_key: BTreeMap<String, u64>,
    /// Per group value when a group column is configured; blank values are skipped.
    pub by_group: Option<Vec<GroupCount>>,
    pub blank_keys: u64,
}

pub fn summarize_missing_pages(table: &Table, roles: &ResolvedSecondaryRoles) -> MissingPagesSummary {
    let keys: Vec<String> = table
        .rows()
        .iter()
        .filter_map(|row| row.get(roles.key).and_then(cell_text))
        .collect();
    let blank_keys = (table.len() - keys.len()) as u64;

    let by_group = roles.group.map(|group| {
        count_by_key(
            table
                .rows()
                .iter()
                .filter_map(|row| row.get(group).and_then(cell_text)),
        )
        .into_iter()
        .map(|(value, count)| GroupCount { value, count })
        .collect()
    });

    MissingPagesSummary {
        total: table.len() as u64,
        by_key: count_by_key(keys),
        by_group,
        blank_keys,
    }
}
