use serde::Serialize;

use crate::services::aging::AgingHistogram;
use crate::services::records::{QueryRecord, RunningMean};

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct KpiSummary {
    /// Every query row, including rows whose age could not be read.
    pub total_queries: u64,
    pub open_queries: u64,
    /// Share of open queries in percent, one decimal; 0 for an empty table.
    pub percent_open: f64,
    /// Mean age over rows with a valid age, one decimal; 0 when none are valid.
    pub avg_aging: f64,
    /// Missing-page rows; absent when no missing-pages table was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_secondary: Option<u64>,
    /// Rows left out of the histogram and the averages.
    pub invalid_age_rows: u64,
}

pub fn summarize(records: &[QueryRecord], total_secondary: Option<u64>) -> KpiSummary {
    let total_queries = records.len() as u64;
    let open_queries = records.iter().filter(|record| record.is_open()).count() as u64;
    let mut ages = RunningMean::default();
    for age in records.iter().filter_map(|record| record.age_days) {
        ages.push(age);
    }
    let avg_aging = ages.mean().map(round_one_decimal).unwrap_or(0.0);
    let percent_open = if total_queries == 0 {
        0.0
    } else {
        round_one_decimal(open_queries as f64 * 100.0 / total_queries as f64)
    };

    KpiSummary {
        total_queries,
        open_queries,
        percent_open,
        avg_aging,
        total_secondary,
        invalid_age_rows: total_queries - ages.count(),
    }
}

pub fn histogram(records: &[QueryRecord]) -> AgingHistogram {
    records.iter().filter_map(|record| record.bucket).collect()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
