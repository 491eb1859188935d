//! One dashboard computation pass over a queries table and an optional
//! missing-pages table.
//!
//! Every column mapping is validated before any row is read, and the first
//! table-level failure aborts the pass: callers either get a complete
//! [`DashboardReport`] or a [`DashboardError`], never a partial report.
//! Row-level problems (blank keys, unreadable ages) are absorbed and logged
//! as counts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::DashboardError;
use crate::services::age_derivation::read_ages;
use crate::services::aging::BucketCount;
use crate::services::column_roles::{ColumnRoles, SecondaryRoles};
use crate::services::filter::{filter_options, filter_rows, FilterPredicate};
use crate::services::kpis::{histogram, summarize, KpiSummary};
use crate::services::missing_pages::{summarize_missing_pages, GroupCount};
use crate::services::records::build_records;
use crate::services::risk_ranking::{aggregate_by_key, rank, RankingRow, RiskWeights, WeightPolicy};
use crate::services::table::Table;

#[derive(Debug, Clone, Default)]
pub struct DashboardRequest {
    pub queries: Table,
    pub missing_pages: Option<Table>,
    pub roles: ColumnRoles,
    pub secondary_roles: SecondaryRoles,
    pub weights: WeightPolicy,
    pub filters: Vec<FilterPredicate>,
    /// Columns to list distinct values for.
    pub option_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct DashboardReport {
    pub reference_time: DateTime<Utc>,
    pub kpis: KpiSummary,
    pub aging_histogram: Vec<BucketCount>,
    pub weights: RiskWeights,
    pub ranking: Vec<RankingRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_pages_by_group: Option<Vec<GroupCount>>,
    pub filtered_queries: Table,
    pub filter_options: BTreeMap<String, Vec<String>>,
}

/// Runs the full pipeline. `reference` is the "now" every derived age is
/// measured against; capture it once per request.
pub fn compute_dashboard(
    request: &DashboardRequest,
    reference: DateTime<Utc>,
) -> Result<DashboardReport, DashboardError> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("dashboard", %run_id);
    let _entered = span.enter();

    let roles = request.roles.resolve(&request.queries)?;
    let missing_pages = match request.missing_pages.as_ref() {
        Some(table) => Some((table, request.secondary_roles.resolve(table)?)),
        None => None,
    };
    let filtered_queries = filter_rows(&request.queries, &request.filters)?;
    let filter_options = filter_options(&request.queries, &request.option_columns)?;
    tracing::debug!(
        rows = request.queries.len(),
        filters = request.filters.len(),
        "column roles validated"
    );

    let ages = read_ages(&request.queries, &request.roles.age, &roles, reference)?;
    let records = build_records(&request.queries, &roles, &ages);

    let missing_pages = missing_pages.map(|(table, roles)| summarize_missing_pages(table, &roles));
    let kpis = summarize(&records, missing_pages.as_ref().map(|summary| summary.total));
    if kpis.invalid_age_rows > 0 {
        tracing::warn!(
            rows = kpis.invalid_age_rows,
            column = request.roles.age.column(),
            "queries without a usable age left out of aging"
        );
    }
    let blank_keys = records.iter().filter(|record| record.key.is_none()).count();
    if blank_keys > 0 {
        tracing::warn!(
            rows = blank_keys,
            column = %request.roles.key,
            "queries with a blank key left out of the ranking"
        );
    }
    if let Some(summary) = missing_pages.as_ref().filter(|summary| summary.blank_keys > 0) {
        tracing::warn!(
            rows = summary.blank_keys,
            column = %request.secondary_roles.key,
            "missing pages with a blank key left out of the ranking"
        );
    }

    let weights = request.weights.select(missing_pages.is_some());
    let groups = aggregate_by_key(&records);
    let ranking = rank(
        &groups,
        missing_pages.as_ref().map(|summary| &summary.by_key),
        weights,
    );

    tracing::info!(
        queries = kpis.total_queries,
        open = kpis.open_queries,
        missing_pages = ?kpis.total_secondary,
        ranked_keys = ranking.len(),
        "dashboard computed"
    );

    Ok(DashboardReport {
        reference_time: reference,
        kpis,
        aging_histogram: histogram(&records).entries(),
        weights,
        ranking,
        missing_pages_by_group: missing_pages.and_then(|summary| summary.by_group),
        filtered_queries,
        filter_options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::column_roles::{AgeSource, MISSING_PAGES_TABLE, QUERIES_TABLE};
    use chrono::TimeZone;
    use serde_json::{json, Value as JsonValue};

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0)
            .single()
            .expect("reference")
    }

    fn queries() -> Table {
        crate::test_support::sample_queries()
    }

    fn missing_pages() -> Table {
        Table::new(
            vec!["Subjects".into(), "Folders".into()],
            vec![
                vec![json!("B"), json!("Week 4")],
                vec![json!("C"), json!("Baseline")],
                vec![json!("C"), json!("Week 4")],
            ],
        )
    }

    #[test]
    fn ranks_queries_alone_with_unit_weights() {
        let request = DashboardRequest {
            queries: queries(),
            ..DashboardRequest::default()
        };
        let report = compute_dashboard(&request, reference()).expect("report");

        assert_eq!(report.weights, RiskWeights::PRIMARY_ONLY);
        let keys: Vec<&str> = report.ranking.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(keys, vec!["B", "A"]);
        assert!((report.ranking[0].risk_score - 5.0).abs() < 1e-9);
        assert!((report.ranking[1].risk_score - 2.25).abs() < 1e-9);
        assert_eq!(report.kpis.total_queries, 3);
        assert_eq!(report.kpis.open_queries, 2);
        assert_eq!(report.kpis.total_secondary, None);
        assert_eq!(report.missing_pages_by_group, None);
        let counts: Vec<u64> = report.aging_histogram.iter().map(|entry| entry.count).collect();
        assert_eq!(counts, vec![1, 0, 1, 1]);
    }

    #[test]
    fn merges_missing_pages_with_doubled_open_weight() {
        let request = DashboardRequest {
            queries: queries(),
            missing_pages: Some(missing_pages()),
            ..DashboardRequest::default()
        };
        let report = compute_dashboard(&request, reference()).expect("report");

        assert_eq!(report.weights, RiskWeights::WITH_SECONDARY);
        assert_eq!(report.kpis.total_secondary, Some(3));
        let keys: Vec<&str> = report.ranking.iter().map(|row| row.key.as_str()).collect();
        // B: 2 + 4 + 1 = 7, A: 2 + 1.25 = 3.25, C: 2
        assert_eq!(keys, vec!["B", "A", "C"]);
        let c = &report.ranking[2];
        assert_eq!((c.total_count, c.open_count, c.secondary_count), (0, 0, 2));
        assert_eq!(
            report.missing_pages_by_group.as_ref().map(Vec::len),
            Some(2)
        );
    }

    #[test]
    fn empty_tables_produce_an_empty_zeroed_report() {
        let request = DashboardRequest {
            queries: Table::new(
                vec!["Subjects".into(), "QueryStatus".into(), "DaysNotYetClosed".into()],
                vec![],
            ),
            missing_pages: Some(Table::new(vec!["Subjects".into(), "Folders".into()], vec![])),
            ..DashboardRequest::default()
        };
        let report = compute_dashboard(&request, reference()).expect("report");
        assert!(report.ranking.is_empty());
        assert_eq!(report.kpis.total_queries, 0);
        assert_eq!(report.kpis.avg_aging, 0.0);
        assert_eq!(report.kpis.total_secondary, Some(0));
        assert_eq!(report.aging_histogram.len(), 4);
        assert!(report.aging_histogram.iter().all(|entry| entry.count == 0));
    }

    #[test]
    fn bad_created_date_fails_the_whole_pass() {
        let request = DashboardRequest {
            queries: Table::new(
                vec!["Subjects".into(), "QueryStatus".into(), "Created".into()],
                vec![
                    vec![json!("A"), json!("Open"), json!("2024-03-01")],
                    vec![json!("B"), json!("Open"), json!("not a date")],
                ],
            ),
            roles: ColumnRoles {
                age: AgeSource::CreatedDate {
                    column: "Created".into(),
                },
                ..ColumnRoles::default()
            },
            ..DashboardRequest::default()
        };
        let err = compute_dashboard(&request, reference()).expect_err("date error");
        assert!(matches!(err, DashboardError::DateParse { row: 2, .. }));
    }

    #[test]
    fn derived_ages_use_the_supplied_reference() {
        let request = DashboardRequest {
            queries: Table::new(
                vec!["Subjects".into(), "QueryStatus".into(), "Created".into()],
                vec![
                    vec![json!("A"), json!("Open"), json!("2024-03-21")],
                    vec![json!("A"), json!("Open"), JsonValue::Null],
                ],
            ),
            roles: ColumnRoles {
                age: AgeSource::CreatedDate {
                    column: "Created".into(),
                },
                ..ColumnRoles::default()
            },
            ..DashboardRequest::default()
        };
        let report = compute_dashboard(&request, reference()).expect("report");
        assert_eq!(report.kpis.avg_aging, 10.0);
        assert_eq!(report.kpis.invalid_age_rows, 1);
        assert_eq!(report.aging_histogram[1].count, 1);
        assert_eq!(report.ranking[0].total_count, 2);

        let later = reference() + chrono::Duration::days(30);
        let report = compute_dashboard(&request, later).expect("report");
        assert_eq!(report.kpis.avg_aging, 40.0);
    }

    #[test]
    fn missing_key_column_fails_before_any_output() {
        let request = DashboardRequest {
            queries: queries(),
            roles: ColumnRoles {
                key: "Participant".into(),
                ..ColumnRoles::default()
            },
            ..DashboardRequest::default()
        };
        let err = compute_dashboard(&request, reference()).expect_err("missing");
        assert_eq!(
            err,
            DashboardError::missing_column(QUERIES_TABLE, "key", "Participant")
        );
    }

    #[test]
    fn missing_pages_key_column_is_validated() {
        let request = DashboardRequest {
            queries: queries(),
            missing_pages: Some(Table::new(vec!["Subject ID".into()], vec![])),
            ..DashboardRequest::default()
        };
        let err = compute_dashboard(&request, reference()).expect_err("missing");
        assert_eq!(
            err,
            DashboardError::missing_column(MISSING_PAGES_TABLE, "key", "Subjects")
        );
    }

    #[test]
    fn filtered_view_and_options_come_from_the_queries_table() {
        let request = DashboardRequest {
            queries: queries(),
            filters: vec![FilterPredicate {
                column: "Visits".into(),
                value: "Baseline".into(),
            }],
            option_columns: vec!["Visits".into()],
            ..DashboardRequest::default()
        };
        let report = compute_dashboard(&request, reference()).expect("report");
        assert_eq!(report.filtered_queries.len(), 2);
        assert_eq!(report.filter_options["Visits"], vec!["Baseline", "Week 4"]);
        // Filters narrow the view only; KPIs still cover every row.
        assert_eq!(report.kpis.total_queries, 3);
    }
}
