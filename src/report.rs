use anyhow::{Context, Result};
use chrono::Utc;

use crate::cli::ReportArgs;
use crate::config::EngineConfig;
use crate::services::column_roles::AgeSource;
use crate::services::dashboard::{compute_dashboard, DashboardReport, DashboardRequest};
use crate::services::table::read_csv_table;

/// Merges CLI flags over the configured defaults and loads both exports.
pub fn build_request(args: &ReportArgs, config: &EngineConfig) -> Result<DashboardRequest> {
    let mut roles = config.roles.clone();
    if let Some(key) = args.key_column.as_ref() {
        roles.key = key.clone();
    }
    if let Some(status) = args.status_column.as_ref() {
        roles.status = status.clone();
    }
    if let Some(column) = args.created_column.as_ref() {
        roles.age = AgeSource::CreatedDate {
            column: column.clone(),
        };
    } else if let Some(column) = args.age_column.as_ref() {
        roles.age = AgeSource::Days {
            column: column.clone(),
        };
    }

    let queries = read_csv_table(&args.queries)
        .with_context(|| format!("failed to load queries from {}", args.queries.display()))?;
    let missing_pages = args
        .missing_pages
        .as_deref()
        .map(|path| {
            read_csv_table(path)
                .with_context(|| format!("failed to load missing pages from {}", path.display()))
        })
        .transpose()?;

    let mut option_columns = config.option_columns.clone();
    option_columns.extend(args.option_columns.iter().cloned());

    Ok(DashboardRequest {
        queries,
        missing_pages,
        roles,
        secondary_roles: config.secondary_roles.clone(),
        weights: config.weights,
        filters: args.filters.clone(),
        option_columns,
    })
}

pub fn run_report(args: &ReportArgs, config: &EngineConfig) -> Result<DashboardReport> {
    let request = build_request(args, config)?;
    let reference = args.reference_time.unwrap_or_else(Utc::now);
    let report = compute_dashboard(&request, reference)?;
    Ok(report)
}

pub fn render_report(report: &DashboardReport, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(rendered)
}
