use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::services::filter::FilterPredicate;

#[derive(Parser, Debug)]
#[command(
    name = "query-risk",
    version,
    about = "Query aging and subject risk ranking for data-management exports"
)]
pub struct Cli {
    /// Print the OpenAPI document and exit.
    #[arg(long, default_value_t = false)]
    pub print_openapi: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the dashboard for CSV exports and print it as JSON.
    Report(ReportArgs),
    /// Serve the dashboard computation over HTTP.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Queries export (CSV with a header row).
    #[arg(long)]
    pub queries: PathBuf,
    /// Missing-pages export (CSV with a header row).
    #[arg(long)]
    pub missing_pages: Option<PathBuf>,
    #[arg(long)]
    pub key_column: Option<String>,
    #[arg(long)]
    pub status_column: Option<String>,
    /// Column holding the age in days.
    #[arg(long, conflicts_with = "created_column")]
    pub age_column: Option<String>,
    /// Column holding the creation date; ages are derived from it.
    #[arg(long)]
    pub created_column: Option<String>,
    /// Reference time for derived ages (RFC 3339). Defaults to now.
    #[arg(long)]
    pub reference_time: Option<DateTime<Utc>>,
    /// Exact-match filter on the detailed view, `COLUMN=VALUE`. Repeatable.
    #[arg(long = "filter")]
    pub filters: Vec<FilterPredicate>,
    /// List distinct values of a column in the report. Repeatable.
    #[arg(long = "option-column")]
    pub option_columns: Vec<String>,
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_report_flags() {
        let cli = Cli::try_parse_from([
            "query-risk",
            "report",
            "--queries",
            "queries.csv",
            "--missing-pages",
            "missing.csv",
            "--created-column",
            "Opened",
            "--reference-time",
            "2024-03-31T00:00:00Z",
            "--filter",
            "Visits=Baseline",
            "--filter",
            "QueryStatus=Open",
        ])
        .expect("parse");
        let Some(Commands::Report(args)) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.missing_pages, Some(PathBuf::from("missing.csv")));
        assert_eq!(args.created_column.as_deref(), Some("Opened"));
        assert_eq!(args.filters.len(), 2);
        assert_eq!(args.filters[1].value, "Open");
        assert!(args.reference_time.is_some());
    }

    #[test]
    fn age_and_created_columns_conflict() {
        let result = Cli::try_parse_from([
            "query-risk",
            "report",
            "--queries",
            "q.csv",
            "--age-column",
            "Days",
            "--created-column",
            "Opened",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn serve_defaults_to_localhost() {
        let cli = Cli::try_parse_from(["query-risk", "serve"]).expect("parse");
        let Some(Commands::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 8080);
    }
}
