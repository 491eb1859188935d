//! Per-row ages, either read from an explicit days column or derived from a
//! created-date column against a reference time captured once per pass.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;

use crate::error::DashboardError;
use crate::services::column_roles::{AgeSource, ResolvedRoles, QUERIES_TABLE};
use crate::services::table::{cell_number, cell_text, Table};

const SECONDS_PER_DAY: i64 = 86_400;
/// Serial of 1970-01-01. Smaller numbers are day counts or years, not dates.
const MIN_SPREADSHEET_SERIAL: f64 = 25_569.0;
/// Latest serial a spreadsheet can hold (9999-12-31).
const MAX_SPREADSHEET_SERIAL: f64 = 2_958_465.0;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%b-%Y", "%d %b %Y"];

/// Reads one age per row of `table`; `None` marks a row whose age is unusable.
///
/// With [`AgeSource::CreatedDate`] any non-empty cell that is not a date aborts
/// the whole pass with [`DashboardError::DateParse`]. Row numbers in the error
/// are 1-based data rows (the header is not counted).
pub fn read_ages(
    table: &Table,
    source: &AgeSource,
    roles: &ResolvedRoles,
    reference: DateTime<Utc>,
) -> Result<Vec<Option<f64>>, DashboardError> {
    match source {
        AgeSource::Days { .. } => Ok(table
            .rows()
            .iter()
            .map(|row| row.get(roles.age).and_then(cell_number))
            .collect()),
        AgeSource::CreatedDate { column } => {
            let reference = reference.naive_utc();
            let mut ages = Vec::with_capacity(table.len());
            for (idx, row) in table.rows().iter().enumerate() {
                let cell = row.get(roles.age).unwrap_or(&JsonValue::Null);
                match parse_created_at(cell) {
                    CreatedAt::Missing => ages.push(None),
                    CreatedAt::At(created) => ages.push(Some(whole_days_between(created, reference))),
                    CreatedAt::Unparseable(value) => {
                        return Err(DashboardError::DateParse {
                            table: QUERIES_TABLE.to_string(),
                            column: column.trim().to_string(),
                            row: idx + 1,
                            value,
                        });
                    }
                }
            }
            Ok(ages)
        }
    }
}

/// Elapsed days from `created` to `reference`, floored.
pub fn whole_days_between(created: NaiveDateTime, reference: NaiveDateTime) -> f64 {
    let seconds = (reference - created).num_seconds();
    seconds.div_euclid(SECONDS_PER_DAY) as f64
}

#[derive(Debug, Clone, PartialEq)]
enum CreatedAt {
    Missing,
    At(NaiveDateTime),
    Unparseable(String),
}

fn parse_created_at(cell: &JsonValue) -> CreatedAt {
    if let JsonValue::Number(number) = cell {
        return match number.as_f64().and_then(from_spreadsheet_serial) {
            Some(created) => CreatedAt::At(created),
            None => CreatedAt::Unparseable(number.to_string()),
        };
    }
    let Some(text) = cell_text(cell) else {
        return CreatedAt::Missing;
    };
    match parse_date_text(&text) {
        Some(created) => CreatedAt::At(created),
        None => CreatedAt::Unparseable(text),
    }
}

/// Parses the date spellings seen in EDC and spreadsheet exports. Timestamps
/// with an offset are converted to UTC; naive values are taken as UTC.
pub fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    text.parse::<f64>().ok().and_then(from_spreadsheet_serial)
}

/// Converts a spreadsheet serial date (days since 1899-12-30, fraction = time of day).
fn from_spreadsheet_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(MIN_SPREADSHEET_SERIAL..=MAX_SPREADSHEET_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * (SECONDS_PER_DAY * 1000) as f64).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}
