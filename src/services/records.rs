use crate::services::aging::{classify_age, AgingBucket};
use crate::services::column_roles::ResolvedRoles;
use crate::services::table::{cell_text, Table};

const OPEN_TOKEN: &str = "open";

/// One query row after role lookup, age resolution and bucketing.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    /// Trimmed grouping key; `None` when the cell is blank.
    pub key: Option<String>,
    pub status: Option<String>,
    pub age_days: Option<f64>,
    pub bucket: Option<AgingBucket>,
}

impl QueryRecord {
    pub fn new(key: Option<String>, status: Option<String>, age_days: Option<f64>) -> Self {
        let bucket = age_days.and_then(|age| classify_age(age).ok());
        Self {
            key,
            status,
            age_days: bucket.and(age_days),
            bucket,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.as_deref().is_some_and(is_open_status)
    }
}

/// Incremental mean. A raw sum of large finite ages would overflow to infinity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    mean: f64,
    count: u64,
}

impl RunningMean {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// `None` until a value has been pushed.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }
}

/// Case-insensitive substring match, so `Open`, `OPEN` and `Re-opened` all count.
pub fn is_open_status(status: &str) -> bool {
    status.to_lowercase().contains(OPEN_TOKEN)
}

/// Pairs each table row with its precomputed age.
pub fn build_records(table: &Table, roles: &ResolvedRoles, ages: &[Option<f64>]) -> Vec<QueryRecord> {
    table
        .rows()
        .iter()
        .zip(ages.iter().copied())
        .map(|(row, age)| {
            QueryRecord::new(
                row.get(roles.key).and_then(cell_text),
                row.get(roles.status).and_then(cell_text),
                age,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn open_status_matches_case_insensitively() {
        assert!(is_open_status("Open"));
        assert!(is_open_status("OPEN - awaiting site"));
        assert!(is_open_status("Reopened"));
        assert!(!is_open_status("Closed"));
        assert!(!is_open_status("Answered"));
    }

    #[test]
    fn records_carry_trimmed_keys_and_buckets() {
        let table = Table::new(
            vec!["Subjects".into(), "QueryStatus".into(), "Age".into()],
            vec![
                vec![json!(" A "), json!("Open"), json!("5")],
                vec![json!(""), json!("Closed"), json!("x")],
            ],
        );
        let roles = ResolvedRoles {
            key: 0,
            status: 1,
            age: 2,
        };
        let records = build_records(&table, &roles, &[Some(5.0), None]);
        assert_eq!(records[0].key.as_deref(), Some("A"));
        assert!(records[0].is_open());
        assert_eq!(records[0].bucket, Some(AgingBucket::UpToWeek));
        assert_eq!(records[1].key, None);
        assert!(!records[1].is_open());
        assert_eq!(records[1].bucket, None);
    }

    #[test]
    fn running_mean_tracks_count_and_average() {
        let mut mean = RunningMean::default();
        assert_eq!(mean.mean(), None);
        for value in [5.0, 20.0, 40.0] {
            mean.push(value);
        }
        assert_eq!(mean.count(), 3);
        assert!((mean.mean().unwrap_or_default() - 65.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_age_is_dropped_with_its_bucket() {
        let record = QueryRecord::new(Some("A".into()), None, Some(f64::NAN));
        assert_eq!(record.age_days, None);
        assert_eq!(record.bucket, None);
        assert!(!record.is_open());
    }
}
