//! Per-subject risk ranking.
//!
//! Queries are grouped by key into counts and a mean age, optionally outer-merged
//! with per-key missing-page counts, scored with a [`RiskWeights`] set and sorted
//! so the subjects needing follow-up first come first.
//!
//! The score is
//!
//! ```text
//! open_count * open + (avg_age / 10) * age + secondary_count * secondary
//! ```
//!
//! A group without any valid age contributes 0 for the age term.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::services::records::{QueryRecord, RunningMean};

/// Divisor applied to the mean age before weighting.
const AGE_SCALE_DAYS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RiskWeights {
    /// Weight per open query.
    pub open: f64,
    /// Weight per ten days of mean age.
    pub age: f64,
    /// Weight per missing page.
    pub secondary: f64,
}

impl RiskWeights {
    /// Used when a missing-pages table is merged: open queries count double and
    /// each missing page adds one point.
    pub const WITH_SECONDARY: RiskWeights = RiskWeights {
        open: 2.0,
        age: 1.0,
        secondary: 1.0,
    };

    /// Used when ranking queries alone.
    pub const PRIMARY_ONLY: RiskWeights = RiskWeights {
        open: 1.0,
        age: 1.0,
        secondary: 0.0,
    };

    pub fn score(&self, open_count: u64, avg_age: f64, secondary_count: u64) -> f64 {
        open_count as f64 * self.open
            + (avg_age / AGE_SCALE_DAYS) * self.age
            + secondary_count as f64 * self.secondary
    }
}

/// Chooses weights depending on whether a missing-pages table takes part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WeightPolicy {
    pub with_secondary: RiskWeights,
    pub primary_only: RiskWeights,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        Self {
            with_secondary: RiskWeights::WITH_SECONDARY,
            primary_only: RiskWeights::PRIMARY_ONLY,
        }
    }
}

impl WeightPolicy {
    pub fn select(&self, has_secondary: bool) -> RiskWeights {
        if has_secondary {
            self.with_secondary
        } else {
            self.primary_only
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupAggregate {
    pub total_count: u64,
    pub open_count: u64,
    ages: RunningMean,
}

impl GroupAggregate {
    fn push(&mut self, record: &QueryRecord) {
        self.total_count += 1;
        if record.is_open() {
            self.open_count += 1;
        }
        if let Some(age) = record.age_days {
            self.ages.push(age);
        }
    }

    /// Mean over rows with a valid age; `None` when there are none.
    pub fn avg_age(&self) -> Option<f64> {
        self.ages.mean()
    }
}

/// Groups records by key. Records with a blank key are not part of any group.
pub fn aggregate_by_key(records: &[QueryRecord]) -> BTreeMap<String, GroupAggregate> {
    let mut groups: BTreeMap<String, GroupAggregate> = BTreeMap::new();
    for record in records {
        let Some(key) = record.key.as_deref() else {
            continue;
        };
        groups.entry(key.to_string()).or_default().push(record);
    }
    groups
}

/// Row counts per key for the missing-pages side.
pub fn count_by_key<I>(keys: I) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct RankingRow {
    pub key: String,
    pub total_count: u64,
    pub open_count: u64,
    /// Mean age in days; 0 when the group has no valid ages or only missing pages.
    pub avg_age: f64,
    pub secondary_count: u64,
    pub risk_score: f64,
}

/// Outer-merges both sides on key, scores every row and sorts by score
/// descending. Equal scores keep ascending key order.
pub fn rank(
    primary: &BTreeMap<String, GroupAggregate>,
    secondary: Option<&BTreeMap<String, u64>>,
    weights: RiskWeights,
) -> Vec<RankingRow> {
    let mut keys: BTreeSet<&String> = primary.keys().collect();
    if let Some(secondary) = secondary {
        keys.extend(secondary.keys());
    }

    let mut rows: Vec<RankingRow> = keys
        .into_iter()
        .map(|key| {
            let group = primary.get(key).copied().unwrap_or_default();
            let secondary_count = secondary
                .and_then(|counts| counts.get(key))
                .copied()
                .unwrap_or(0);
            let avg_age = group.avg_age().unwrap_or(0.0);
            RankingRow {
                key: key.clone(),
                total_count: group.total_count,
                open_count: group.open_count,
                avg_age,
                secondary_count,
                risk_score: weights.score(group.open_count, avg_age, secondary_count),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
    rows
}
