//! Age-bucket classification for open queries.

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
pub enum AgingBucket {
    #[serde(rename = "0-7")]
    UpToWeek,
    #[serde(rename = "8-14")]
    UpToTwoWeeks,
    #[serde(rename = "15-30")]
    UpToMonth,
    #[serde(rename = ">30")]
    OverMonth,
}

impl AgingBucket {
    /// Every bucket, youngest first.
    pub const ALL: [AgingBucket; 4] = [
        AgingBucket::UpToWeek,
        AgingBucket::UpToTwoWeeks,
        AgingBucket::UpToMonth,
        AgingBucket::OverMonth,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::UpToWeek => "0-7",
            Self::UpToTwoWeeks => "8-14",
            Self::UpToMonth => "15-30",
            Self::OverMonth => ">30",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::UpToWeek => 0,
            Self::UpToTwoWeeks => 1,
            Self::UpToMonth => 2,
            Self::OverMonth => 3,
        }
    }
}

impl std::fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A row whose age could not be read as a finite number of days.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("age is not a finite number of days")]
pub struct InvalidAge;

/// Classifies an age in days. Upper bounds are inclusive: 7 is `0-7`, 14 is
/// `8-14`, 30 is `15-30`. Negative ages fall into `0-7`.
pub fn classify_age(age_days: f64) -> Result<AgingBucket, InvalidAge> {
    if !age_days.is_finite() {
        return Err(InvalidAge);
    }
    let bucket = if age_days <= 7.0 {
        AgingBucket::UpToWeek
    } else if age_days <= 14.0 {
        AgingBucket::UpToTwoWeeks
    } else if age_days <= 30.0 {
        AgingBucket::UpToMonth
    } else {
        AgingBucket::OverMonth
    };
    Ok(bucket)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct BucketCount {
    pub bucket: AgingBucket,
    pub count: u64,
}

/// Per-bucket counts that always carry all four buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgingHistogram {
    counts: [u64; 4],
}

impl AgingHistogram {
    pub fn record(&mut self, bucket: AgingBucket) {
        self.counts[bucket.index()] += 1;
    }

    pub fn count(&self, bucket: AgingBucket) -> u64 {
        self.counts[bucket.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn entries(&self) -> Vec<BucketCount> {
        AgingBucket::ALL
            .iter()
            .map(|&bucket| BucketCount {
                bucket,
                count: self.count(bucket),
            })
            .collect()
    }
}

impl FromIterator<AgingBucket> for AgingHistogram {
    fn from_iter<I: IntoIterator<Item = AgingBucket>>(iter: I) -> Self {
        let mut histogram = AgingHistogram::default();
        for bucket in iter {
            histogram.record(bucket);
        }
        histogram
    }
}
