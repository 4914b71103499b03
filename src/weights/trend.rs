use serde::Serialize;

use super::repo_types::WeightRecord;

/// Puts records in ascending date order. Stable, so same-day entries keep
/// their insertion order.
pub fn sort_by_date(records: &mut [WeightRecord]) {
    records.sort_by_key(|r| r.date);
}

/// First/latest view over a user's log.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendSummary {
    pub count: usize,
    pub first: Option<WeightRecord>,
    pub latest: Option<WeightRecord>,
    /// latest minus first; negative means weight lost.
    pub change: Option<f64>,
}

impl TrendSummary {
    /// `records` must already be sorted by date.
    pub fn from_sorted(records: &[WeightRecord]) -> Self {
        let first = records.first().cloned();
        let latest = records.last().cloned();
        let change = match (&first, &latest) {
            (Some(f), Some(l)) => Some(l.weight - f.weight),
            _ => None,
        };
        Self {
            count: records.len(),
            first,
            latest,
            change,
        }
    }
}
