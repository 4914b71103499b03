use serde::{Deserialize, Serialize};
use time::Date;

use super::repo_types::WeightRecord;
use super::trend::TrendSummary;
use crate::auth::repo_types::Principal;

#[derive(Debug, Deserialize)]
pub struct NewWeightRequest {
    pub date: Date,
    pub weight: f64,
}

#[derive(Debug, Serialize)]
pub struct WeightLogResponse {
    pub user: Principal,
    /// Ascending by date.
    pub records: Vec<WeightRecord>,
    pub summary: TrendSummary,
}
