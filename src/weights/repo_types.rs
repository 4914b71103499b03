use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

/// One measurement. The store returns these in no particular order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WeightRecord {
    pub user_id: Uuid,
    pub date: Date,
    pub weight: f64,
}
