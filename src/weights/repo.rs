use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::weights::repo_types::WeightRecord;

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<WeightRecord>> {
    let rows = sqlx::query_as::<_, WeightRecord>(
        r#"
        SELECT user_id, date, weight
          FROM weight_records
         WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list weight records by user")?;
    Ok(rows)
}

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<WeightRecord>> {
    let rows = sqlx::query_as::<_, WeightRecord>(
        r#"
        SELECT user_id, date, weight
          FROM weight_records
        "#,
    )
    .fetch_all(db)
    .await
    .context("list weight records")?;
    Ok(rows)
}

pub async fn insert(db: &PgPool, record: &WeightRecord) -> anyhow::Result<WeightRecord> {
    let row = sqlx::query_as::<_, WeightRecord>(
        r#"
        INSERT INTO weight_records (user_id, date, weight)
        VALUES ($1, $2, $3)
        RETURNING user_id, date, weight
        "#,
    )
    .bind(record.user_id)
    .bind(record.date)
    .bind(record.weight)
    .fetch_one(db)
    .await
    .context("insert weight record")?;
    Ok(row)
}
