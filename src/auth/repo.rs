use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserRow};

const USER_COLUMNS: &str = "id, email, password_hash, role, first_name, last_name, created_at";

impl User {
    /// Find a user by email. Exact, case-sensitive match.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        row.map(User::try_from).transpose()
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        row.map(User::try_from).transpose()
    }

    /// Create a new user with hashed password.
    pub async fn create(db: &PgPool, new: &NewUser) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, password_hash, role, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(&new.first_name)
        .bind(&new.last_name)
        .fetch_one(db)
        .await
        .context("insert user")?;
        User::try_from(row)
    }

    /// Returns the number of rows touched.
    pub async fn set_password_by_id(db: &PgPool, id: Uuid, hash: &str) -> anyhow::Result<u64> {
        let res = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(hash)
            .bind(id)
            .execute(db)
            .await
            .context("update password by id")?;
        Ok(res.rows_affected())
    }

    pub async fn set_password_by_email(
        db: &PgPool,
        email: &str,
        hash: &str,
    ) -> anyhow::Result<u64> {
        let res = sqlx::query("UPDATE users SET password_hash = $1 WHERE email = $2")
            .bind(hash)
            .bind(email)
            .execute(db)
            .await
            .context("update password by email")?;
        Ok(res.rows_affected())
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users"))
            .fetch_all(db)
            .await
            .context("list users")?;
        rows.into_iter().map(User::try_from).collect()
    }
}
