use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::weights::repo_types::WeightRecord;

mod memory;

pub use memory::MemoryStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn insert_user(&self, new: NewUser) -> anyhow::Result<User>;
    /// Returns rows affected.
    async fn update_password_by_id(&self, id: Uuid, hash: &str) -> anyhow::Result<u64>;
    /// Returns rows affected.
    async fn update_password_by_email(&self, email: &str, hash: &str) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait WeightStore: Send + Sync {
    async fn list_weight_records(&self, user_id: Uuid) -> anyhow::Result<Vec<WeightRecord>>;
    async fn insert_weight_record(&self, record: WeightRecord) -> anyhow::Result<WeightRecord>;
    async fn list_users_with_weight_records(
        &self,
    ) -> anyhow::Result<Vec<(User, Vec<WeightRecord>)>>;
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        User::find_by_email(&self.db, email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        User::find_by_id(&self.db, id).await
    }

    async fn insert_user(&self, new: NewUser) -> anyhow::Result<User> {
        User::create(&self.db, &new).await
    }

    async fn update_password_by_id(&self, id: Uuid, hash: &str) -> anyhow::Result<u64> {
        User::set_password_by_id(&self.db, id, hash).await
    }

    async fn update_password_by_email(&self, email: &str, hash: &str) -> anyhow::Result<u64> {
        User::set_password_by_email(&self.db, email, hash).await
    }
}

#[async_trait]
impl WeightStore for PgStore {
    async fn list_weight_records(&self, user_id: Uuid) -> anyhow::Result<Vec<WeightRecord>> {
        crate::weights::repo::list_by_user(&self.db, user_id).await
    }

    async fn insert_weight_record(&self, record: WeightRecord) -> anyhow::Result<WeightRecord> {
        crate::weights::repo::insert(&self.db, &record).await
    }

    async fn list_users_with_weight_records(
        &self,
    ) -> anyhow::Result<Vec<(User, Vec<WeightRecord>)>> {
        let users = User::list_all(&self.db).await?;
        let records = crate::weights::repo::list_all(&self.db).await?;
        Ok(join_records(users, records))
    }
}

pub(crate) fn join_records(
    users: Vec<User>,
    records: Vec<WeightRecord>,
) -> Vec<(User, Vec<WeightRecord>)> {
    let mut by_user: HashMap<Uuid, Vec<WeightRecord>> = HashMap::new();
    for r in records {
        by_user.entry(r.user_id).or_default().push(r);
    }
    users
        .into_iter()
        .map(|u| {
            let recs = by_user.remove(&u.id).unwrap_or_default();
            (u, recs)
        })
        .collect()
}
