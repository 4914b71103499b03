use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{join_records, UserStore, WeightStore};
use crate::auth::repo_types::{NewUser, User};
use crate::weights::repo_types::WeightRecord;

/// In-process store with the same uniqueness rules as the schema.
/// Counts every call so tests can assert that nothing reached the store.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    weights: Mutex<Vec<WeightRecord>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn users(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Vec<User>>> {
        self.users
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))
    }

    fn weights(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Vec<WeightRecord>>> {
        self.weights
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))
    }

    /// Direct edit used to simulate another writer changing a record.
    pub fn set_role(&self, id: Uuid, role: crate::auth::repo_types::Role) -> anyhow::Result<()> {
        let mut users = self.users()?;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| anyhow::anyhow!("no user {id}"))?;
        user.role = role;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.touch();
        Ok(self.users()?.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        self.touch();
        Ok(self.users()?.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, new: NewUser) -> anyhow::Result<User> {
        self.touch();
        let mut users = self.users()?;
        if users.iter().any(|u| u.email == new.email) {
            anyhow::bail!("duplicate key value violates unique constraint \"users_email_key\"");
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            first_name: new.first_name,
            last_name: new.last_name,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_password_by_id(&self, id: Uuid, hash: &str) -> anyhow::Result<u64> {
        self.touch();
        let mut n = 0;
        for u in self.users()?.iter_mut().filter(|u| u.id == id) {
            u.password_hash = hash.to_string();
            n += 1;
        }
        Ok(n)
    }

    async fn update_password_by_email(&self, email: &str, hash: &str) -> anyhow::Result<u64> {
        self.touch();
        let mut n = 0;
        for u in self.users()?.iter_mut().filter(|u| u.email == email) {
            u.password_hash = hash.to_string();
            n += 1;
        }
        Ok(n)
    }
}

#[async_trait]
impl WeightStore for MemoryStore {
    async fn list_weight_records(&self, user_id: Uuid) -> anyhow::Result<Vec<WeightRecord>> {
        self.touch();
        Ok(self
            .weights()?
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_weight_record(&self, record: WeightRecord) -> anyhow::Result<WeightRecord> {
        self.touch();
        if !self.users()?.iter().any(|u| u.id == record.user_id) {
            anyhow::bail!("weight_records_user_id_fkey violated");
        }
        self.weights()?.push(record.clone());
        Ok(record)
    }

    async fn list_users_with_weight_records(
        &self,
    ) -> anyhow::Result<Vec<(User, Vec<WeightRecord>)>> {
        self.touch();
        let users = self.users()?.clone();
        let records = self.weights()?.clone();
        Ok(join_records(users, records))
    }
}
