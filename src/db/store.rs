use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{ActivityEntry, ActivityLevel, InstanceRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// The surrounding platform persists records in a document store; this core
/// only needs the operations below, so they live behind a trait. The bundled
/// implementation is an in-memory map used by the server and by tests.
///
/// Updates are last-write-wins per user. A health callback racing an
/// operator-initiated stop is resolved by whichever write lands last; the
/// provider and the instance remain the sources of truth for remote state.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn get_by_user(&self, user_id: &str) -> Result<Option<InstanceRecord>, StoreError>;
    async fn get_by_service_id(
        &self,
        service_id: &str,
    ) -> Result<Option<InstanceRecord>, StoreError>;
    async fn upsert(&self, record: InstanceRecord) -> Result<(), StoreError>;
    async fn append_activity(
        &self,
        user_id: &str,
        level: ActivityLevel,
        message: String,
    ) -> Result<(), StoreError>;
    async fn activity_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(
        &self,
        username: String,
        password_hash: String,
    ) -> Result<UserRecord, StoreError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;
}

/// In-memory store keyed by user id.
#[derive(Default)]
pub struct MemoryStore {
    instances: DashMap<String, InstanceRecord>,
    activity: DashMap<String, Vec<ActivityEntry>>,
    users: DashMap<String, UserRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for MemoryStore {
    async fn get_by_user(&self, user_id: &str) -> Result<Option<InstanceRecord>, StoreError> {
        Ok(self.instances.get(user_id).map(|r| r.clone()))
    }

    async fn get_by_service_id(
        &self,
        service_id: &str,
    ) -> Result<Option<InstanceRecord>, StoreError> {
        Ok(self
            .instances
            .iter()
            .find(|r| r.service_id.as_deref() == Some(service_id))
            .map(|r| r.clone()))
    }

    async fn upsert(&self, mut record: InstanceRecord) -> Result<(), StoreError> {
        record.updated_at = Utc::now();
        self.instances.insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn append_activity(
        &self,
        user_id: &str,
        level: ActivityLevel,
        message: String,
    ) -> Result<(), StoreError> {
        let entry = ActivityEntry {
            user_id: user_id.to_string(),
            message,
            level,
            created_at: Utc::now(),
        };
        self.activity.entry(user_id.to_string()).or_default().push(entry);
        Ok(())
    }

    async fn activity_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, StoreError> {
        let entries = self
            .activity
            .get(user_id)
            .map(|v| v.clone())
            .unwrap_or_default();
        // Newest first.
        Ok(entries.into_iter().rev().take(limit).collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        username: String,
        password_hash: String,
    ) -> Result<UserRecord, StoreError> {
        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            username,
            password_hash,
        };
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone()))
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }
}
