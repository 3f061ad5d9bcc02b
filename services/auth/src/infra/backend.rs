use chrono::{DateTime, Utc};

use crate::domain::repository::CodeStore;
use crate::domain::types::{Code, Identity, PendingCode, Verification};
use crate::error::AuthServiceError;
use crate::infra::memory::InMemoryCodeStore;
use crate::infra::cache::RedisCodeStore;

/// Code store selected at startup.
#[derive(Clone)]
pub enum CodeBackend {
    Memory(InMemoryCodeStore),
    Redis(RedisCodeStore),
}

impl CodeBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }
}

impl CodeStore for CodeBackend {
    async fn upsert(&self, pending: PendingCode) -> Result<(), AuthServiceError> {
        match self {
            Self::Memory(store) => store.upsert(pending).await,
            Self::Redis(store) => store.upsert(pending).await,
        }
    }

    async fn verify(
        &self,
        identity: &Identity,
        submitted: &Code,
        now: DateTime<Utc>,
    ) -> Result<Verification, AuthServiceError> {
        match self {
            Self::Memory(store) => store.verify(identity, submitted, now).await,
            Self::Redis(store) => store.verify(identity, submitted, now).await,
        }
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        match self {
            Self::Memory(store) => store.sweep_expired(now).await,
            Self::Redis(store) => store.sweep_expired(now).await,
        }
    }
}
