#![allow(async_fn_in_trait)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::types::{Code, Identity, PendingCode, Verification};
use crate::error::AuthServiceError;

/// Owner of every pending code. All access goes through these operations.
pub trait CodeStore: Send + Sync {
    /// Insert the code, replacing any pending code for the same identity.
    async fn upsert(&self, pending: PendingCode) -> Result<(), AuthServiceError>;

    /// Look up, judge and (when consumed) remove the identity's code as one
    /// atomic step with respect to every other operation on that identity.
    async fn verify(
        &self,
        identity: &Identity,
        submitted: &Code,
        now: DateTime<Utc>,
    ) -> Result<Verification, AuthServiceError>;

    /// Remove every code expired at `now`. Returns how many were removed.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError>;
}

/// Delivery transport for freshly issued codes.
pub trait CodeMailer: Send + Sync {
    async fn send_code(
        &self,
        to: &Identity,
        code: &Code,
        ttl: Duration,
    ) -> Result<(), AuthServiceError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<T: CodeMailer> CodeMailer for Arc<T> {
    async fn send_code(
        &self,
        to: &Identity,
        code: &Code,
        ttl: Duration,
    ) -> Result<(), AuthServiceError> {
        (**self).send_code(to, code, ttl).await
    }
}
