use anyhow::Context as _;
use chrono::{DateTime, Utc};
use deadpool_redis::Pool;
use deadpool_redis::redis::{self, AsyncCommands};

use crate::domain::repository::CodeStore;
use crate::domain::types::{Code, Identity, PendingCode, Verification};
use crate::error::AuthServiceError;

/// Seconds a record outlives its `expires_at`, so a late but correct
/// submission still reports `Expired` instead of `NotFound`.
pub const EXPIRED_GRACE_SECS: i64 = 60;

/// Optimistic-transaction retries before giving up on a contended key.
const MAX_VERIFY_ROUNDS: usize = 8;

/// Redis-backed code store. Records are JSON `PendingCode`s under `otc:{email}`.
///
/// Expired keys are evicted by Redis itself; `verify` runs as a
/// `WATCH`/`MULTI`/`EXEC` transaction and retries when the key changes underneath.
#[derive(Clone)]
pub struct RedisCodeStore {
    pub pool: Pool,
}

fn code_key(identity: &Identity) -> String {
    format!("otc:{}", identity)
}

fn key_ttl_secs(pending: &PendingCode) -> u64 {
    let secs = (pending.expires_at - pending.issued_at).num_seconds() + EXPIRED_GRACE_SECS;
    secs.max(1) as u64
}

/// Result of one optimistic round: `None` when `EXEC` was aborted.
type Round = Option<Verification>;

/// What a verification round commits inside `MULTI`/`EXEC`.
#[derive(Debug, PartialEq, Eq)]
enum RoundWrite {
    Delete,
    /// Re-encoded record with the decremented attempt counter; written with
    /// `KEEPTTL` so the key keeps its original deadline.
    KeepTtl(String),
    Nothing,
}

/// Judge a submission against the raw stored record and plan the write.
///
/// Touches no connection.
fn decide_round(
    raw: Option<&str>,
    submitted: &Code,
    now: DateTime<Utc>,
) -> Result<(Verification, RoundWrite), AuthServiceError> {
    let Some(raw) = raw else {
        return Ok((Verification::NotFound, RoundWrite::Nothing));
    };
    let mut pending: PendingCode = serde_json::from_str(raw).context("decode pending code")?;

    let attempts_before = pending.attempts_left;
    let outcome = pending.check(submitted, now);
    let write = plan_write(outcome, attempts_before, &pending)?;
    Ok((outcome, write))
}

fn plan_write(
    outcome: Verification,
    attempts_before: Option<u32>,
    pending: &PendingCode,
) -> Result<RoundWrite, AuthServiceError> {
    if outcome.consumes_entry() {
        return Ok(RoundWrite::Delete);
    }
    if pending.attempts_left != attempts_before {
        let json = serde_json::to_string(pending).context("encode pending code")?;
        return Ok(RoundWrite::KeepTtl(json));
    }
    Ok(RoundWrite::Nothing)
}

impl RedisCodeStore {
    async fn verify_round(
        conn: &mut deadpool_redis::Connection,
        key: &str,
        submitted: &Code,
        now: DateTime<Utc>,
    ) -> Result<Round, AuthServiceError> {
        let (): () = redis::cmd("WATCH")
            .arg(key)
            .query_async(conn)
            .await
            .context("watch pending code")?;

        let raw: Option<String> = conn.get(key).await.context("load pending code")?;
        let (outcome, write) = decide_round(raw.as_deref(), submitted, now)?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        match write {
            RoundWrite::Delete => {
                pipe.del(key);
            }
            RoundWrite::KeepTtl(json) => {
                pipe.cmd("SET").arg(key).arg(json).arg("KEEPTTL");
            }
            RoundWrite::Nothing => {
                unwatch(conn).await?;
                return Ok(Some(outcome));
            }
        }

        let committed: Option<redis::Value> = pipe
            .query_async(conn)
            .await
            .context("commit verification")?;
        Ok(committed.map(|_| outcome))
    }
}

async fn unwatch(conn: &mut deadpool_redis::Connection) -> Result<(), AuthServiceError> {
    let (): () = redis::cmd("UNWATCH")
        .query_async(conn)
        .await
        .context("unwatch pending code")?;
    Ok(())
}

impl CodeStore for RedisCodeStore {
    async fn upsert(&self, pending: PendingCode) -> Result<(), AuthServiceError> {
        let mut conn = self.pool.get().await.context("get redis connection")?;
        let key = code_key(&pending.identity);
        let ttl = key_ttl_secs(&pending);
        let json = serde_json::to_string(&pending).context("encode pending code")?;
        let (): () = conn
            .set_ex(&key, json, ttl)
            .await
            .context("store pending code")?;
        Ok(())
    }

    async fn verify(
        &self,
        identity: &Identity,
        submitted: &Code,
        now: DateTime<Utc>,
    ) -> Result<Verification, AuthServiceError> {
        let mut conn = self.pool.get().await.context("get redis connection")?;
        let key = code_key(identity);

        for round in 1..=MAX_VERIFY_ROUNDS {
            match Self::verify_round(&mut conn, &key, submitted, now).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {
                    tracing::debug!(round, "pending code changed during verification, retrying");
                }
                Err(e) => {
                    // Leave no WATCH behind on a pooled connection.
                    let _ = unwatch(&mut conn).await;
                    return Err(e);
                }
            }
        }
        Err(anyhow::anyhow!("verification kept conflicting after {MAX_VERIFY_ROUNDS} rounds").into())
    }

    async fn sweep_expired(&self, _now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        Ok(0)
    }
}
