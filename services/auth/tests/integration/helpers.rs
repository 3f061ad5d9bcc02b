use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use mailcode_auth::domain::repository::{Clock, CodeMailer};
use mailcode_auth::domain::types::{Code, Identity, PendingCode};
use mailcode_auth::error::AuthServiceError;
use mailcode_auth::infra::memory::InMemoryCodeStore;
use mailcode_auth::usecase::otc::{CodePolicy, RequestCodeUseCase, VerifyCodeUseCase};

// ── ManualClock ──────────────────────────────────────────────────────────────

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ── RecordingMailer ──────────────────────────────────────────────────────────

/// Captures every delivery as `(email, code)`.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingMailer {
    pub fn sent_handle(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        Arc::clone(&self.sent)
    }
}

impl CodeMailer for RecordingMailer {
    async fn send_code(
        &self,
        to: &Identity,
        code: &Code,
        _ttl: Duration,
    ) -> Result<(), AuthServiceError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), code.to_string()));
        Ok(())
    }
}

// ── FailingMailer ────────────────────────────────────────────────────────────

pub struct FailingMailer;

impl CodeMailer for FailingMailer {
    async fn send_code(
        &self,
        _to: &Identity,
        _code: &Code,
        _ttl: Duration,
    ) -> Result<(), AuthServiceError> {
        Err(AuthServiceError::DeliveryFailed(anyhow::anyhow!(
            "smtp connection refused"
        )))
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub const TEST_EMAIL: &str = "a@b.com";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

pub fn identity(email: &str) -> Identity {
    Identity::parse(email).unwrap()
}

pub fn fresh_store() -> InMemoryCodeStore {
    InMemoryCodeStore::new(1024)
}

/// A pending code with a known value, issued at the clock's current time.
pub fn known_code(email: &str, code: &str, clock: &ManualClock, policy: CodePolicy) -> PendingCode {
    PendingCode::issue(
        identity(email),
        Code::parse(code).unwrap(),
        clock.now(),
        policy.ttl,
        policy.max_attempts,
    )
}

pub fn request_usecase(
    store: &InMemoryCodeStore,
    clock: &ManualClock,
    policy: CodePolicy,
) -> RequestCodeUseCase<InMemoryCodeStore, ManualClock> {
    RequestCodeUseCase {
        codes: store.clone(),
        clock: clock.clone(),
        policy,
    }
}

pub fn verify_usecase(
    store: &InMemoryCodeStore,
    clock: &ManualClock,
) -> VerifyCodeUseCase<InMemoryCodeStore, ManualClock> {
    VerifyCodeUseCase {
        codes: store.clone(),
        clock: clock.clone(),
    }
}
