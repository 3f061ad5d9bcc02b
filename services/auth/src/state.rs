use std::sync::Arc;

use axum::extract::FromRef;
use mailcode_core::health::Readiness;

use crate::infra::backend::CodeBackend;
use crate::infra::clock::SystemClock;
use crate::infra::mailer::EmailSender;
use crate::usecase::otc::CodePolicy;

/// Shared application state passed to every handler via axum `State`.
///
/// Holds the single code store for the process; build a fresh one per test.
#[derive(Clone)]
pub struct AppState {
    pub codes: CodeBackend,
    pub mailer: Arc<EmailSender>,
    pub policy: CodePolicy,
    pub readiness: Readiness,
}

impl AppState {
    pub fn code_store(&self) -> CodeBackend {
        self.codes.clone()
    }

    pub fn mailer(&self) -> Arc<EmailSender> {
        Arc::clone(&self.mailer)
    }

    pub fn clock(&self) -> SystemClock {
        SystemClock
    }
}

impl FromRef<AppState> for Readiness {
    fn from_ref(state: &AppState) -> Self {
        state.readiness.clone()
    }
}
