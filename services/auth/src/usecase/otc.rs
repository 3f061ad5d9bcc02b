use chrono::{DateTime, Duration, Utc};

use crate::domain::repository::{Clock, CodeMailer, CodeStore};
use crate::domain::types::{
    Code, DEFAULT_CODE_TTL_SECS, DEFAULT_MAX_ATTEMPTS, Identity, PendingCode, SubmittedCode,
};
use crate::error::AuthServiceError;

/// Issuance rules applied to every new code.
#[derive(Debug, Clone, Copy)]
pub struct CodePolicy {
    pub ttl: Duration,
    /// `None` allows unlimited wrong submissions within the TTL.
    pub max_attempts: Option<u32>,
}

impl Default for CodePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(DEFAULT_CODE_TTL_SECS),
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
        }
    }
}

// ── RequestCode ──────────────────────────────────────────────────────────────

pub struct RequestCodeInput {
    pub email: String,
}

/// A freshly stored code. The caller owns delivery.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub identity: Identity,
    pub code: Code,
    pub expires_at: DateTime<Utc>,
}

pub struct RequestCodeUseCase<S, C>
where
    S: CodeStore,
    C: Clock,
{
    pub codes: S,
    pub clock: C,
    pub policy: CodePolicy,
}

impl<S, C> RequestCodeUseCase<S, C>
where
    S: CodeStore,
    C: Clock,
{
    pub async fn execute(&self, input: RequestCodeInput) -> Result<IssuedCode, AuthServiceError> {
        let identity = Identity::parse(&input.email)?;
        let code = Code::generate();
        let pending = PendingCode::issue(
            identity.clone(),
            code.clone(),
            self.clock.now(),
            self.policy.ttl,
            self.policy.max_attempts,
        );
        let expires_at = pending.expires_at;

        // Replaces any earlier code for this identity.
        self.codes.upsert(pending).await?;

        Ok(IssuedCode {
            identity,
            code,
            expires_at,
        })
    }
}

// ── SendCode (request + delivery) ────────────────────────────────────────────

pub struct SendCodeUseCase<S, C, M>
where
    S: CodeStore,
    C: Clock,
    M: CodeMailer,
{
    pub request: RequestCodeUseCase<S, C>,
    pub mailer: M,
}

impl<S, C, M> SendCodeUseCase<S, C, M>
where
    S: CodeStore,
    C: Clock,
    M: CodeMailer,
{
    /// Issue a code and email it. A failed delivery leaves the stored code in
    /// place; the user recovers by requesting again.
    pub async fn execute(&self, input: RequestCodeInput) -> Result<IssuedCode, AuthServiceError> {
        let issued = self.request.execute(input).await?;
        self.mailer
            .send_code(&issued.identity, &issued.code, self.request.policy.ttl)
            .await?;
        Ok(issued)
    }
}

// ── VerifyCode ───────────────────────────────────────────────────────────────

pub struct VerifyCodeInput {
    pub email: String,
    pub code: Option<SubmittedCode>,
}

pub struct VerifyCodeUseCase<S, C>
where
    S: CodeStore,
    C: Clock,
{
    pub codes: S,
    pub clock: C,
}

impl<S, C> VerifyCodeUseCase<S, C>
where
    S: CodeStore,
    C: Clock,
{
    /// Consume the identity's pending code. Returns the verified identity.
    pub async fn execute(&self, input: VerifyCodeInput) -> Result<Identity, AuthServiceError> {
        let identity = Identity::parse(&input.email)?;
        let submitted = input
            .code
            .ok_or(AuthServiceError::InvalidCode)?
            .canonicalize()?;

        self.codes
            .verify(&identity, &submitted, self.clock.now())
            .await?
            .into_result()?;

        Ok(identity)
    }
}
