use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::RngExt;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::AuthServiceError;

/// Number of digits in a one-time code.
pub const CODE_LEN: usize = 6;

/// Smallest generated code; keeps every code at full width with no leading zero.
pub const CODE_MIN: u32 = 100_000;

/// Largest generated code.
pub const CODE_MAX: u32 = 999_999;

/// Default code time-to-live in seconds.
pub const DEFAULT_CODE_TTL_SECS: i64 = 300;

/// Default number of wrong submissions tolerated per pending code.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default upper bound on pending codes held by the in-memory store.
pub const DEFAULT_MAX_PENDING: usize = 100_000;

/// RFC 5321 path limit.
const MAX_IDENTITY_LEN: usize = 254;

/// Normalized email address a code is issued to. Key of the code store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Trim, lowercase and shape-check a claimed email address.
    pub fn parse(raw: &str) -> Result<Self, AuthServiceError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty()
            || normalized.len() > MAX_IDENTITY_LEN
            || normalized.chars().any(char::is_whitespace)
        {
            return Err(AuthServiceError::InvalidIdentity);
        }

        let (local, domain) = normalized
            .split_once('@')
            .ok_or(AuthServiceError::InvalidIdentity)?;
        if local.is_empty() || domain.contains('@') {
            return Err(AuthServiceError::InvalidIdentity);
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(AuthServiceError::InvalidIdentity);
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-width numeric one-time code, always held as a string.
///
/// No `PartialEq`: the only way to compare codes is [`Code::matches`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Draw a fresh code from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let n = rand::rng().random_range(CODE_MIN..=CODE_MAX);
        Self(n.to_string())
    }

    /// Accept exactly `CODE_LEN` ASCII digits, ignoring surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, AuthServiceError> {
        let trimmed = raw.trim();
        if trimmed.len() != CODE_LEN || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AuthServiceError::InvalidCode);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Render a numeric submission zero-padded to full width.
    pub fn from_number(n: u64) -> Result<Self, AuthServiceError> {
        Self::parse(&format!("{n:0width$}", width = CODE_LEN))
    }

    /// Constant-time equality.
    pub fn matches(&self, other: &Code) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Code(******)")
    }
}

/// Code as submitted by a client: JSON string or JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubmittedCode {
    Text(String),
    Number(u64),
}

impl SubmittedCode {
    pub fn canonicalize(self) -> Result<Code, AuthServiceError> {
        match self {
            Self::Text(s) => Code::parse(&s),
            Self::Number(n) => Code::from_number(n),
        }
    }
}

impl From<&str> for SubmittedCode {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// The single live code for an identity.
///
/// Replaced wholesale on a new request, never edited except for the
/// remaining-attempts counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCode {
    pub identity: Identity,
    pub code: Code,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Wrong submissions left before the code is discarded. `None` means unlimited.
    pub attempts_left: Option<u32>,
}

impl PendingCode {
    pub fn issue(
        identity: Identity,
        code: Code,
        now: DateTime<Utc>,
        ttl: Duration,
        max_attempts: Option<u32>,
    ) -> Self {
        Self {
            identity,
            code,
            issued_at: now,
            expires_at: now + ttl,
            attempts_left: max_attempts,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Judge a submission against this code.
    ///
    /// The code is matched before expiry is considered, so a correct but late
    /// code reports `Expired` and a wrong late code reports `Mismatch`. The
    /// caller removes the entry when [`Verification::consumes_entry`] holds.
    pub fn check(&mut self, submitted: &Code, now: DateTime<Utc>) -> Verification {
        if !self.code.matches(submitted) {
            if let Some(left) = self.attempts_left.as_mut() {
                *left = left.saturating_sub(1);
                if *left == 0 {
                    return Verification::Exhausted;
                }
            }
            return Verification::Mismatch;
        }
        if self.is_expired(now) {
            return Verification::Expired;
        }
        Verification::Verified
    }
}

/// Outcome of a verification attempt against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    NotFound,
    Mismatch,
    Expired,
    Exhausted,
}

impl Verification {
    /// Whether the pending code must be removed after this outcome.
    pub fn consumes_entry(self) -> bool {
        matches!(self, Self::Verified | Self::Expired | Self::Exhausted)
    }

    pub fn into_result(self) -> Result<(), AuthServiceError> {
        match self {
            Self::Verified => Ok(()),
            Self::NotFound => Err(AuthServiceError::CodeNotFound),
            Self::Mismatch => Err(AuthServiceError::CodeMismatch),
            Self::Expired => Err(AuthServiceError::CodeExpired),
            Self::Exhausted => Err(AuthServiceError::AttemptsExhausted),
        }
    }
}
