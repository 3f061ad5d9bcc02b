use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::domain::repository::CodeStore;
use crate::domain::types::{Code, Identity, PendingCode, Verification};
use crate::error::AuthServiceError;

/// Pending codes plus an index ordered by expiry.
///
/// Both collections always hold the same identities; every mutation goes
/// through `insert`/`remove` so they cannot drift.
#[derive(Default)]
struct Codes {
    by_identity: HashMap<Identity, PendingCode>,
    by_expiry: BTreeSet<(DateTime<Utc>, Identity)>,
}

impl Codes {
    fn len(&self) -> usize {
        self.by_identity.len()
    }

    fn insert(&mut self, pending: PendingCode) {
        self.by_expiry
            .insert((pending.expires_at, pending.identity.clone()));
        if let Some(old) = self.by_identity.insert(pending.identity.clone(), pending) {
            self.by_expiry.remove(&(old.expires_at, old.identity));
        }
    }

    fn remove(&mut self, identity: &Identity) -> Option<PendingCode> {
        let old = self.by_identity.remove(identity)?;
        self.by_expiry
            .remove(&(old.expires_at, old.identity.clone()));
        Some(old)
    }

    /// Pops entries off the front of the expiry index; cost is proportional
    /// to the number removed.
    fn evict_expired(&mut self, now: DateTime<Utc>) -> u64 {
        let mut removed = 0;
        while let Some((expires_at, _)) = self.by_expiry.first() {
            if *expires_at >= now {
                break;
            }
            if let Some((_, identity)) = self.by_expiry.pop_first() {
                self.by_identity.remove(&identity);
                removed += 1;
            }
        }
        removed
    }
}

/// Process-local code store.
///
/// One mutex guards the whole map and every operation holds it for its full
/// read-decide-write sequence, so two racing verifications of the same code
/// cannot both observe `Verified`. No lock is held across an `.await`.
#[derive(Clone)]
pub struct InMemoryCodeStore {
    codes: Arc<Mutex<Codes>>,
    capacity: usize,
}

impl InMemoryCodeStore {
    /// `capacity` bounds the number of identities with a pending code.
    pub fn new(capacity: usize) -> Self {
        Self {
            codes: Arc::new(Mutex::new(Codes::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the pending code for `identity`, if any.
    pub fn get(&self, identity: &Identity) -> Option<PendingCode> {
        self.lock().by_identity.get(identity).cloned()
    }

    // A panicking holder cannot leave `Codes` half-updated, so a poisoned
    // lock is recovered rather than reported.
    fn lock(&self) -> MutexGuard<'_, Codes> {
        self.codes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CodeStore for InMemoryCodeStore {
    async fn upsert(&self, pending: PendingCode) -> Result<(), AuthServiceError> {
        let mut codes = self.lock();
        if !codes.by_identity.contains_key(&pending.identity) && codes.len() >= self.capacity {
            codes.evict_expired(pending.issued_at);
            if codes.len() >= self.capacity {
                return Err(AuthServiceError::StoreFull);
            }
        }
        codes.insert(pending);
        Ok(())
    }

    async fn verify(
        &self,
        identity: &Identity,
        submitted: &Code,
        now: DateTime<Utc>,
    ) -> Result<Verification, AuthServiceError> {
        let mut codes = self.lock();
        let Some(pending) = codes.by_identity.get_mut(identity) else {
            return Ok(Verification::NotFound);
        };
        // `check` only touches the attempt counter, never `expires_at`.
        let outcome = pending.check(submitted, now);
        if outcome.consumes_entry() {
            codes.remove(identity);
        }
        Ok(outcome)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        Ok(self.lock().evict_expired(now))
    }
}
