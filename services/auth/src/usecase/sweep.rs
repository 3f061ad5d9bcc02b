use crate::domain::repository::{Clock, CodeStore};
use crate::error::AuthServiceError;

pub struct SweepExpiredUseCase<S, C>
where
    S: CodeStore,
    C: Clock,
{
    pub codes: S,
    pub clock: C,
}

impl<S, C> SweepExpiredUseCase<S, C>
where
    S: CodeStore,
    C: Clock,
{
    /// Evict every code expired as of now. Returns the number removed.
    pub async fn execute(&self) -> Result<u64, AuthServiceError> {
        self.codes.sweep_expired(self.clock.now()).await
    }
}
