use super::challenge::{Challenge, ChallengeContext};
use anyhow::Result;
use std::sync::Arc;

/// Holds issued challenges until the result phase consumes them.
///
/// Implementations must make `consume` an atomic compare-and-clear: for one `save`, at
/// most one `consume` returns `Some`, even under concurrent callers. Expired entries
/// must never be returned.
#[async_trait::async_trait]
pub trait ChallengeStore: Send + Sync {
    // ---
    /// Store a challenge under its context for the configured TTL.
    async fn save(&self, context: &ChallengeContext, challenge: &Challenge) -> Result<()>;

    /// Remove and return the challenge. `None` when unknown, expired or already consumed.
    async fn consume(&self, context: &ChallengeContext) -> Result<Option<Challenge>>;

    /// Connectivity probe used by the full health check.
    async fn ping(&self) -> Result<()>;
}

/// Type alias for any backend that implements ChallengeStore.
pub type ChallengeStorePtr = Arc<dyn ChallengeStore>;
