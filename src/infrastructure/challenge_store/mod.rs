mod memory;
mod redis_store;

pub use memory::MemoryChallengeStore;
pub use redis_store::RedisChallengeStore;

use crate::domain::ChallengeStorePtr;
use std::sync::Arc;
use std::time::Duration;

/// Creates the Redis-backed challenge store.
///
/// The client connects lazily; an unreachable server surfaces on first use.
pub fn create_redis(url: &str, ttl: Duration) -> anyhow::Result<ChallengeStorePtr> {
    tracing::info!("Using Redis challenge store");
    let client = ::redis::Client::open(url)?;
    Ok(Arc::new(RedisChallengeStore::new(client, ttl)))
}

/// Creates the in-process challenge store.
///
/// Challenges do not survive a restart and are not shared between instances.
pub fn create_memory(ttl: Duration) -> ChallengeStorePtr {
    tracing::info!("Using in-memory challenge store");
    Arc::new(MemoryChallengeStore::new(ttl))
}
