//! In-memory challenge store.
//!
//! Entries are removed on consume and expire after the configured TTL. Expired
//! entries that are never consumed are swept on the next save.

use crate::domain::{Challenge, ChallengeContext, ChallengeStore};
use anyhow::Result;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
    challenge: Challenge,
    expires_at: Instant,
}

pub struct MemoryChallengeStore {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl MemoryChallengeStore {
    // ---
    pub fn new(ttl: Duration) -> Self {
        // ---
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of pending (possibly expired) challenges.
    pub fn len(&self) -> usize {
        // ---
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        // ---
        self.entries.is_empty()
    }

    fn sweep_expired(&self, now: Instant) {
        // ---
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait::async_trait]
impl ChallengeStore for MemoryChallengeStore {
    // ---
    async fn save(&self, context: &ChallengeContext, challenge: &Challenge) -> Result<()> {
        // ---
        let now = Instant::now();
        self.sweep_expired(now);
        self.entries.insert(
            context.as_str().to_string(),
            Entry {
                challenge: challenge.clone(),
                expires_at: now + self.ttl,
            },
        );
        Ok(())
    }

    async fn consume(&self, context: &ChallengeContext) -> Result<Option<Challenge>> {
        // ---
        // DashMap::remove is atomic per key: one caller gets the entry.
        let Some((_, entry)) = self.entries.remove(context.as_str()) else {
            return Ok(None);
        };
        if entry.expires_at > Instant::now() {
            Ok(Some(entry.challenge))
        } else {
            tracing::debug!(%context, "Challenge expired before use");
            Ok(None)
        }
    }

    async fn ping(&self) -> Result<()> {
        // ---
        Ok(())
    }
}

impl std::fmt::Debug for MemoryChallengeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChallengeStore")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::domain::Ceremony;
    use std::sync::Arc;

    fn challenge(seed: u8) -> Challenge {
        // ---
        Challenge::new(vec![seed; 24])
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        // ---
        let store = MemoryChallengeStore::new(Duration::from_secs(60));
        let challenge = challenge(1);
        let context = ChallengeContext::new(Ceremony::Attestation, &challenge);

        store.save(&context, &challenge).await.unwrap();
        assert_eq!(store.consume(&context).await.unwrap(), Some(challenge));
        assert_eq!(store.consume(&context).await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn ceremonies_do_not_share_entries() {
        // ---
        let store = MemoryChallengeStore::new(Duration::from_secs(60));
        let challenge = challenge(2);
        let attestation = ChallengeContext::new(Ceremony::Attestation, &challenge);
        let assertion = ChallengeContext::new(Ceremony::Assertion, &challenge);

        store.save(&attestation, &challenge).await.unwrap();
        assert_eq!(store.consume(&assertion).await.unwrap(), None);
        assert!(store.consume(&attestation).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_challenges_are_never_returned() {
        // ---
        let store = MemoryChallengeStore::new(Duration::from_millis(20));
        let challenge = challenge(3);
        let context = ChallengeContext::new(Ceremony::Assertion, &challenge);

        store.save(&context, &challenge).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.consume(&context).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_sweeps_expired_entries() {
        // ---
        let store = MemoryChallengeStore::new(Duration::from_millis(20));
        for seed in 0..5 {
            let challenge = challenge(seed);
            let context = ChallengeContext::new(Ceremony::Assertion, &challenge);
            store.save(&context, &challenge).await.unwrap();
        }
        assert_eq!(store.len(), 5);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let fresh = challenge(99);
        store
            .save(&ChallengeContext::new(Ceremony::Assertion, &fresh), &fresh)
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consumers_get_one_winner() {
        // ---
        let store = Arc::new(MemoryChallengeStore::new(Duration::from_secs(60)));
        let challenge = challenge(4);
        let context = ChallengeContext::new(Ceremony::Assertion, &challenge);
        store.save(&context, &challenge).await.unwrap();

        let attempts: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                let context = context.clone();
                tokio::spawn(async move { store.consume(&context).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
