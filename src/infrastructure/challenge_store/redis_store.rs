//! Redis-backed challenge store.
//!
//! `SET key value EX ttl` on save and `GETDEL key` on consume, so expiry and
//! single use are enforced by the server even across several RP instances.

use crate::domain::{Challenge, ChallengeContext, ChallengeStore};
use anyhow::{Context, Result};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;

pub struct RedisChallengeStore {
    client: Client,
    ttl: Duration,
}

impl RedisChallengeStore {
    // ---
    pub fn new(client: Client, ttl: Duration) -> Self {
        // ---
        Self { client, ttl }
    }

    async fn conn(&self) -> Result<MultiplexedConnection> {
        // ---
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("failed to connect to Redis")
    }
}

#[async_trait::async_trait]
impl ChallengeStore for RedisChallengeStore {
    // ---
    async fn save(&self, context: &ChallengeContext, challenge: &Challenge) -> Result<()> {
        // ---
        let mut conn = self.conn().await?;
        let ttl_secs = self.ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(context.as_str(), challenge.as_bytes(), ttl_secs)
            .await
            .with_context(|| format!("failed to store challenge {context}"))?;

        tracing::debug!(%context, ttl_secs, "Stored challenge in Redis");
        Ok(())
    }

    async fn consume(&self, context: &ChallengeContext) -> Result<Option<Challenge>> {
        // ---
        let mut conn = self.conn().await?;
        let bytes: Option<Vec<u8>> = conn
            .get_del(context.as_str())
            .await
            .with_context(|| format!("failed to consume challenge {context}"))?;

        Ok(bytes.map(Challenge::new))
    }

    async fn ping(&self) -> Result<()> {
        // ---
        let mut conn = self.conn().await?;
        let _: String = conn.ping().await.context("Redis ping failed")?;
        Ok(())
    }
}
