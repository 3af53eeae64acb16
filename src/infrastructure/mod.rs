pub(crate) mod challenge_store;
pub(crate) mod database;
pub mod metrics;
mod options;
mod users;
mod webauthn;

// Re-export the factory functions for easy access
pub use challenge_store::{MemoryChallengeStore, RedisChallengeStore};
pub use database::{connect_with_retry, MemoryRepository, PostgresRepository};
pub use metrics::{create_noop_metrics, create_prom_metrics};
pub use options::{DefaultOptionsProvider, DEFAULT_ALGORITHMS};
pub use users::{ProvisionUnknownUser, RejectUnknownUser};
pub use webauthn::{create_webauthn, WebauthnRsVerifier};
