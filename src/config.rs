// src/config.rs

//! Application configuration loaded from environment variables.
//!
//! This module defines all startup-time configuration for the service.
//! Configuration is validated eagerly and failures are treated as
//! deployment errors rather than recoverable runtime conditions.

use anyhow::Result;
use std::time::Duration;

// ============================================================
// Local macros (config-only, intentionally explicit)
// ============================================================

/// Reads a required environment variable.
///
/// # Behavior
/// - Fails fast if the variable is missing
/// - Produces a clear, human-readable error message
/// - Intended for startup-time configuration validation
///
/// Missing configuration is treated as a deployment error,
/// not a recoverable runtime condition.
macro_rules! required_env {
    // ---
    ($key:literal) => {
        std::env::var($key)
            .map_err(|_| anyhow::anyhow!(concat!("Missing required configuration: ", $key)))?
    };
}

/// Reads an optional environment variable and attempts to parse it.
///
/// If the variable is missing or cannot be parsed, the provided
/// default value is used. This macro is appropriate for non-critical
/// tuning parameters where fallback behavior is acceptable.
macro_rules! optional_env_parse {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        std::env::var($key)
            .ok()
            .and_then(|v| v.parse::<$ty>().ok())
            .unwrap_or($default)
    };
}

/// Reads an optional environment variable, treating empty values as unset.
macro_rules! optional_env {
    // ---
    ($key:literal) => {
        std::env::var($key).ok().filter(|v| !v.trim().is_empty())
    };
}

#[cfg(test)]
/// Asserts that a configuration constructor fails due to a missing
/// required environment variable.
///
/// This macro is intended for config unit tests only and enforces
/// consistent error messages across failure cases.
macro_rules! assert_missing_config {
    // ---
    ($expr:expr, $key:literal) => {{
        let err = $expr.expect_err("expected configuration error");
        assert!(
            err.to_string()
                .contains(concat!("Missing required configuration: ", $key)),
            "unexpected error: {err}"
        );
    }};
}

// ============================================================
// Public configuration facade
// ============================================================

/// Aggregated application configuration.
///
/// This is the single source of truth for startup configuration.
/// All required configuration is validated eagerly during initialization.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` selects the in-memory user and credential repository.
    pub database: Option<database::DatabaseConfig>,
    pub redis: redis::RedisConfig,
    pub webauthn: webauthn::WebAuthnConfig,
    pub ceremony: ceremony::CeremonyConfig,
    pub server: server::ServerConfig,
}

impl AppConfig {
    /// Loads and validates all application configuration from the environment.
    ///
    /// # Errors
    /// Returns an error if any required configuration is missing or invalid.
    /// This function is intended to be called exactly once at startup.
    pub fn from_env() -> Result<Self> {
        // ---
        let database = match optional_env!("DATABASE_URL") {
            Some(_) => Some(database::DatabaseConfig::from_env()?),
            None => None,
        };

        Ok(Self {
            database,
            redis: redis::RedisConfig::from_env()?,
            webauthn: webauthn::WebAuthnConfig::from_env()?,
            ceremony: ceremony::CeremonyConfig::from_env()?,
            server: server::ServerConfig::from_env()?,
        })
    }
}

// ============================================================
// Database configuration
// ============================================================

mod database {
    // ---
    use super::*;

    /// Database-related configuration derived from environment variables.
    ///
    /// Only read when `DATABASE_URL` is set; without it users and
    /// credentials live in process memory.
    #[derive(Debug, Clone)]
    pub struct DatabaseConfig {
        /// PostgreSQL connection string.
        pub database_url: String,

        /// Number of retry attempts when initializing the database connection. Defaults to 50.
        pub retry_count: u32,

        /// Maximum time to wait when acquiring a connection from the pool. Defaults to 30 seconds.
        pub acquire_timeout: Duration,

        /// Minimum number of connections to keep in the pool, even when idle. Defaults to 2.
        pub min_connections: u32,

        /// Maximum number of connections open concurrently. Defaults to 15.
        pub max_connections: u32,
    }

    impl DatabaseConfig {
        /// Builds a [`DatabaseConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        pub fn from_env() -> Result<Self> {
            // ---
            let database_url = required_env!("DATABASE_URL");
            let retry_count = optional_env_parse!("FIDO_DB_RETRY_COUNT", u32, 50);
            let acquire_timeout_secs = optional_env_parse!("FIDO_DB_ACQUIRE_TIMEOUT_SEC", u64, 30);
            let min_connections = optional_env_parse!("FIDO_DB_MIN_CONNECTIONS", u32, 2);
            let max_connections = optional_env_parse!("FIDO_DB_MAX_CONNECTIONS", u32, 15);

            Ok(Self {
                database_url,
                retry_count,
                acquire_timeout: Duration::from_secs(acquire_timeout_secs),
                min_connections,
                max_connections,
            })
        }
    }
}
pub use database::DatabaseConfig;

// ============================================================
// Redis configuration
// ============================================================

mod redis {
    // ---
    use super::*;

    /// Challenge store configuration.
    #[derive(Debug, Clone)]
    pub struct RedisConfig {
        /// Redis connection string. `None` selects the in-memory challenge store.
        pub url: Option<String>,

        /// Time-to-live for issued challenges.
        pub challenge_ttl: Duration,
    }

    impl RedisConfig {
        /// Builds a [`RedisConfig`] from environment variables.
        pub fn from_env() -> Result<Self> {
            // ---
            let url = optional_env!("FIDO_REDIS_URL");
            let ttl_secs = optional_env_parse!("FIDO_CHALLENGE_TTL_SEC", u64, 300);

            Ok(Self {
                url,
                challenge_ttl: Duration::from_secs(ttl_secs),
            })
        }
    }
}
pub use redis::RedisConfig;

// ============================================================
// WebAuthn configuration
// ============================================================

mod webauthn {
    // ---
    use super::*;

    /// Relying party identity.
    ///
    /// These values define the relying party identity and security
    /// origin checked during attestation and assertion.
    #[derive(Debug, Clone)]
    pub struct WebAuthnConfig {
        /// Relying Party ID (typically a domain name).
        pub rp_id: String,

        /// Human-readable Relying Party name.
        pub rp_name: String,

        /// Fully-qualified origin (e.g. https://example.com).
        pub origin: String,

        /// Transports a registering authenticator may report. Empty accepts any.
        pub allowed_transports: Vec<String>,
    }

    impl WebAuthnConfig {
        /// Builds a [`WebAuthnConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        /// WebAuthn configuration is considered security-critical
        /// and must be explicitly provided.
        pub fn from_env() -> Result<Self> {
            // ---
            let rp_id = required_env!("FIDO_RP_ID");
            let origin = required_env!("FIDO_ORIGIN");

            let rp_name =
                optional_env!("FIDO_RP_NAME").unwrap_or_else(|| "FIDO RP Server".to_string());
            let allowed_transports = match optional_env!("FIDO_ALLOWED_TRANSPORTS") {
                Some(value) => parse_transports(&value)?,
                None => Vec::new(),
            };

            Ok(Self {
                rp_id,
                rp_name,
                origin,
                allowed_transports,
            })
        }
    }

    const KNOWN_TRANSPORTS: &[&str] = &["usb", "nfc", "ble", "smart-card", "hybrid", "internal"];

    /// Comma-separated transport names, e.g. `usb,nfc`.
    fn parse_transports(value: &str) -> Result<Vec<String>> {
        // ---
        let mut transports = Vec::new();
        for name in value.split(',').map(|t| t.trim().to_ascii_lowercase()) {
            if name.is_empty() {
                continue;
            }
            if !KNOWN_TRANSPORTS.contains(&name.as_str()) {
                anyhow::bail!("FIDO_ALLOWED_TRANSPORTS: unknown transport {name:?}");
            }
            if !transports.contains(&name) {
                transports.push(name);
            }
        }
        Ok(transports)
    }
}
pub use webauthn::WebAuthnConfig;

// ============================================================
// Ceremony policy configuration
// ============================================================

mod ceremony {
    // ---
    use super::*;
    use crate::ceremony::{DEFAULT_RANDOM_BYTES, MAX_RANDOM_BYTES, MIN_RANDOM_BYTES};
    use crate::domain::AttestationConveyancePreference;

    /// Server-side defaults for the options endpoints and the result phase.
    #[derive(Debug, Clone)]
    pub struct CeremonyConfig {
        /// Timeout advertised to clients in options responses.
        pub timeout: Duration,

        /// Attestation conveyance preference when the client does not ask for one.
        pub attestation: AttestationConveyancePreference,

        /// Random bytes per challenge, before metadata is appended.
        pub challenge_random_bytes: usize,

        /// Register unknown usernames at attestation result instead of rejecting them.
        pub provision_unknown_users: bool,
    }

    impl CeremonyConfig {
        /// Builds a [`CeremonyConfig`] from environment variables.
        ///
        /// # Errors
        /// Rejects an unknown attestation preference and challenge sizes
        /// below the entropy floor; both are security relevant.
        pub fn from_env() -> Result<Self> {
            // ---
            let timeout_ms = optional_env_parse!("FIDO_CEREMONY_TIMEOUT_MS", u64, 60_000);
            let attestation = match optional_env!("FIDO_ATTESTATION_PREFERENCE") {
                Some(value) => value.parse()?,
                None => AttestationConveyancePreference::None,
            };
            let challenge_random_bytes =
                optional_env_parse!("FIDO_CHALLENGE_RANDOM_BYTES", usize, DEFAULT_RANDOM_BYTES);
            if !(MIN_RANDOM_BYTES..=MAX_RANDOM_BYTES).contains(&challenge_random_bytes) {
                anyhow::bail!(
                    "FIDO_CHALLENGE_RANDOM_BYTES must be in {MIN_RANDOM_BYTES}..={MAX_RANDOM_BYTES}, \
                     got {challenge_random_bytes}"
                );
            }
            let provision_unknown_users =
                optional_env_parse!("FIDO_PROVISION_UNKNOWN_USERS", bool, false);

            Ok(Self {
                timeout: Duration::from_millis(timeout_ms),
                attestation,
                challenge_random_bytes,
                provision_unknown_users,
            })
        }
    }
}
pub use ceremony::CeremonyConfig;

// ============================================================
// Server configuration
// ============================================================

mod server {
    // ---
    use super::*;

    /// Process-level settings.
    #[derive(Debug, Clone)]
    pub struct ServerConfig {
        /// Listen address. Defaults to `127.0.0.1:8080`.
        pub bind_addr: String,

        /// `prom` for Prometheus, anything else for no-op metrics.
        pub metrics_type: String,
    }

    impl ServerConfig {
        pub fn from_env() -> Result<Self> {
            // ---
            Ok(Self {
                bind_addr: optional_env!("FIDO_BIND_ADDR")
                    .unwrap_or_else(|| "127.0.0.1:8080".to_string()),
                metrics_type: optional_env!("FIDO_METRICS_TYPE")
                    .unwrap_or_else(|| "noop".to_string()),
            })
        }
    }
}
pub use server::ServerConfig;

// ============================================================
// Tests
// ============================================================
