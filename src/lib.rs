// src/lib.rs
use anyhow::Result;
use app_state::AppState;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use handlers::{ceremony_route, health_check, metrics_handler, root_handler, track_requests};
use infrastructure::challenge_store::{create_memory, create_redis};

// Public exports (visible outside this module)
pub mod ceremony;
pub mod domain;

// Internal-only exports (sibling access within this module)
mod app_state;
mod config;
mod handlers;
mod infrastructure;

// Hoist up only the public symbol(s)
pub use app_state::{CeremonyServices, RelyingParty};

pub use config::*;

pub use handlers::{
    AssertionOptionsHandler, AssertionResultHandler, AttestationOptionsHandler,
    AttestationResultHandler, CeremonyRequestHandler, Empty, ServerResponse, Status,
    INTERNAL_ERROR, VERIFICATION_FAILED,
};

// Publicly expose the infrastructure creation functions
pub use infrastructure::{
    connect_with_retry, // ---
    create_noop_metrics,
    create_prom_metrics,
    create_webauthn,
    DefaultOptionsProvider,
    MemoryChallengeStore,
    MemoryRepository,
    PostgresRepository,
    ProvisionUnknownUser,
    RedisChallengeStore,
    RejectUnknownUser,
    WebauthnRsVerifier,
    DEFAULT_ALGORITHMS,
};

use ceremony::ChallengeCodec;
use domain::{CredentialRecordStorePtr, UserDirectoryPtr, UsernameNotFoundHandlerPtr};

/// Build the HTTP router with every backend selected by environment variables.
pub async fn create_router() -> Result<Router> {
    // ---
    // Load all configuration from environment
    let config = AppConfig::from_env()?;

    // Ignored if main already installed a subscriber
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let services = build_services(&config).await?;
    Ok(create_router_with(services))
}

/// Create the ceremony collaborators described by `config`.
///
/// Redis and Postgres are used when configured; otherwise challenges, users and
/// credentials live in process memory.
pub async fn build_services(config: &AppConfig) -> Result<CeremonyServices> {
    // ---
    let metrics = if config.server.metrics_type == "prom" {
        create_prom_metrics()?
    } else {
        create_noop_metrics()?
    };

    let ttl = config.redis.challenge_ttl;
    let challenge_store = match &config.redis.url {
        Some(url) => create_redis(url, ttl)?,
        None => create_memory(ttl),
    };

    let (users, credentials): (UserDirectoryPtr, CredentialRecordStorePtr) = match &config.database
    {
        Some(database) => {
            let pool = connect_with_retry(database).await?;
            let repository = Arc::new(PostgresRepository::new(pool));
            let users: UserDirectoryPtr = repository.clone();
            let credentials: CredentialRecordStorePtr = repository;
            (users, credentials)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, users and credentials are kept in memory");
            let repository = Arc::new(MemoryRepository::new());
            let users: UserDirectoryPtr = repository.clone();
            let credentials: CredentialRecordStorePtr = repository;
            (users, credentials)
        }
    };

    let codec = ChallengeCodec::new(config.ceremony.challenge_random_bytes)?;
    let options = Arc::new(DefaultOptionsProvider::new(
        &config.webauthn,
        config.ceremony.clone(),
        codec,
        credentials.clone(),
    ));

    let username_not_found: UsernameNotFoundHandlerPtr = if config.ceremony.provision_unknown_users
    {
        Arc::new(ProvisionUnknownUser::new(users.clone()))
    } else {
        Arc::new(RejectUnknownUser)
    };

    Ok(CeremonyServices {
        relying_party: RelyingParty {
            id: config.webauthn.rp_id.clone(),
            origin: config.webauthn.origin.clone(),
            allowed_transports: config.webauthn.allowed_transports.clone(),
        },
        codec,
        challenge_store,
        users,
        credentials,
        attestation_options: options.clone(),
        assertion_options: options,
        verifier: Arc::new(WebauthnRsVerifier::new(&config.webauthn)?),
        username_not_found,
        metrics,
    })
}

/// Build the HTTP router around already constructed services.
pub fn create_router_with(services: CeremonyServices) -> Router {
    // ---
    let app_state = AppState::from(&services);
    let metrics = services.metrics.clone();

    let webauthn = Router::new()
        .route(
            "/attestation/options",
            ceremony_route(AttestationOptionsHandler::new(&services), metrics.clone()),
        )
        .route(
            "/attestation/result",
            ceremony_route(AttestationResultHandler::new(&services), metrics.clone()),
        )
        .route(
            "/assertion/options",
            ceremony_route(AssertionOptionsHandler::new(&services), metrics.clone()),
        )
        .route(
            "/assertion/result",
            ceremony_route(AssertionResultHandler::new(&services), metrics),
        );

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/webauthn", webauthn)
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            track_requests,
        ))
        .with_state(app_state)
}
