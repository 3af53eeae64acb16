use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{CredentialRecord, CredentialRecordStore, User, UserDirectory};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            username: r.username,
            display_name: r.display_name,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Vec<u8>,
    user_id: Uuid,
    username: String,
    public_key: Vec<u8>,
    counter: i64,
    transports: Vec<String>,
    attestation_format: String,
    aaguid: Uuid,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
}

impl TryFrom<CredentialRow> for CredentialRecord {
    type Error = anyhow::Error;

    fn try_from(r: CredentialRow) -> Result<Self> {
        Ok(CredentialRecord {
            counter: u32::try_from(r.counter)
                .with_context(|| format!("stored counter {} out of range", r.counter))?,
            id: r.id,
            user_id: r.user_id,
            username: r.username,
            public_key: r.public_key,
            transports: r.transports,
            attestation_format: r.attestation_format,
            aaguid: r.aaguid,
            created_at: r.created_at,
            last_used_at: r.last_used_at,
        })
    }
}

const CREDENTIAL_COLUMNS: &str = "id, user_id, username, public_key, counter, transports, \
     attestation_format, aaguid, created_at, last_used_at";

/// Users and credentials in PostgreSQL.
///
/// Implements both [`UserDirectory`] and [`CredentialRecordStore`] over one pool.
pub struct PostgresRepository {
    // ---
    pool: PgPool,
}

impl PostgresRepository {
    // ---
    pub fn new(pool: PgPool) -> Self {
        // ---
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserDirectory for PostgresRepository {
    // ---
    async fn lookup(&self, username: &str) -> Result<Option<User>> {
        // ---
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, display_name, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn create_user(&self, username: &str, display_name: &str) -> Result<User> {
        // ---
        let user = User::new(username.to_string(), display_name.to_string());

        sqlx::query(
            "INSERT INTO users (id, username, display_name, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to create user {username:?}"))?;

        Ok(user)
    }
}

#[async_trait::async_trait]
impl CredentialRecordStore for PostgresRepository {
    // ---
    async fn create(&self, record: CredentialRecord) -> Result<()> {
        // ---
        sqlx::query(
            "INSERT INTO credentials (id, user_id, username, public_key, counter, transports,
                                      attestation_format, aaguid, created_at, last_used_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&record.id)
        .bind(record.user_id)
        .bind(&record.username)
        .bind(&record.public_key)
        .bind(i64::from(record.counter))
        .bind(&record.transports)
        .bind(&record.attestation_format)
        .bind(record.aaguid)
        .bind(record.created_at)
        .bind(record.last_used_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store credential {}", record.id_hex()))?;

        Ok(())
    }

    async fn find_by_id(&self, credential_id: &[u8]) -> Result<Option<CredentialRecord>> {
        // ---
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE id = $1"
        ))
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialRecord::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Vec<CredentialRecord>> {
        // ---
        let rows = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE username = $1 ORDER BY created_at"
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CredentialRecord::try_from).collect()
    }

    async fn update(&self, record: CredentialRecord) -> Result<()> {
        // ---
        let result = sqlx::query(
            "UPDATE credentials SET public_key = $1, counter = $2, last_used_at = $3 WHERE id = $4",
        )
        .bind(&record.public_key)
        .bind(i64::from(record.counter))
        .bind(record.last_used_at)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("credential {} does not exist", record.id_hex());
        }
        Ok(())
    }
}
