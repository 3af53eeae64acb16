// Test helpers are intentionally partially used
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::Value;
use fido_rp_server::ceremony::{
    ChallengeCodec, FLAG_ATTESTED_CREDENTIAL, FLAG_USER_PRESENT, FLAG_USER_VERIFIED,
};
use fido_rp_server::domain::{
    AssertionPayload, AttestationConveyancePreference, AttestationPayload, Ceremony, Challenge,
    ChallengeContext, ChallengeMetadata, ChallengeStore, CredentialRecord, CredentialRecordStore,
    CredentialVerifier, ServerProperty, User, UserDirectory, UserVerificationRequirement,
    VerificationError,
    VerifiedAuthentication, VerifiedRegistration,
};
use fido_rp_server::{
    create_noop_metrics, create_router, create_router_with, CeremonyConfig, CeremonyServices,
    DefaultOptionsProvider, MemoryChallengeStore, MemoryRepository, ProvisionUnknownUser,
    RejectUnknownUser, RelyingParty, WebAuthnConfig,
};
use reqwest::Client;
use serde_json::{json, Value as Json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower::ServiceExt;

pub const RP_ID: &str = "localhost";
pub const ORIGIN: &str = "http://localhost:8080";

macro_rules! set_env_if_unset {
    // ---
    ($key:expr, $val:expr) => {
        if std::env::var($key).is_err() {
            std::env::set_var($key, $val);
        }
    };
}

static INIT: Once = Once::new();

// ============================================================================
// Test Setup
// ============================================================================

/// Initialize environment variables once. No backing services are configured,
/// so the router runs on the in-memory challenge store and repository.
pub fn setup_test_env() {
    // ---
    INIT.call_once(|| {
        // ---
        set_env_if_unset!("FIDO_RP_ID", RP_ID);
        set_env_if_unset!("FIDO_ORIGIN", ORIGIN);
        set_env_if_unset!("FIDO_RP_NAME", "Test RP");
        set_env_if_unset!("FIDO_METRICS_TYPE", "noop");
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("FIDO_REDIS_URL");
    });
}

/// The router from `create_router()` served on an ephemeral port.
pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub client: Client,
}

impl TestServer {
    // ---
    pub async fn new() -> Self {
        // ---
        let app = create_router()
            .await
            .expect("Should be able to create router");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start
        sleep(Duration::from_millis(100)).await;

        let client = Client::new();

        Self { addr, client }
    }

    pub fn url(&self, path: &str) -> String {
        // ---
        format!("http://{}{}", self.addr, path)
    }
}

// ============================================================================
// Collaborator doubles
// ============================================================================

/// Verifier that accepts (or rejects) every signature and counts its calls.
pub struct StubVerifier {
    accept: bool,
    pub registrations: AtomicUsize,
    pub authentications: AtomicUsize,
    pub last_expected: Mutex<Option<ServerProperty>>,
}

impl StubVerifier {
    // ---
    pub fn accepting() -> Self {
        // ---
        Self::new(true)
    }

    pub fn rejecting() -> Self {
        // ---
        Self::new(false)
    }

    fn new(accept: bool) -> Self {
        // ---
        Self {
            accept,
            registrations: AtomicUsize::new(0),
            authentications: AtomicUsize::new(0),
            last_expected: Mutex::new(None),
        }
    }

    pub fn registration_calls(&self) -> usize {
        // ---
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn authentication_calls(&self) -> usize {
        // ---
        self.authentications.load(Ordering::SeqCst)
    }
}

impl CredentialVerifier for StubVerifier {
    // ---
    fn verify_registration(
        &self,
        payload: &AttestationPayload,
        _user: &User,
        expected: &ServerProperty,
    ) -> Result<VerifiedRegistration, VerificationError> {
        // ---
        self.registrations.fetch_add(1, Ordering::SeqCst);
        *self.last_expected.lock().unwrap() = Some(expected.clone());
        if !self.accept {
            return Err(VerificationError::Rejected("bad attestation signature".into()));
        }
        Ok(VerifiedRegistration {
            credential_id: payload.raw_id.clone(),
            public_key: b"stub-public-key".to_vec(),
        })
    }

    fn verify_authentication(
        &self,
        _payload: &AssertionPayload,
        _record: &CredentialRecord,
        expected: &ServerProperty,
    ) -> Result<VerifiedAuthentication, VerificationError> {
        // ---
        self.authentications.fetch_add(1, Ordering::SeqCst);
        *self.last_expected.lock().unwrap() = Some(expected.clone());
        if !self.accept {
            return Err(VerificationError::Rejected("bad assertion signature".into()));
        }
        Ok(VerifiedAuthentication {
            counter: 0,
            user_verified: true,
            public_key: None,
        })
    }
}

/// Credential store that counts writes on top of the in-memory repository.
pub struct CountingCredentialStore {
    inner: Arc<MemoryRepository>,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl CountingCredentialStore {
    // ---
    pub fn new(inner: Arc<MemoryRepository>) -> Self {
        // ---
        Self {
            inner,
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn creates(&self) -> usize {
        // ---
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        // ---
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CredentialRecordStore for CountingCredentialStore {
    // ---
    async fn create(&self, record: CredentialRecord) -> anyhow::Result<()> {
        // ---
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(record).await
    }

    async fn find_by_id(&self, credential_id: &[u8]) -> anyhow::Result<Option<CredentialRecord>> {
        // ---
        self.inner.find_by_id(credential_id).await
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Vec<CredentialRecord>> {
        // ---
        self.inner.find_by_username(username).await
    }

    async fn update(&self, record: CredentialRecord) -> anyhow::Result<()> {
        // ---
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(record).await
    }
}

// ============================================================================
// Router harness
// ============================================================================

/// A router over in-memory collaborators, with handles to inspect them.
pub struct Harness {
    pub app: Router,
    pub codec: ChallengeCodec,
    pub repository: Arc<MemoryRepository>,
    pub credentials: Arc<CountingCredentialStore>,
    pub challenges: Arc<MemoryChallengeStore>,
    pub verifier: Arc<StubVerifier>,
}

/// Accounts present in the directory of every harness.
pub const KNOWN_USERS: [&str; 2] = ["alice", "bob"];

pub async fn harness(verifier: StubVerifier) -> Harness {
    // ---
    build_harness(verifier, false, Vec::new()).await
}

pub async fn provisioning_harness(verifier: StubVerifier) -> Harness {
    // ---
    build_harness(verifier, true, Vec::new()).await
}

/// Harness whose relying party only accepts the given authenticator transports.
pub async fn transport_limited_harness(verifier: StubVerifier, transports: &[&str]) -> Harness {
    // ---
    let transports = transports.iter().map(|t| t.to_string()).collect();
    build_harness(verifier, false, transports).await
}

async fn build_harness(
    verifier: StubVerifier,
    provision: bool,
    allowed_transports: Vec<String>,
) -> Harness {
    // ---
    let webauthn = WebAuthnConfig {
        rp_id: RP_ID.to_string(),
        rp_name: "Test RP".to_string(),
        origin: ORIGIN.to_string(),
        allowed_transports: allowed_transports.clone(),
    };
    let ceremony = CeremonyConfig {
        timeout: Duration::from_secs(60),
        attestation: AttestationConveyancePreference::None,
        challenge_random_bytes: 32,
        provision_unknown_users: provision,
    };

    let codec = ChallengeCodec::default();
    let repository = Arc::new(MemoryRepository::new());
    for username in KNOWN_USERS {
        repository.create_user(username, username).await.unwrap();
    }
    let credentials = Arc::new(CountingCredentialStore::new(repository.clone()));
    let challenges = Arc::new(MemoryChallengeStore::new(Duration::from_secs(300)));
    let verifier = Arc::new(verifier);
    let options = Arc::new(DefaultOptionsProvider::new(
        &webauthn,
        ceremony,
        codec,
        credentials.clone(),
    ));

    let services = CeremonyServices {
        relying_party: RelyingParty {
            id: RP_ID.to_string(),
            origin: ORIGIN.to_string(),
            allowed_transports,
        },
        codec,
        challenge_store: challenges.clone(),
        users: repository.clone(),
        credentials: credentials.clone(),
        attestation_options: options.clone(),
        assertion_options: options,
        verifier: verifier.clone(),
        username_not_found: if provision {
            Arc::new(ProvisionUnknownUser::new(repository.clone()))
        } else {
            Arc::new(RejectUnknownUser)
        },
        metrics: create_noop_metrics().unwrap(),
    };

    Harness {
        app: create_router_with(services),
        codec,
        repository,
        credentials,
        challenges,
        verifier,
    }
}

impl Harness {
    // ---
    pub async fn post(&self, path: &str, body: Json) -> (StatusCode, Json) {
        // ---
        self.post_raw(path, body.to_string()).await
    }

    pub async fn post_raw(&self, path: &str, body: String) -> (StatusCode, Json) {
        // ---
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Issue attestation options for `username` and return the challenge.
    pub async fn attestation_challenge(&self, username: &str, body: Json) -> String {
        // ---
        let mut request = json!({ "username": username, "displayName": username });
        if let (Some(target), Some(extra)) = (request.as_object_mut(), body.as_object()) {
            target.extend(extra.clone());
        }
        let (status, response) = self.post("/webauthn/attestation/options", request).await;
        assert_eq!(status, StatusCode::OK, "{response}");
        response["challenge"].as_str().unwrap().to_string()
    }

    /// Issue assertion options and return the challenge.
    pub async fn assertion_challenge(&self, body: Json) -> String {
        // ---
        let (status, response) = self.post("/webauthn/assertion/options", body).await;
        assert_eq!(status, StatusCode::OK, "{response}");
        response["challenge"].as_str().unwrap().to_string()
    }

    /// Run a complete registration of `credential_id` for `username`.
    pub async fn register(&self, username: &str, credential_id: &[u8]) {
        // ---
        let challenge = self.attestation_challenge(username, json!({})).await;
        let credential = attestation_credential(&challenge, credential_id, FLAG_USER_PRESENT);
        let (status, body) = self.post("/webauthn/attestation/result", credential).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    /// Store a challenge the way the options endpoints would, bypassing them.
    pub async fn plant_challenge(
        &self,
        ceremony: Ceremony,
        user_verification: UserVerificationRequirement,
        username: Option<&str>,
    ) -> String {
        // ---
        let challenge = self
            .codec
            .issue(&ChallengeMetadata {
                user_verification,
                username: username.map(str::to_string),
            })
            .unwrap();
        let context = ChallengeContext::new(ceremony, &challenge);
        self.challenges.save(&context, &challenge).await.unwrap();
        challenge.to_base64url()
    }

    pub fn decode_challenge(&self, challenge: &str) -> ChallengeMetadata {
        // ---
        let challenge = Challenge::from_base64url(challenge).unwrap();
        self.codec.decode(&challenge).unwrap()
    }
}

// ============================================================================
// Authenticator output builders
// ============================================================================

pub fn b64(bytes: &[u8]) -> String {
    // ---
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn client_data_json(client_data_type: &str, challenge: &str) -> Vec<u8> {
    // ---
    json!({
        "type": client_data_type,
        "challenge": challenge,
        "origin": ORIGIN,
        "crossOrigin": false,
    })
    .to_string()
    .into_bytes()
}

/// EC2 P-256 COSE key with dummy coordinates.
pub fn cose_key() -> Vec<u8> {
    // ---
    let key = Value::Map(vec![
        (Value::Integer(1i64.into()), Value::Integer(2i64.into())),
        (Value::Integer(3i64.into()), Value::Integer((-7i64).into())),
        (Value::Integer((-1i64).into()), Value::Integer(1i64.into())),
        (Value::Integer((-2i64).into()), Value::Bytes(vec![0x11; 32])),
        (Value::Integer((-3i64).into()), Value::Bytes(vec![0x22; 32])),
    ]);
    let mut bytes = Vec::new();
    ciborium::into_writer(&key, &mut bytes).unwrap();
    bytes
}

pub fn authenticator_data(flags: u8, sign_count: u32, credential_id: Option<&[u8]>) -> Vec<u8> {
    // ---
    let mut data = vec![0x5a; 32];
    let flags = match credential_id {
        Some(_) => flags | FLAG_ATTESTED_CREDENTIAL,
        None => flags,
    };
    data.push(flags);
    data.extend_from_slice(&sign_count.to_be_bytes());

    if let Some(id) = credential_id {
        data.extend_from_slice(&[0x0a; 16]);
        data.extend_from_slice(&(id.len() as u16).to_be_bytes());
        data.extend_from_slice(id);
        data.extend_from_slice(&cose_key());
    }
    data
}

pub fn attestation_object(auth_data: Vec<u8>) -> Vec<u8> {
    // ---
    let object = Value::Map(vec![
        (Value::Text("fmt".into()), Value::Text("none".into())),
        (Value::Text("attStmt".into()), Value::Map(Vec::new())),
        (Value::Text("authData".into()), Value::Bytes(auth_data)),
    ]);
    let mut bytes = Vec::new();
    ciborium::into_writer(&object, &mut bytes).unwrap();
    bytes
}

/// Registration response for `challenge` with an attested `credential_id`.
pub fn attestation_credential(challenge: &str, credential_id: &[u8], flags: u8) -> Json {
    // ---
    let auth_data = authenticator_data(flags, 0, Some(credential_id));
    json!({
        "id": b64(credential_id),
        "rawId": b64(credential_id),
        "type": "public-key",
        "response": {
            "clientDataJSON": b64(&client_data_json("webauthn.create", challenge)),
            "attestationObject": b64(&attestation_object(auth_data)),
            "transports": ["usb"],
        },
        "clientExtensionResults": {},
    })
}

/// Authentication response for `challenge` made with `credential_id`.
pub fn assertion_credential(
    challenge: &str,
    credential_id: &[u8],
    flags: u8,
    sign_count: u32,
) -> Json {
    // ---
    json!({
        "id": b64(credential_id),
        "rawId": b64(credential_id),
        "type": "public-key",
        "response": {
            "clientDataJSON": b64(&client_data_json("webauthn.get", challenge)),
            "authenticatorData": b64(&authenticator_data(flags, sign_count, None)),
            "signature": b64(&[0x30, 0x44, 0x02, 0x20]),
            "userHandle": "",
        },
        "clientExtensionResults": {},
    })
}

pub const PRESENT: u8 = FLAG_USER_PRESENT;
pub const PRESENT_AND_VERIFIED: u8 = FLAG_USER_PRESENT | FLAG_USER_VERIFIED;
