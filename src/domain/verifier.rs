//! Seam to the cryptographic WebAuthn verifier.
//!
//! The ceremony endpoints perform every structural and policy check they can without
//! key material, then hand the raw credential plus the server-side expectations to a
//! [`CredentialVerifier`] for attestation-statement and signature verification.

use super::challenge::Challenge;
use super::webauthn_models::{CredentialRecord, User};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Server-side values the client response is checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerProperty {
    // ---
    pub origin: String,
    pub rp_id: String,
    pub challenge: Challenge,
    pub user_verification_required: bool,
    /// Empty means any transport is accepted.
    pub allowed_transports: Vec<String>,
}

/// Decoded registration response.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationPayload {
    // ---
    /// base64url credential id as sent by the client
    pub id: String,
    pub raw_id: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
    pub transports: Vec<String>,
    pub client_extension_results: Map<String, Value>,
}

/// Decoded authentication response.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionPayload {
    // ---
    /// base64url credential id as sent by the client
    pub id: String,
    pub raw_id: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
    pub client_extension_results: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedRegistration {
    // ---
    pub credential_id: Vec<u8>,
    /// Credential material the verifier needs again at authentication time.
    pub public_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedAuthentication {
    // ---
    pub counter: u32,
    pub user_verified: bool,
    /// Replacement credential material when the verifier updated it.
    pub public_key: Option<Vec<u8>>,
}

/// Why a credential response was rejected.
///
/// The precise variant is logged; clients only ever see a generic failure.
#[derive(Debug, Error, PartialEq)]
pub enum VerificationError {
    #[error("client data type {found:?} does not match {expected:?}")]
    ClientDataType { expected: String, found: String },

    #[error("user presence flag not set")]
    UserNotPresent,

    #[error("user verification required but flag not set")]
    UserNotVerified,

    #[error("authenticator data carries no attested credential")]
    MissingAttestedCredential,

    #[error("attested credential id does not match rawId")]
    CredentialIdMismatch,

    #[error("credential is already registered")]
    CredentialAlreadyRegistered,

    #[error("authenticator transport {0:?} is not allowed")]
    TransportNotAllowed(String),

    #[error("credential is not registered")]
    UnknownCredential,

    #[error("credential is not owned by the user named in the challenge")]
    CredentialNotOwned,

    #[error("user handle does not match credential owner")]
    UserHandleMismatch,

    #[error("signature counter did not increase (stored {stored}, presented {presented})")]
    CounterRegression { stored: u32, presented: u32 },

    #[error("verifier rejected the credential: {0}")]
    Rejected(String),
}

/// Cryptographic verification of registration and authentication responses.
pub trait CredentialVerifier: Send + Sync {
    // ---
    /// Verify an attestation for `user` against `expected`.
    fn verify_registration(
        &self,
        payload: &AttestationPayload,
        user: &User,
        expected: &ServerProperty,
    ) -> Result<VerifiedRegistration, VerificationError>;

    /// Verify an assertion made with the stored `record`.
    fn verify_authentication(
        &self,
        payload: &AssertionPayload,
        record: &CredentialRecord,
        expected: &ServerProperty,
    ) -> Result<VerifiedAuthentication, VerificationError>;
}

/// Type alias for any backend that implements CredentialVerifier.
pub type CredentialVerifierPtr = Arc<dyn CredentialVerifier>;
