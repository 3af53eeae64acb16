//! Cryptographic verification backed by `webauthn-rs`.
//!
//! `webauthn-rs` normally generates its own challenge and keeps the ceremony
//! state for the caller. Here the challenge comes from the ceremony endpoints
//! (it carries encoded metadata), so the serialized state is rebound to the
//! expected challenge and user-verification policy before finishing.

use std::str::FromStr;

use crate::config::WebAuthnConfig;
use crate::domain::{
    AssertionPayload, AttestationPayload, CredentialRecord, CredentialVerifier, ServerProperty,
    User, UserVerificationRequirement, VerificationError, VerifiedAuthentication,
    VerifiedRegistration,
};
use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use webauthn_rs::prelude::{
    Passkey, PasskeyAuthentication, PasskeyRegistration, PublicKeyCredential,
    RegisterPublicKeyCredential, Url,
};
use webauthn_rs::{Webauthn, WebauthnBuilder};

/// Creates a configured WebAuthn instance from application config.
///
/// # Errors
/// Returns an error if the origin URL or RP ID are malformed.
pub fn create_webauthn(config: &WebAuthnConfig) -> Result<Webauthn> {
    // ---
    tracing::debug!("Creating with config:{:?}", config);
    build_webauthn(&config.rp_id, &config.origin, &config.rp_name)
}

fn build_webauthn(rp_id: &str, origin: &str, rp_name: &str) -> Result<Webauthn> {
    // ---
    let url = Url::from_str(origin).with_context(|| format!("invalid origin {origin:?}"))?;
    let webauthn = WebauthnBuilder::new(rp_id, &url)?.rp_name(rp_name).build()?;
    Ok(webauthn)
}

/// [`CredentialVerifier`] over `webauthn-rs` passkeys.
///
/// The stored `public_key` of a credential record is the JSON-serialized
/// [`Passkey`].
pub struct WebauthnRsVerifier {
    rp_name: String,
}

impl WebauthnRsVerifier {
    // ---
    pub fn new(config: &WebAuthnConfig) -> Result<Self> {
        // ---
        // Fail at startup rather than on the first ceremony.
        create_webauthn(config)?;
        Ok(Self {
            rp_name: config.rp_name.clone(),
        })
    }

    fn webauthn_for(&self, expected: &ServerProperty) -> Result<Webauthn, VerificationError> {
        // ---
        build_webauthn(&expected.rp_id, &expected.origin, &self.rp_name)
            .map_err(|e| VerificationError::Rejected(format!("{e:#}")))
    }
}

impl CredentialVerifier for WebauthnRsVerifier {
    // ---
    fn verify_registration(
        &self,
        payload: &AttestationPayload,
        user: &User,
        expected: &ServerProperty,
    ) -> Result<VerifiedRegistration, VerificationError> {
        // ---
        let webauthn = self.webauthn_for(expected)?;
        let (_, state) = webauthn
            .start_passkey_registration(user.id, &user.username, &user.display_name, None)
            .map_err(rejected)?;
        let state: PasskeyRegistration = rebind_state(&state, expected)?;

        let credential: RegisterPublicKeyCredential = from_json(json!({
            "id": payload.id,
            "rawId": URL_SAFE_NO_PAD.encode(&payload.raw_id),
            "type": "public-key",
            "extensions": {},
            "response": {
                "clientDataJSON": URL_SAFE_NO_PAD.encode(&payload.client_data_json),
                "attestationObject": URL_SAFE_NO_PAD.encode(&payload.attestation_object),
            },
        }))?;

        let passkey = webauthn
            .finish_passkey_registration(&credential, &state)
            .map_err(rejected)?;
        let public_key = serde_json::to_vec(&passkey)
            .map_err(|e| VerificationError::Rejected(format!("passkey encoding: {e}")))?;

        Ok(VerifiedRegistration {
            credential_id: payload.raw_id.clone(),
            public_key,
        })
    }

    fn verify_authentication(
        &self,
        payload: &AssertionPayload,
        record: &CredentialRecord,
        expected: &ServerProperty,
    ) -> Result<VerifiedAuthentication, VerificationError> {
        // ---
        let mut passkey: Passkey = serde_json::from_slice(&record.public_key).map_err(|e| {
            VerificationError::Rejected(format!("stored credential is not a passkey: {e}"))
        })?;

        let webauthn = self.webauthn_for(expected)?;
        let (_, state) = webauthn
            .start_passkey_authentication(std::slice::from_ref(&passkey))
            .map_err(rejected)?;
        let state: PasskeyAuthentication = rebind_state(&state, expected)?;

        let credential: PublicKeyCredential = from_json(json!({
            "id": payload.id,
            "rawId": URL_SAFE_NO_PAD.encode(&payload.raw_id),
            "type": "public-key",
            "extensions": {},
            "response": {
                "clientDataJSON": URL_SAFE_NO_PAD.encode(&payload.client_data_json),
                "authenticatorData": URL_SAFE_NO_PAD.encode(&payload.authenticator_data),
                "signature": URL_SAFE_NO_PAD.encode(&payload.signature),
                "userHandle": payload.user_handle.as_ref().map(|h| URL_SAFE_NO_PAD.encode(h)),
            },
        }))?;

        let result = webauthn
            .finish_passkey_authentication(&credential, &state)
            .map_err(rejected)?;

        let public_key = match passkey.update_credential(&result) {
            Some(true) => Some(serde_json::to_vec(&passkey).map_err(|e| {
                VerificationError::Rejected(format!("passkey encoding: {e}"))
            })?),
            _ => None,
        };

        Ok(VerifiedAuthentication {
            counter: result.counter(),
            user_verified: result.user_verified(),
            public_key,
        })
    }
}

fn rejected(err: impl std::fmt::Debug) -> VerificationError {
    // ---
    VerificationError::Rejected(format!("{err:?}"))
}

fn from_json<T: DeserializeOwned>(value: Value) -> Result<T, VerificationError> {
    // ---
    serde_json::from_value(value).map_err(|e| VerificationError::Rejected(e.to_string()))
}

/// Replace the library-generated challenge and user-verification policy in a
/// serialized ceremony state with the ones the client was actually given.
fn rebind_state<S>(state: &S, expected: &ServerProperty) -> Result<S, VerificationError>
where
    S: Serialize + DeserializeOwned,
{
    // ---
    let mut value = serde_json::to_value(state)
        .map_err(|e| VerificationError::Rejected(format!("state encoding: {e}")))?;

    let requirement = if expected.user_verification_required {
        UserVerificationRequirement::Required
    } else {
        UserVerificationRequirement::Preferred
    };
    let challenge = Value::String(expected.challenge.to_base64url());
    let policy = Value::String(requirement.as_str().to_string());

    if !replace_key(&mut value, "challenge", &challenge) {
        return Err(VerificationError::Rejected(
            "ceremony state has no challenge".to_string(),
        ));
    }
    replace_key(&mut value, "policy", &policy);

    from_json(value)
}

/// Overwrite every string-valued `key` in `value`. Returns whether one was found.
fn replace_key(value: &mut Value, key: &str, replacement: &Value) -> bool {
    // ---
    match value {
        Value::Object(map) => {
            let mut found = false;
            for (name, child) in map.iter_mut() {
                if name == key && child.is_string() {
                    *child = replacement.clone();
                    found = true;
                } else {
                    found |= replace_key(child, key, replacement);
                }
            }
            found
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |found, item| replace_key(item, key, replacement) || found),
        _ => false,
    }
}
