//! Shape checks on posted credentials.
//!
//! Runs before any challenge lookup, so a malformed body never consumes a challenge.

use super::wire::{AssertionResultRequest, AttestationResultRequest};
use crate::domain::{
    AssertionPayload, AttestationPayload, CeremonyError, PUBLIC_KEY_CREDENTIAL_TYPE,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialValidator;

impl CredentialValidator {
    // ---
    pub fn validate_attestation(
        &self,
        credential: &AttestationResultRequest,
    ) -> Result<AttestationPayload, CeremonyError> {
        // ---
        let (id, raw_id) = credential_ids(credential.id.as_deref(), credential.raw_id.as_deref())?;
        check_type(credential.credential_type.as_deref())?;

        let response = credential
            .response
            .as_ref()
            .ok_or_else(|| CeremonyError::malformed("response is required"))?;
        let client_data_json =
            required_bytes("response.clientDataJSON", &response.client_data_json)?;
        let attestation_object =
            required_bytes("response.attestationObject", &response.attestation_object)?;

        Ok(AttestationPayload {
            id,
            raw_id,
            client_data_json,
            attestation_object,
            transports: response.transports.clone().unwrap_or_default(),
            client_extension_results: credential
                .client_extension_results
                .clone()
                .unwrap_or_default(),
        })
    }

    pub fn validate_assertion(
        &self,
        credential: &AssertionResultRequest,
    ) -> Result<AssertionPayload, CeremonyError> {
        // ---
        let (id, raw_id) = credential_ids(credential.id.as_deref(), credential.raw_id.as_deref())?;
        check_type(credential.credential_type.as_deref())?;

        let response = credential
            .response
            .as_ref()
            .ok_or_else(|| CeremonyError::malformed("response is required"))?;
        let client_data_json =
            required_bytes("response.clientDataJSON", &response.client_data_json)?;
        let authenticator_data =
            required_bytes("response.authenticatorData", &response.authenticator_data)?;
        let signature = required_bytes("response.signature", &response.signature)?;

        // An empty user handle is what some clients send for "none".
        let user_handle = match response.user_handle.as_deref() {
            None | Some("") => None,
            Some(value) => Some(decode("response.userHandle", value)?),
        };

        Ok(AssertionPayload {
            id,
            raw_id,
            client_data_json,
            authenticator_data,
            signature,
            user_handle,
            client_extension_results: credential
                .client_extension_results
                .clone()
                .unwrap_or_default(),
        })
    }
}

fn credential_ids(
    id: Option<&str>,
    raw_id: Option<&str>,
) -> Result<(String, Vec<u8>), CeremonyError> {
    // ---
    let id = id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CeremonyError::malformed("id is required"))?;
    let raw_id = raw_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CeremonyError::malformed("rawId is required"))?;

    let raw_bytes = decode("rawId", raw_id)?;
    if decode("id", id)? != raw_bytes {
        return Err(CeremonyError::malformed("id and rawId differ"));
    }
    Ok((id.to_string(), raw_bytes))
}

fn check_type(credential_type: Option<&str>) -> Result<(), CeremonyError> {
    // ---
    match credential_type {
        // Absent type is tolerated; several conformance clients omit it.
        None => Ok(()),
        Some(PUBLIC_KEY_CREDENTIAL_TYPE) => Ok(()),
        Some(other) => Err(CeremonyError::malformed(format!(
            "unsupported credential type {other:?}"
        ))),
    }
}

fn required_bytes(field: &str, value: &Option<String>) -> Result<Vec<u8>, CeremonyError> {
    // ---
    match value.as_deref() {
        Some(value) if !value.is_empty() => decode(field, value),
        _ => Err(CeremonyError::malformed(format!("{field} is required"))),
    }
}

fn decode(field: &str, value: &str) -> Result<Vec<u8>, CeremonyError> {
    // ---
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| CeremonyError::malformed(format!("{field} is not base64url: {e}")))
}
