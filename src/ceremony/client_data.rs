use crate::domain::{Ceremony, CeremonyError, Challenge, VerificationError};
use serde::Deserialize;

/// The members of `clientDataJSON` the ceremony core reads.
///
/// Signature and origin checks over the full byte string are the verifier's job; the
/// core only needs the type and the challenge to locate and decode ceremony state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedClientData {
    // ---
    #[serde(rename = "type")]
    pub client_data_type: String,
    pub challenge: Challenge,
    pub origin: String,
    #[serde(default)]
    pub cross_origin: Option<bool>,
}

impl CollectedClientData {
    // ---
    pub fn parse(bytes: &[u8]) -> Result<Self, CeremonyError> {
        // ---
        serde_json::from_slice(bytes)
            .map_err(|e| CeremonyError::malformed(format!("clientDataJSON: {e}")))
    }

    /// Reject client data produced for the other ceremony.
    pub fn ensure_type(&self, ceremony: Ceremony) -> Result<(), VerificationError> {
        // ---
        let expected = ceremony.client_data_type();
        if self.client_data_type != expected {
            return Err(VerificationError::ClientDataType {
                expected: expected.to_string(),
                found: self.client_data_type.clone(),
            });
        }
        Ok(())
    }
}
