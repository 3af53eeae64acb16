use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque challenge bytes handed to the client and echoed back inside client data.
///
/// Always base64url (no padding) on the wire. The `Debug` output only shows a short
/// prefix so challenges do not end up verbatim in logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Challenge(Vec<u8>);

impl Challenge {
    // ---
    pub fn new(bytes: Vec<u8>) -> Self {
        // ---
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        // ---
        &self.0
    }

    pub fn len(&self) -> usize {
        // ---
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        // ---
        self.0.is_empty()
    }

    pub fn to_base64url(&self) -> String {
        // ---
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    /// Parses a base64url challenge, tolerating trailing `=` padding.
    pub fn from_base64url(value: &str) -> Result<Self, base64::DecodeError> {
        // ---
        URL_SAFE_NO_PAD
            .decode(value.trim_end_matches('='))
            .map(Self)
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.to_base64url();
        let prefix: String = encoded.chars().take(8).collect();
        write!(f, "Challenge({prefix}…, {} bytes)", self.0.len())
    }
}

impl Serialize for Challenge {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64url())
    }
}

impl<'de> Deserialize<'de> for Challenge {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Challenge::from_base64url(&value).map_err(serde::de::Error::custom)
    }
}

/// WebAuthn `UserVerificationRequirement`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationRequirement {
    Required,
    #[default]
    Preferred,
    Discouraged,
}

impl UserVerificationRequirement {
    // ---
    pub const ALL: [UserVerificationRequirement; 3] = [
        UserVerificationRequirement::Required,
        UserVerificationRequirement::Preferred,
        UserVerificationRequirement::Discouraged,
    ];

    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            UserVerificationRequirement::Required => "required",
            UserVerificationRequirement::Preferred => "preferred",
            UserVerificationRequirement::Discouraged => "discouraged",
        }
    }

    pub fn is_required(&self) -> bool {
        // ---
        matches!(self, UserVerificationRequirement::Required)
    }
}

impl FromStr for UserVerificationRequirement {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "required" => Ok(UserVerificationRequirement::Required),
            "preferred" => Ok(UserVerificationRequirement::Preferred),
            "discouraged" => Ok(UserVerificationRequirement::Discouraged),
            other => Err(anyhow::anyhow!("unknown user verification requirement: {other}")),
        }
    }
}

/// Ceremony state carried inside the challenge bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeMetadata {
    // ---
    pub user_verification: UserVerificationRequirement,
    pub username: Option<String>,
}

/// The two WebAuthn ceremonies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ceremony {
    /// Registration (`navigator.credentials.create`).
    Attestation,
    /// Authentication (`navigator.credentials.get`).
    Assertion,
}

impl Ceremony {
    // ---
    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            Ceremony::Attestation => "attestation",
            Ceremony::Assertion => "assertion",
        }
    }

    /// Value the client must report in `clientDataJSON.type`.
    pub fn client_data_type(&self) -> &'static str {
        // ---
        match self {
            Ceremony::Attestation => "webauthn.create",
            Ceremony::Assertion => "webauthn.get",
        }
    }
}

/// Key under which an issued challenge waits to be consumed.
///
/// Derived from the ceremony and the challenge value itself, so the result phase can
/// find it from client data alone without any session affinity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChallengeContext(String);

impl ChallengeContext {
    // ---
    pub fn new(ceremony: Ceremony, challenge: &Challenge) -> Self {
        // ---
        Self(format!(
            "webauthn:{}:{}",
            ceremony.as_str(),
            challenge.to_base64url()
        ))
    }

    pub fn as_str(&self) -> &str {
        // ---
        &self.0
    }
}

impl fmt::Display for ChallengeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn base64url_round_trip_tolerates_padding() {
        // ---
        let challenge = Challenge::new(vec![0xfb, 0xff, 0x01]);
        let encoded = challenge.to_base64url();
        assert_eq!(encoded, "-_8B");

        let padded = format!("{encoded}==");
        assert_eq!(Challenge::from_base64url(&padded).unwrap(), challenge);
    }

    #[test]
    fn debug_output_is_truncated() {
        // ---
        let challenge = Challenge::new(vec![7u8; 48]);
        let rendered = format!("{challenge:?}");
        assert!(rendered.contains("48 bytes"));
        assert!(!rendered.contains(&challenge.to_base64url()));
    }

    #[test]
    fn user_verification_serde_is_lowercase() {
        // ---
        let json = serde_json::to_string(&UserVerificationRequirement::Discouraged).unwrap();
        assert_eq!(json, "\"discouraged\"");

        let parsed: UserVerificationRequirement = serde_json::from_str("\"required\"").unwrap();
        assert!(parsed.is_required());
        assert_eq!(UserVerificationRequirement::default().as_str(), "preferred");
    }

    #[test]
    fn context_is_namespaced_by_ceremony() {
        // ---
        let challenge = Challenge::new(vec![1, 2, 3]);
        let attestation = ChallengeContext::new(Ceremony::Attestation, &challenge);
        let assertion = ChallengeContext::new(Ceremony::Assertion, &challenge);

        assert_ne!(attestation, assertion);
        assert_eq!(attestation.as_str(), "webauthn:attestation:AQID");
    }
}
