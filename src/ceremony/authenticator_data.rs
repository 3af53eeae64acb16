//! Structural parsing of authenticator data and attestation objects.
//!
//! Only framing is handled here: flags, counter and the attested credential. Anything
//! that needs key material is left to the credential verifier.

use crate::domain::CeremonyError;
use ciborium::value::Value;
use std::io::Cursor;
use uuid::Uuid;

pub const FLAG_USER_PRESENT: u8 = 0x01;
pub const FLAG_USER_VERIFIED: u8 = 0x04;
pub const FLAG_ATTESTED_CREDENTIAL: u8 = 0x40;
pub const FLAG_EXTENSION_DATA: u8 = 0x80;

/// rpIdHash (32) + flags (1) + signCount (4)
const FIXED_LEN: usize = 37;

/// aaguid (16) + credentialIdLength (2)
const ATTESTED_HEADER_LEN: usize = 18;

#[derive(Debug, Clone, PartialEq)]
pub struct AttestedCredentialData {
    // ---
    pub aaguid: Uuid,
    pub credential_id: Vec<u8>,
    /// COSE_Key, still CBOR encoded
    pub credential_public_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    // ---
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
    pub attested_credential: Option<AttestedCredentialData>,
    pub extensions: Option<Value>,
}

impl AuthenticatorData {
    // ---
    pub fn parse(bytes: &[u8]) -> Result<Self, CeremonyError> {
        // ---
        if bytes.len() < FIXED_LEN {
            return Err(CeremonyError::malformed(format!(
                "authenticator data is {} bytes, need at least {FIXED_LEN}",
                bytes.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&bytes[..32]);
        let flags = bytes[32];
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);
        let mut rest = &bytes[FIXED_LEN..];

        let attested_credential = if flags & FLAG_ATTESTED_CREDENTIAL != 0 {
            let (credential, remaining) = parse_attested_credential(rest)?;
            rest = remaining;
            Some(credential)
        } else {
            None
        };

        let extensions = if flags & FLAG_EXTENSION_DATA != 0 {
            let (value, remaining) = read_cbor_item(rest, "extensions")?;
            rest = remaining;
            Some(value)
        } else {
            None
        };

        if !rest.is_empty() {
            return Err(CeremonyError::malformed(format!(
                "authenticator data has {} trailing bytes",
                rest.len()
            )));
        }

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential,
            extensions,
        })
    }

    pub fn user_present(&self) -> bool {
        // ---
        self.flags & FLAG_USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        // ---
        self.flags & FLAG_USER_VERIFIED != 0
    }
}

fn parse_attested_credential(
    bytes: &[u8],
) -> Result<(AttestedCredentialData, &[u8]), CeremonyError> {
    // ---
    if bytes.len() < ATTESTED_HEADER_LEN {
        return Err(CeremonyError::malformed(
            "attested credential data is truncated",
        ));
    }

    let aaguid = Uuid::from_slice(&bytes[..16])
        .map_err(|e| CeremonyError::malformed(format!("aaguid: {e}")))?;
    let id_len = u16::from_be_bytes([bytes[16], bytes[17]]) as usize;
    let rest = &bytes[ATTESTED_HEADER_LEN..];
    if rest.len() < id_len {
        return Err(CeremonyError::malformed(format!(
            "credential id length {id_len} exceeds remaining {} bytes",
            rest.len()
        )));
    }
    let (credential_id, rest) = rest.split_at(id_len);

    let (_, remaining) = read_cbor_item(rest, "credential public key")?;
    let key_len = rest.len() - remaining.len();

    Ok((
        AttestedCredentialData {
            aaguid,
            credential_id: credential_id.to_vec(),
            credential_public_key: rest[..key_len].to_vec(),
        },
        remaining,
    ))
}

/// Decode one CBOR item from the front of `bytes`, returning it and whatever follows.
fn read_cbor_item<'a>(bytes: &'a [u8], what: &str) -> Result<(Value, &'a [u8]), CeremonyError> {
    // ---
    let mut cursor = Cursor::new(bytes);
    let value: Value = ciborium::from_reader(&mut cursor)
        .map_err(|e| CeremonyError::malformed(format!("{what}: {e}")))?;
    let consumed = cursor.position() as usize;
    Ok((value, &bytes[consumed..]))
}

/// The CBOR attestation object returned by `navigator.credentials.create`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationObject {
    // ---
    pub fmt: String,
    pub auth_data: Vec<u8>,
    pub att_stmt: Value,
}

impl AttestationObject {
    // ---
    pub fn parse(bytes: &[u8]) -> Result<Self, CeremonyError> {
        // ---
        let value: Value = ciborium::from_reader(bytes)
            .map_err(|e| CeremonyError::malformed(format!("attestationObject: {e}")))?;
        let entries = value
            .into_map()
            .map_err(|_| CeremonyError::malformed("attestationObject is not a CBOR map"))?;

        let mut fmt = None;
        let mut auth_data = None;
        let mut att_stmt = None;
        for (key, value) in entries {
            match key.as_text() {
                Some("fmt") => fmt = value.into_text().ok(),
                Some("authData") => auth_data = value.into_bytes().ok(),
                Some("attStmt") => att_stmt = Some(value),
                _ => {}
            }
        }

        Ok(Self {
            fmt: fmt.ok_or_else(|| CeremonyError::malformed("attestationObject.fmt missing"))?,
            auth_data: auth_data
                .ok_or_else(|| CeremonyError::malformed("attestationObject.authData missing"))?,
            att_stmt: att_stmt
                .ok_or_else(|| CeremonyError::malformed("attestationObject.attStmt missing"))?,
        })
    }

    pub fn authenticator_data(&self) -> Result<AuthenticatorData, CeremonyError> {
        // ---
        AuthenticatorData::parse(&self.auth_data)
    }
}
