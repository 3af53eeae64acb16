//! Challenge codec: embeds ceremony metadata in challenge bytes.
//!
//! A ceremony that spans disconnected requests needs the result phase to know which
//! user-verification policy was asked for and which user is registering. The client is
//! required to return the challenge untouched inside `clientDataJSON`, so that state
//! rides along in the challenge itself.
//!
//! Layout (every length explicit, no delimiters):
//!
//! ```text
//! offset  size  field
//! 0       1     format version (0x01)
//! 1       1     random length R, R >= 16
//! 2       R     caller-supplied random bytes, copied verbatim
//! 2+R     1     header: bits 0-1 user verification (1 required, 2 preferred,
//!               3 discouraged), bit 2 username present, bits 3-7 reserved (zero)
//! 3+R     2     username length L, big endian, zero when absent
//! 5+R     L     username, UTF-8
//! ```
//!
//! The random segment is never shortened or replaced, so the challenge keeps at least
//! [`MIN_RANDOM_BYTES`] bytes of entropy no matter what metadata is attached.

use crate::domain::{
    Challenge, ChallengeFormatError, ChallengeMetadata, UserVerificationRequirement,
};
use rand::rngs::OsRng;
use rand::RngCore;

pub const FORMAT_VERSION: u8 = 0x01;

/// Entropy floor: 128 bits.
pub const MIN_RANDOM_BYTES: usize = 16;

pub const DEFAULT_RANDOM_BYTES: usize = 32;

/// The random length is carried in one byte.
pub const MAX_RANDOM_BYTES: usize = u8::MAX as usize;

pub const MAX_USERNAME_BYTES: usize = u16::MAX as usize;

const UV_MASK: u8 = 0b0000_0011;
const USERNAME_PRESENT: u8 = 0b0000_0100;
const RESERVED_MASK: u8 = !(UV_MASK | USERNAME_PRESENT);

/// Fixed bytes around the random segment: version, random length, header, username length.
const FRAME_OVERHEAD: usize = 1 + 1 + 1 + 2;

/// Packs and unpacks [`ChallengeMetadata`] into challenge bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeCodec {
    random_len: usize,
}

impl Default for ChallengeCodec {
    fn default() -> Self {
        Self {
            random_len: DEFAULT_RANDOM_BYTES,
        }
    }
}

impl ChallengeCodec {
    // ---
    /// Codec whose [`random_bytes`](Self::random_bytes) yields `random_len` bytes.
    pub fn new(random_len: usize) -> Result<Self, ChallengeFormatError> {
        // ---
        check_random_len(random_len)?;
        Ok(Self { random_len })
    }

    pub fn random_len(&self) -> usize {
        // ---
        self.random_len
    }

    /// Fresh randomness from the operating system CSPRNG.
    pub fn random_bytes(&self) -> Vec<u8> {
        // ---
        let mut bytes = vec![0u8; self.random_len];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }

    /// Generate randomness and encode `metadata` in one step.
    pub fn issue(&self, metadata: &ChallengeMetadata) -> Result<Challenge, ChallengeFormatError> {
        // ---
        self.encode(
            &self.random_bytes(),
            metadata.user_verification,
            metadata.username.as_deref(),
        )
    }

    /// Append ceremony metadata to caller-supplied randomness.
    pub fn encode(
        &self,
        random: &[u8],
        user_verification: UserVerificationRequirement,
        username: Option<&str>,
    ) -> Result<Challenge, ChallengeFormatError> {
        // ---
        check_random_len(random.len())?;

        let username_bytes = username.map(str::as_bytes).unwrap_or_default();
        if username_bytes.len() > MAX_USERNAME_BYTES {
            return Err(ChallengeFormatError::UsernameTooLong(username_bytes.len()));
        }

        let mut header = uv_code(user_verification);
        if username.is_some() {
            header |= USERNAME_PRESENT;
        }

        let mut bytes = Vec::with_capacity(FRAME_OVERHEAD + random.len() + username_bytes.len());
        bytes.push(FORMAT_VERSION);
        bytes.push(random.len() as u8);
        bytes.extend_from_slice(random);
        bytes.push(header);
        bytes.extend_from_slice(&(username_bytes.len() as u16).to_be_bytes());
        bytes.extend_from_slice(username_bytes);

        Ok(Challenge::new(bytes))
    }

    pub fn decode(&self, challenge: &Challenge) -> Result<ChallengeMetadata, ChallengeFormatError> {
        // ---
        parse(challenge.as_bytes()).map(|(_, metadata)| metadata)
    }

    pub fn decode_verification_requirement(
        &self,
        challenge: &Challenge,
    ) -> Result<UserVerificationRequirement, ChallengeFormatError> {
        // ---
        self.decode(challenge).map(|metadata| metadata.user_verification)
    }

    pub fn decode_username(
        &self,
        challenge: &Challenge,
    ) -> Result<Option<String>, ChallengeFormatError> {
        // ---
        self.decode(challenge).map(|metadata| metadata.username)
    }

    /// The random segment embedded in `challenge`.
    pub fn random_segment<'a>(
        &self,
        challenge: &'a Challenge,
    ) -> Result<&'a [u8], ChallengeFormatError> {
        // ---
        parse(challenge.as_bytes()).map(|(random, _)| random)
    }
}

fn check_random_len(len: usize) -> Result<(), ChallengeFormatError> {
    // ---
    if len < MIN_RANDOM_BYTES {
        return Err(ChallengeFormatError::InsufficientRandomness {
            minimum: MIN_RANDOM_BYTES,
            actual: len,
        });
    }
    if len > MAX_RANDOM_BYTES {
        return Err(ChallengeFormatError::ExcessiveRandomness {
            maximum: MAX_RANDOM_BYTES,
            actual: len,
        });
    }
    Ok(())
}

fn uv_code(requirement: UserVerificationRequirement) -> u8 {
    // ---
    match requirement {
        UserVerificationRequirement::Required => 1,
        UserVerificationRequirement::Preferred => 2,
        UserVerificationRequirement::Discouraged => 3,
    }
}

fn uv_from_code(code: u8) -> Result<UserVerificationRequirement, ChallengeFormatError> {
    // ---
    match code {
        1 => Ok(UserVerificationRequirement::Required),
        2 => Ok(UserVerificationRequirement::Preferred),
        3 => Ok(UserVerificationRequirement::Discouraged),
        other => Err(ChallengeFormatError::UnknownVerificationCode(other)),
    }
}

/// Bounds-checked cursor over the challenge bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    // ---
    fn take(&mut self, len: usize) -> Result<&'a [u8], ChallengeFormatError> {
        // ---
        let end = self.offset + len;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(ChallengeFormatError::Truncated {
                needed: end,
                actual: self.bytes.len(),
            })?;
        self.offset = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, ChallengeFormatError> {
        // ---
        Ok(self.take(1)?[0])
    }

    fn remaining(&self) -> usize {
        // ---
        self.bytes.len() - self.offset
    }
}

fn parse(bytes: &[u8]) -> Result<(&[u8], ChallengeMetadata), ChallengeFormatError> {
    // ---
    let mut reader = Reader { bytes, offset: 0 };

    let version = reader.byte()?;
    if version != FORMAT_VERSION {
        return Err(ChallengeFormatError::UnsupportedVersion(version));
    }

    let random_len = reader.byte()? as usize;
    if random_len < MIN_RANDOM_BYTES {
        return Err(ChallengeFormatError::InsufficientRandomness {
            minimum: MIN_RANDOM_BYTES,
            actual: random_len,
        });
    }
    let random = reader.take(random_len)?;

    let header = reader.byte()?;
    if header & RESERVED_MASK != 0 {
        return Err(ChallengeFormatError::ReservedBits(header & RESERVED_MASK));
    }
    let user_verification = uv_from_code(header & UV_MASK)?;

    let length_bytes = reader.take(2)?;
    let username_len = u16::from_be_bytes([length_bytes[0], length_bytes[1]]) as usize;

    let username = if header & USERNAME_PRESENT != 0 {
        let raw = reader.take(username_len)?;
        let username =
            std::str::from_utf8(raw).map_err(|_| ChallengeFormatError::InvalidUsername)?;
        Some(username.to_string())
    } else if username_len != 0 {
        return Err(ChallengeFormatError::PhantomUsername(username_len));
    } else {
        None
    };

    if reader.remaining() != 0 {
        return Err(ChallengeFormatError::TrailingBytes(reader.remaining()));
    }

    Ok((
        random,
        ChallengeMetadata {
            user_verification,
            username,
        },
    ))
}
