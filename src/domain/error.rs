//! Ceremony error taxonomy.
//!
//! Every pipeline stage returns one of these; the HTTP layer translates them to wire
//! responses in exactly one place.

use super::verifier::VerificationError;
use thiserror::Error;

/// Failure to encode or decode the metadata carried in a challenge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChallengeFormatError {
    #[error("challenge is truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("challenge has {0} unexpected trailing bytes")]
    TrailingBytes(usize),

    #[error("unsupported challenge format version {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("random segment of {actual} bytes is below the {minimum}-byte floor")]
    InsufficientRandomness { minimum: usize, actual: usize },

    #[error("random segment of {actual} bytes exceeds the {maximum}-byte length field")]
    ExcessiveRandomness { maximum: usize, actual: usize },

    #[error("reserved header bits set: {0:#04x}")]
    ReservedBits(u8),

    #[error("unknown user verification code {0}")]
    UnknownVerificationCode(u8),

    #[error("username length {0} given for an absent username")]
    PhantomUsername(usize),

    #[error("username is {0} bytes, longer than the 65535-byte limit")]
    UsernameTooLong(usize),

    #[error("username is not valid UTF-8")]
    InvalidUsername,

    #[error("challenge does not name a user")]
    MissingUsername,
}

/// Everything that can end a ceremony request.
#[derive(Debug, Error)]
pub enum CeremonyError {
    /// Unparseable body or a missing/invalid required field.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("challenge metadata is invalid: {0}")]
    ChallengeFormat(#[from] ChallengeFormatError),

    /// Expired, already consumed, or never issued.
    #[error("challenge not found")]
    ChallengeNotFound,

    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// Backend failure (store, database, serialization).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CeremonyError {
    // ---
    pub fn malformed(message: impl Into<String>) -> Self {
        // ---
        Self::MalformedInput(message.into())
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        // ---
        match self {
            CeremonyError::MalformedInput(_) => "malformed_input",
            CeremonyError::ChallengeFormat(_) => "challenge_format",
            CeremonyError::ChallengeNotFound => "challenge_not_found",
            CeremonyError::Verification(_) => "verification",
            CeremonyError::UnknownUser(_) => "unknown_user",
            CeremonyError::Internal(_) => "internal",
        }
    }
}
