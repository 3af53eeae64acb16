//! Protocol core shared by the ceremony endpoints: challenge framing, credential shape
//! checks and the structural parsing that precedes cryptographic verification.

mod authenticator_data;
mod client_data;
mod codec;
mod policy;
mod validator;
mod wire;

pub use authenticator_data::{
    AttestationObject, AttestedCredentialData, AuthenticatorData, FLAG_ATTESTED_CREDENTIAL,
    FLAG_EXTENSION_DATA, FLAG_USER_PRESENT, FLAG_USER_VERIFIED,
};
pub use client_data::CollectedClientData;
pub use codec::{
    ChallengeCodec, DEFAULT_RANDOM_BYTES, FORMAT_VERSION, MAX_RANDOM_BYTES, MAX_USERNAME_BYTES,
    MIN_RANDOM_BYTES,
};
pub use policy::{check_counter, check_transports, check_user_flags};
pub use validator::CredentialValidator;
pub use wire::{
    AssertionOptionsRequest, AssertionResultRequest, AttestationOptionsRequest,
    AttestationResultRequest, ServerAuthenticatorAssertionResponse,
    ServerAuthenticatorAttestationResponse, ServerPublicKeyCredential,
};
