mod challenge;
mod challenge_store;
mod error;
mod metrics;
mod options;
mod repository;
mod username_not_found;
mod verifier;
mod webauthn_models;

// Publicly expose the Metrics abstraction
pub use metrics::{Metrics, MetricsPtr};

// Challenge lifecycle
pub use challenge::{
    Ceremony, Challenge, ChallengeContext, ChallengeMetadata, UserVerificationRequirement,
};
pub use challenge_store::{ChallengeStore, ChallengeStorePtr};

// Error taxonomy
pub use error::{CeremonyError, ChallengeFormatError};

// Relying-party options and their providers
pub use options::{
    merge_extensions, AssertionOptions, AssertionOptionsProvider, AssertionOptionsProviderPtr,
    AttestationConveyancePreference, AttestationOptions, AttestationOptionsProvider,
    AttestationOptionsProviderPtr, AuthenticatorSelectionCriteria, CredentialDescriptor,
    ExtensionInputs, PubKeyCredParam, RelyingPartyEntity, UserEntity,
    PUBLIC_KEY_CREDENTIAL_TYPE,
};

// Publicly expose WebAuthn abstractions
pub use repository::{
    CredentialRecordStore, CredentialRecordStorePtr, UserDirectory, UserDirectoryPtr,
};
pub use username_not_found::{UsernameNotFoundHandler, UsernameNotFoundHandlerPtr};
pub use verifier::{
    AssertionPayload, AttestationPayload, CredentialVerifier, CredentialVerifierPtr,
    ServerProperty, VerificationError, VerifiedAuthentication, VerifiedRegistration,
};
pub use webauthn_models::{CredentialRecord, User};
