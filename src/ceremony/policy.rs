use super::authenticator_data::AuthenticatorData;
use crate::domain::{UserVerificationRequirement, VerificationError};

/// User presence is always required; the UV flag only when the challenge demanded it.
pub fn check_user_flags(
    auth_data: &AuthenticatorData,
    requirement: UserVerificationRequirement,
) -> Result<(), VerificationError> {
    // ---
    if !auth_data.user_present() {
        return Err(VerificationError::UserNotPresent);
    }
    if requirement.is_required() && !auth_data.user_verified() {
        return Err(VerificationError::UserNotVerified);
    }
    Ok(())
}

/// Every transport the authenticator reports must be on the relying party's list.
/// An empty list accepts any transport.
pub fn check_transports(allowed: &[String], reported: &[String]) -> Result<(), VerificationError> {
    // ---
    if allowed.is_empty() {
        return Ok(());
    }
    match reported.iter().find(|transport| !allowed.contains(transport)) {
        Some(transport) => Err(VerificationError::TransportNotAllowed(transport.clone())),
        None => Ok(()),
    }
}

/// Signature counters must strictly increase, except for authenticators that do not
/// implement one and always report zero.
pub fn check_counter(stored: u32, presented: u32) -> Result<(), VerificationError> {
    // ---
    if stored == 0 && presented == 0 {
        return Ok(());
    }
    if presented <= stored {
        return Err(VerificationError::CounterRegression { stored, presented });
    }
    Ok(())
}
