// Gateway module - controls public API for handlers
// Modules are private, only exported symbols are public

mod assertion_options;
mod assertion_result;
mod attestation_options;
mod attestation_result;
mod ceremony;
mod health;
mod metrics;
mod root;
mod shared_types;

// Core handlers
pub use health::health_check;
pub use metrics::{metrics_handler, track_requests};
pub use root::root_handler;

// Ceremony endpoints
pub use assertion_options::AssertionOptionsHandler;
pub use assertion_result::AssertionResultHandler;
pub use attestation_options::AttestationOptionsHandler;
pub use attestation_result::AttestationResultHandler;
pub use ceremony::CeremonyRequestHandler;
pub(crate) use ceremony::route as ceremony_route;

// Wire envelope
pub use shared_types::{Empty, ServerResponse, Status, INTERNAL_ERROR, VERIFICATION_FAILED};
