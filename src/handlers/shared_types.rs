use crate::domain::CeremonyError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Generic message for every failure a client could learn something from.
pub const VERIFICATION_FAILED: &str = "Verification failed";

pub const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Failed,
}

/// Envelope shared by every ceremony response.
///
/// The payload is flattened next to `status` and `errorMessage`, so an options
/// response is still a valid options dictionary for the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerResponse<T> {
    pub status: Status,
    pub error_message: String,
    #[serde(flatten)]
    pub body: T,
}

/// Body of responses that carry nothing beyond the envelope.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

impl<T> ServerResponse<T> {
    // ---
    pub fn ok(body: T) -> Self {
        // ---
        Self {
            status: Status::Ok,
            error_message: String::new(),
            body,
        }
    }
}

impl ServerResponse<Empty> {
    // ---
    pub fn failed(message: impl Into<String>) -> Self {
        // ---
        Self {
            status: Status::Failed,
            error_message: message.into(),
            body: Empty {},
        }
    }
}

impl<T> IntoResponse for ServerResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        axum::Json(self).into_response()
    }
}

/// The one place ceremony errors become wire responses.
///
/// Only malformed input is described to the client; every other rejection
/// reads the same so the response is no oracle for which check failed.
impl IntoResponse for CeremonyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CeremonyError::MalformedInput(detail) => {
                tracing::warn!(kind = self.kind(), "Rejected malformed request: {detail}");
                (StatusCode::BAD_REQUEST, detail.clone())
            }
            CeremonyError::ChallengeFormat(_)
            | CeremonyError::ChallengeNotFound
            | CeremonyError::Verification(_)
            | CeremonyError::UnknownUser(_) => {
                tracing::warn!(kind = self.kind(), "Ceremony rejected: {self}");
                (StatusCode::UNAUTHORIZED, VERIFICATION_FAILED.to_string())
            }
            CeremonyError::Internal(err) => {
                tracing::error!("Ceremony failed: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
        };

        (status, ServerResponse::failed(message)).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::domain::{ChallengeFormatError, VerificationError};
    use serde_json::json;

    async fn body_json(response: Response) -> serde_json::Value {
        // ---
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn ok_envelope_flattens_body() {
        // ---
        #[derive(Serialize)]
        struct Body {
            challenge: &'static str,
        }

        let value = serde_json::to_value(ServerResponse::ok(Body { challenge: "AQID" })).unwrap();
        assert_eq!(value, json!({ "status": "ok", "errorMessage": "", "challenge": "AQID" }));

        let value = serde_json::to_value(ServerResponse::ok(Empty {})).unwrap();
        assert_eq!(value, json!({ "status": "ok", "errorMessage": "" }));
    }

    #[tokio::test]
    async fn malformed_input_keeps_its_detail() {
        // ---
        let response = CeremonyError::malformed("rawId is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "status": "failed", "errorMessage": "rawId is required" })
        );
    }

    #[tokio::test]
    async fn rejections_are_indistinguishable() {
        // ---
        let errors = [
            CeremonyError::ChallengeNotFound,
            CeremonyError::ChallengeFormat(ChallengeFormatError::ReservedBits(0x80)),
            CeremonyError::Verification(VerificationError::UserNotVerified),
            CeremonyError::Verification(VerificationError::CounterRegression {
                stored: 9,
                presented: 3,
            }),
            CeremonyError::UnknownUser("mallory".into()),
        ];

        for err in errors {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                body_json(response).await,
                json!({ "status": "failed", "errorMessage": VERIFICATION_FAILED })
            );
        }
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        // ---
        let err = CeremonyError::from(anyhow::anyhow!("redis at 10.0.0.3 refused"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["errorMessage"], json!(INTERNAL_ERROR));
    }
}
