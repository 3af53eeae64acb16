use axum::response::IntoResponse;

pub async fn root_handler() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"FIDO2 relying-party server
Version: {version}

Available endpoints:
  - POST   /webauthn/attestation/options - Registration options and challenge
  - POST   /webauthn/attestation/result  - Verify and store a new credential
  - POST   /webauthn/assertion/options   - Authentication options and challenge
  - POST   /webauthn/assertion/result    - Verify an assertion
  - GET    /health                       - Light health check
  - GET    /health?mode=full             - Full health check (includes challenge store)
  - GET    /metrics                      - Prometheus metrics
"#
    )
}
