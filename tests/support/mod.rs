//! Shared test fixtures
//!
//! Builds the component graph against a fake transport and fabricates
//! tokens with controllable expiry. No test in this suite touches the
//! network.
#![allow(dead_code)]

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::json;
use xray_mcp::{FakeTransport, ToolContext, Transport, XrayConfig};

pub const CLIENT_SECRET: &str = "fixture-client-secret";

pub fn config() -> XrayConfig {
    XrayConfig::from_env(vec![
        ("XRAY_CLIENT_ID".to_string(), "fixture-client-id".to_string()),
        ("XRAY_CLIENT_SECRET".to_string(), CLIENT_SECRET.to_string()),
        (
            "XRAY_BASE_URL".to_string(),
            "https://xray.test.invalid".to_string(),
        ),
    ])
    .expect("fixture config is valid")
}

pub fn fake_context() -> (ToolContext, Arc<Transport>) {
    let transport = Arc::new(Transport::Fake(FakeTransport::new()));
    let ctx = ToolContext::new(config(), Arc::clone(&transport));
    (ctx, transport)
}

pub fn fake(transport: &Transport) -> &FakeTransport {
    match transport {
        Transport::Fake(fake) => fake,
        Transport::Http(_) => panic!("fixture context uses the fake transport"),
    }
}

/// A structurally valid JWT whose `exp` lies `offset_secs` from now.
pub fn jwt_expiring_in(offset_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + offset_secs;
    jwt_with_payload(&json!({ "exp": exp, "iss": "fixture" }).to_string())
}

/// A structurally valid JWT with an arbitrary payload.
pub fn jwt_with_payload(payload: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
    format!("{header}.{body}.fixture-signature")
}

/// The authenticate response body in its bare-string form.
pub fn auth_body(token: &str) -> String {
    format!("\"{token}\"")
}

/// Script a successful authenticate exchange as the next reply.
pub async fn push_auth_ok(transport: &Transport) -> String {
    let token = jwt_expiring_in(3600);
    fake(transport).push_response(200, &auth_body(&token)).await;
    token
}
