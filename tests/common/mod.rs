//! Shared fixtures: a mocked Asgardeo tenant that signs ID tokens with a test key

#![allow(dead_code)]

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SIGNING_KEY: &[u8] = include_bytes!("../fixtures/id_token_signing_key.pem");
pub const KID: &str = "idcard-test-key";
const MODULUS: &str = "ubO1zE3aSR20sfNDr1Gtyr8kDJo_MTQe71UTf5bn91kSq4IX2LAoWPHUcDHn1JTp3eS8p0Woy6t8m_7Rm6ksd8CwG3YqLyhNxasnUeE1OvWmVCF7nX8YMbSfiDPRlhx-ToGyfsFzv_l6zxx2DzIcBgvfG3jMV8sk2fUKK758I_dz37ruqr-qXM88-Hu6MRqzzmnXW1-RYWzA3Rx_IviEeAfFM5us6G_m37ywDzoMhynruTfAxiSoBMIDs8o_HvNsigwKRUpymXZfRSeocxxNefxbDARfcqHwCbamgzTZ9SvHbJx5EzTdnHLCYnByemH58swreFprlygWFefuaS-Dpw";
pub const CLIENT_ID: &str = "portal-client";

/// Tenant base URL on the mock server, like `https://api.asgardeo.io/t/<org>`
pub fn tenant(server: &MockServer) -> String {
    format!("{}/t/uni", server.uri())
}

pub async fn mount_jwks(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/t/uni/oauth2/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [{
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "kid": KID,
                "n": MODULUS,
                "e": "AQAB"
            }]
        })))
        .mount(server)
        .await;
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// ID token claims as Asgardeo issues them for this tenant
pub fn id_token_claims(server: &MockServer, roles: Value) -> Value {
    json!({
        "sub": "user-42",
        "iss": format!("{}/oauth2/token", tenant(server)),
        "aud": CLIENT_ID,
        "exp": now_secs() + 600,
        "iat": now_secs(),
        "name": "Grace Hopper",
        "email": "grace@uni.edu",
        "student_id": "2024001",
        "involvement": "Postgraduate",
        "valid_thru": "2028-06-30",
        "roles": roles
    })
}

pub fn sign_with_kid(claims: &Value, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(SIGNING_KEY).unwrap(),
    )
    .unwrap()
}

pub fn sign(claims: &Value) -> String {
    sign_with_kid(claims, KID)
}
