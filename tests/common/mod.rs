#![allow(dead_code)]

use axum::body::Body;
use axum::http::Response;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

use jwt_gate::JwtMiddleware;

pub const PRIVATE_KEY: &str = include_str!("../fixtures/jwt_test.rsa");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/jwt_test.rsa.pub");
pub const OTHER_PRIVATE_KEY: &str = include_str!("../fixtures/other.rsa");

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn sign_with(private_pem: &str, claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
}

/// Token for `user_id`, valid for one hour.
pub fn create_jwt_token(user_id: &str) -> String {
    sign_with(PRIVATE_KEY, &json!({"userid": user_id, "exp": now() + 3600}))
}

/// Correctly signed token that expired an hour ago.
pub fn create_expired_jwt_token(user_id: &str) -> String {
    sign_with(PRIVATE_KEY, &json!({"userid": user_id, "exp": now() - 3600}))
}

pub fn jwt() -> JwtMiddleware {
    JwtMiddleware::new(PUBLIC_KEY).unwrap()
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
