/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health は素通し, それ以外は JWT filter を通す
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{health::health, whoami::whoami};
use crate::middleware;
use crate::plugin::JwtMiddleware;

pub fn routes(jwt: &JwtMiddleware) -> Router {
    let protected = Router::new().route("/whoami", get(whoami));
    let protected = middleware::auth::access::apply(protected, jwt);

    Router::new().route("/health", get(health)).merge(protected)
}
