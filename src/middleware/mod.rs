/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: Bearer JWT 検証 (X-USER 付与 / 403)
 * - http: request-id, trace, body limit, timeout
 */
pub mod auth;
pub mod http;
