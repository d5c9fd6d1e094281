//! Bearer JWT authentication filter for axum/tower pipelines.
//!
//! [`plugin::JwtMiddleware`] holds the verified configuration (public key + accepted
//! algorithm). Its [`layer`](plugin::JwtMiddleware::layer) guards a service: requests with
//! a valid `Authorization: Bearer <jwt>` reach the service with the token's claims in the
//! `X-USER` header, everything else gets a fixed `403 {"error": "forbidden"}`.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod plugin;
pub mod services;

pub use error::ConfigError;
pub use middleware::auth::{FORBIDDEN_BODY, USER_HEADER};
pub use plugin::{CliFlags, JwtConfig, JwtMiddleware};
