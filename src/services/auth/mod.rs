pub mod access_jwt;
pub mod factory;

pub use access_jwt::{AccessVerifier, ClaimSet, InvalidToken, VerificationResult};
pub use factory::build_jwt_middleware;
