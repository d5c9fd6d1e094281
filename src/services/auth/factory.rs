//! Factory: build `JwtMiddleware` from command-line flags or application `Config`.
use crate::config::Config;
use crate::error::ConfigError;
use crate::plugin::{self, CliFlags, JwtMiddleware};

pub fn build_jwt_middleware(
    config: &Config,
    flags: &CliFlags,
) -> Result<JwtMiddleware, ConfigError> {
    if flags.public_key_file.is_some() {
        return plugin::from_cli(flags);
    }

    let pem = config
        .jwt_public_key_pem
        .as_deref()
        .ok_or(ConfigError::MissingPublicKey)?;

    JwtMiddleware::with_algorithm(pem, flags.algorithm.unwrap_or(config.jwt_algorithm))
}
