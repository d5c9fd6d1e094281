/*
 * Responsibility
 * - middleware の設定レコード (JwtConfig) とその検証済み形 (JwtMiddleware)
 * - 登録用の薄いアダプタ: シリアライズ済みレコードから / CLI フラグから
 * - どの経路も JwtMiddleware::with_algorithm に集約する (独自ロジックは持たない)
 */
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Command};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::middleware::auth::access::{JwtHandler, JwtLayer};
use crate::services::auth::AccessVerifier;

/// Stable identifier of this middleware.
pub const TYPE: &str = "jwt";

/// Default when a record or flag set does not name an algorithm.
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::RS256;

fn default_algorithm() -> Algorithm {
    DEFAULT_ALGORITHM
}

/// Serialized form of the middleware configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtConfig {
    /// PEM-encoded public key, stored as standard base64.
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("public_key", &"********")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Validated configuration: the record plus the parsed verifier.
///
/// Built once at startup, then shared read-only by every request.
#[derive(Clone, Debug)]
pub struct JwtMiddleware {
    config: JwtConfig,
    verifier: Arc<AccessVerifier>,
}

impl JwtMiddleware {
    /// RS256 middleware for the given PEM public key.
    pub fn new(public_key: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        Self::with_algorithm(public_key, DEFAULT_ALGORITHM)
    }

    pub fn with_algorithm(
        public_key: impl Into<Vec<u8>>,
        algorithm: Algorithm,
    ) -> Result<Self, ConfigError> {
        let public_key = public_key.into();
        let verifier = AccessVerifier::new(&public_key, algorithm)?;

        Ok(Self {
            config: JwtConfig {
                public_key,
                algorithm,
            },
            verifier: Arc::new(verifier),
        })
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn verifier(&self) -> &Arc<AccessVerifier> {
        &self.verifier
    }

    pub fn layer(&self) -> JwtLayer {
        JwtLayer::new(self.verifier.clone())
    }

    /// Compose the filter with the handler it guards.
    pub fn new_handler<S>(&self, next: S) -> JwtHandler<S> {
        JwtHandler::new(self.verifier.clone(), next)
    }
}

impl fmt::Display for JwtMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key=********, alg={:?}", self.verifier().algorithm())
    }
}

/// Command-line flags for constructing the middleware.
#[derive(Args, Debug, Clone, Default)]
pub struct CliFlags {
    /// Path to file with Public Key (PEM)
    #[arg(
        long = "publicKeyFile",
        short = 'k',
        visible_alias = "public-key-file",
        value_name = "FILE"
    )]
    pub public_key_file: Option<PathBuf>,

    /// Signing algorithm accepted for access tokens (e.g. RS256, ES256, EdDSA)
    #[arg(long, value_parser = parse_algorithm)]
    pub algorithm: Option<Algorithm>,
}

fn parse_algorithm(s: &str) -> Result<Algorithm, String> {
    s.parse::<Algorithm>()
        .map_err(|_| format!("unknown algorithm: {s}"))
}

/// Rebuild from a previously serialized record.
pub fn from_other(config: JwtConfig) -> Result<JwtMiddleware, ConfigError> {
    JwtMiddleware::with_algorithm(config.public_key, config.algorithm)
}

/// Build from command-line flags; the key file must exist and parse.
pub fn from_cli(flags: &CliFlags) -> Result<JwtMiddleware, ConfigError> {
    let path = flags
        .public_key_file
        .as_ref()
        .ok_or(ConfigError::MissingPublicKeyFile)?;

    let key = std::fs::read(path).map_err(|source| ConfigError::KeyFile {
        path: path.clone(),
        source,
    })?;

    JwtMiddleware::with_algorithm(key, flags.algorithm.unwrap_or(DEFAULT_ALGORITHM))
}

/// How a host registers this middleware.
#[derive(Clone, Copy)]
pub struct MiddlewareSpec {
    pub type_name: &'static str,
    pub from_other: fn(JwtConfig) -> Result<JwtMiddleware, ConfigError>,
    pub from_cli: fn(&CliFlags) -> Result<JwtMiddleware, ConfigError>,
    pub command: fn() -> Command,
}

impl fmt::Debug for MiddlewareSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareSpec")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

pub fn spec() -> MiddlewareSpec {
    MiddlewareSpec {
        type_name: TYPE,
        from_other,
        from_cli,
        command: cli_command,
    }
}

/// `jwt` subcommand carrying [`CliFlags`], for host CLIs and usage output.
pub fn cli_command() -> Command {
    CliFlags::augment_args(
        Command::new(TYPE).about("Verify bearer JWTs and forward their claims in X-USER"),
    )
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(de::Error::custom)
    }
}
