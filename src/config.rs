/*
 * Responsibility
 * - 環境変数からの設定読み込み (PORT, JWT 公開鍵, アルゴリズム, timeout など)
 * - 設定値のバリデーション (不正なら起動失敗)
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::error::ConfigError;
use crate::plugin::DEFAULT_ALGORITHM;

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,

    // PEM; `--publicKeyFile` takes precedence when given
    pub jwt_public_key_pem: Option<String>,
    pub jwt_algorithm: Algorithm,

    pub request_timeout: Duration,
    pub request_body_limit_bytes: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field(
                "jwt_public_key_pem",
                &self.jwt_public_key_pem.as_ref().map(|_| "********"),
            )
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("request_timeout", &self.request_timeout)
            .field("request_body_limit_bytes", &self.request_body_limit_bytes)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (the environment in production).
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match var("PORT") {
            Some(s) => s.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let jwt_public_key_pem = var("JWT_PUBLIC_KEY_PEM")
            .map(|pem| pem.replace("\\n", "\n"))
            .filter(|pem| !pem.trim().is_empty());

        let jwt_algorithm = match var("JWT_ALGORITHM") {
            Some(s) => Algorithm::from_str(s.trim())
                .map_err(|_| ConfigError::Invalid("JWT_ALGORITHM"))?,
            None => DEFAULT_ALGORITHM,
        };

        let request_timeout = var("REQUEST_TIMEOUT_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let request_body_limit_bytes = var("REQUEST_BODY_LIMIT_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        Ok(Self {
            addr,
            jwt_public_key_pem,
            jwt_algorithm,
            request_timeout,
            request_body_limit_bytes,
        })
    }
}
