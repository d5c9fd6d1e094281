/*
 * Responsibility
 * - 起動時の設定エラー (鍵がない / 読めない / パースできない) の定義
 * - リクエスト単位の検証失敗は services::auth::InvalidToken 側で扱う
 */
use std::path::PathBuf;

use jsonwebtoken::Algorithm;
use thiserror::Error;

/// Fatal at construction time: the middleware must not be created.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("please supply a public key")]
    MissingPublicKey,
    #[error("please supply a public key file")]
    MissingPublicKeyFile,
    #[error("cannot read public key file {}: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid public key: {0}")]
    InvalidPublicKey(#[source] jsonwebtoken::errors::Error),
    #[error("unsupported algorithm {0:?}: only public-key algorithms are accepted")]
    UnsupportedAlgorithm(Algorithm),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
