/*
 * Responsibility
 * - CLI 引数の解析と tokio runtime 起動
 * - app::run() の呼び出し（ロジックは置かない）
 */
use anyhow::Result;
use clap::Parser;

use jwt_gate::{app, plugin::CliFlags};

/// Bearer JWT gateway: verifies access tokens and forwards their claims in X-USER.
#[derive(Parser, Debug)]
#[command(name = "jwt-gate", version, about)]
struct Cli {
    #[command(flatten)]
    jwt: CliFlags,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    app::init_tracing();
    app::run(&cli.jwt).await
}
