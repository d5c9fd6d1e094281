/*
 * Responsibility
 * - tracing の初期化
 * - Config 読み込み → JwtMiddleware 構築 → Router 組み立て
 * - axum::serve() で起動
 */
use anyhow::Result;
use axum::Router;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    api,
    config::Config,
    middleware,
    plugin::{CliFlags, JwtMiddleware},
    services::auth::build_jwt_middleware,
};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,jwt_gate=debug")),
        )
        .init();
}

pub async fn run(flags: &CliFlags) -> Result<()> {
    let config = Config::from_env()?;
    // Key problems surface here, before the listener is bound.
    let jwt = build_jwt_middleware(&config, flags)?;

    let app = build_router(&config, &jwt);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, %jwt, "jwt-gate listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(config: &Config, jwt: &JwtMiddleware) -> Router {
    let router = Router::new().nest("/api/v1", api::v1::routes(jwt));
    middleware::http::apply(router, config)
}
