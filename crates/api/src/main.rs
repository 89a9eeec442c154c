use anyhow::Context;

use livebase_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    livebase_observability::init(&config.logging);

    if config.uses_insecure_secret() {
        tracing::warn!("auth.jwt_secret not set; using insecure dev default");
    }

    let bind_addr = config.server.bind_addr.clone();
    let app = livebase_api::app::build_app(config)
        .await
        .context("building application")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}
