use anyhow::Context;

use estore_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    estore_observability::init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let bind_addr = config.bind_addr.clone();

    let app = estore_api::app::build_app(config)
        .await
        .context("failed to initialize backends")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
