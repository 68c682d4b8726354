use std::sync::Arc;

use anyhow::Context;

use sealforge_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sealforge_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let services = Arc::new(sealforge_api::app::build_services(&config).await?);
    let sweeper = services.sweeper(&config).spawn();
    tracing::info!(
        interval_secs = config.sweeper.interval.as_secs(),
        batch_size = config.sweeper.batch_size,
        "expiration sweeper started"
    );

    let app = sealforge_api::app::build_app(config.jwt_secret.clone(), services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("server error")?;

    sweeper.shutdown().await;
    tracing::info!("shut down");
    Ok(())
}
