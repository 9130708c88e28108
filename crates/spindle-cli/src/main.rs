use anyhow::Context;
use spindle_core::app::{AppBuilder, SpindleConfig};
use tracing::info;

/// 1 プロセスで HTTP / consumer / worker pool を動かす（store と broker はインメモリ）
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = SpindleConfig::from_env().context("reading SPINDLE_* configuration")?;
    let app = AppBuilder::new(config).build()?;
    let workers = app.start().await.context("starting workers")?;

    let addr = app.config.listen_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    // HTTP を止めてから、受信停止 → 実行中のタスクを待つ
    let stats = workers.shutdown().await;
    info!(
        received = stats.received,
        admitted = stats.admitted,
        malformed = stats.malformed,
        "shut down"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed, shutting down");
    }
    info!("shutdown requested");
}
