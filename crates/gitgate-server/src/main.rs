// SPDX-License-Identifier: Apache-2.0

//! `gitgate`: an authenticating reverse proxy for GitHub and GitHub
//! Enterprise.

mod app;
mod cli;
mod error;
mod logging;
mod metrics;
mod proxy;
mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gitgate_core::Authorizer;

use crate::cli::Cli;
use crate::metrics::PrometheusObserver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();

    let config_bytes = std::fs::read(&cli.config)
        .with_context(|| format!("could not read configuration file {:?}", cli.config))?;
    let configuration = gitgate_core::config::load(&config_bytes)
        .context("could not load configuration")?;
    let authorizer = Arc::new(
        Authorizer::new(&configuration).context("could not build authorizer from configuration")?,
    );
    tracing::info!(
        endpoints = authorizer.endpoints().len(),
        "authorizer built from configuration"
    );

    let observer = Arc::new(PrometheusObserver::new());
    let state = app::AppState::new(authorizer, observer.clone());

    let proxy_listener = tokio::net::TcpListener::bind(cli.addr)
        .await
        .with_context(|| format!("could not bind proxy listener on {}", cli.addr))?;
    let metrics_listener = tokio::net::TcpListener::bind(cli.metrics_addr)
        .await
        .with_context(|| format!("could not bind metrics listener on {}", cli.metrics_addr))?;

    tracing::info!(addr = %cli.addr, "proxy listening");
    tracing::info!(addr = %cli.metrics_addr, "metrics listening");

    let shutdown_timeout = Duration::from_secs(cli.shutdown_timeout_secs);

    let proxy_server = axum::serve(proxy_listener, app::router(state))
        .with_graceful_shutdown(shutdown_with_timeout(shutdown_timeout));
    let metrics_server = axum::serve(metrics_listener, app::metrics_router(observer))
        .with_graceful_shutdown(shutdown_with_timeout(shutdown_timeout));

    let (proxy_result, metrics_result) = tokio::join!(proxy_server, metrics_server);
    proxy_result.context("proxy server exited with an error")?;
    metrics_result.context("metrics server exited with an error")?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal, then returns so axum can stop accepting new
/// connections and begin draining in-flight ones.
///
/// Also arms a deadman's switch: if the drain is still running after
/// `timeout`, the process exits immediately rather than hanging forever.
async fn shutdown_with_timeout(timeout: Duration) {
    shutdown::wait_for_signal().await;
    tracing::info!(seconds = timeout.as_secs(), "draining in-flight requests");
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        tracing::error!("graceful shutdown exceeded timeout, forcing exit");
        std::process::exit(1);
    });
}
