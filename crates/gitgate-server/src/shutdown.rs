// SPDX-License-Identifier: Apache-2.0

//! Graceful shutdown signal handling.

use tokio::signal;

/// Resolves once either `SIGINT` (Ctrl-C) or `SIGTERM` is received.
///
/// Passed to [`axum::serve::Serve::with_graceful_shutdown`] so in-flight
/// requests get a chance to finish before the listener is dropped.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl-C, starting graceful shutdown"),
        () = terminate => tracing::info!("received SIGTERM, starting graceful shutdown"),
    }
}
