// SPDX-License-Identifier: Apache-2.0

//! Command-line interface for the `gitgate` binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Authenticating reverse proxy for GitHub and GitHub Enterprise.
#[derive(Debug, Parser)]
#[command(name = "gitgate", version, about, long_about = None)]
pub struct Cli {
    /// Path to the policy configuration file (JSON).
    #[arg(long, env = "GITGATE_CONFIG")]
    pub config: PathBuf,

    /// Address the proxy listens on.
    #[arg(long, env = "GITGATE_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// Address the Prometheus `/metrics` endpoint listens on.
    #[arg(long, env = "GITGATE_METRICS_ADDR", default_value = "0.0.0.0:9090")]
    pub metrics_addr: SocketAddr,

    /// Seconds to wait for in-flight requests to drain during shutdown.
    #[arg(long, env = "GITGATE_SHUTDOWN_TIMEOUT_SECS", default_value_t = 30)]
    pub shutdown_timeout_secs: u64,
}
