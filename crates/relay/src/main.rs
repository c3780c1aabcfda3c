// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ks-relay: session relay between the kenscore operator console and
//! public displays.

use clap::Parser;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ks_relay::RelayState;

/// ks-relay: Live scoreboard session relay
#[derive(Parser, Debug)]
#[command(name = "ks-relay")]
#[command(about = "WebSocket relay between a kenscore operator and its displays")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7891")]
    bind: SocketAddr,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting ks-relay");
    info!("  Bind address: {}", args.bind);

    ks_relay::run(args.bind, RelayState::new()).await
}
