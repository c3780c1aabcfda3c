// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

const QUICKSTART_HELP: &str = "\
Get started:
  ks-relay --bind 0.0.0.0:7891                     Start the relay (optional)
  kenscore operate --match final.json              Score a match
  kenscore watch --udp 127.0.0.1:7892 \\
                 --control 127.0.0.1:7893          Follow it over UDP
  kenscore watch --relay ws://127.0.0.1:7891       Follow it through the relay";

#[derive(Parser)]
#[command(name = "kenscore")]
#[command(version)]
#[command(about = "Live kendo bout scoring with real-time display sync")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score a match from the operator console
    #[command(after_help = "Type 'help' at the console prompt for the command list.")]
    Operate(OperateArgs),

    /// Follow a match as a passive display
    Watch(WatchArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug, Clone)]
pub struct OperateArgs {
    /// Match file (JSON) with the match record and both rosters
    #[arg(long = "match", short, value_name = "FILE")]
    pub match_file: PathBuf,

    /// Config file [default: <config dir>/kenscore/kenscore.toml]
    #[arg(long, short, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Relay URL, overriding the config file
    #[arg(long, value_name = "URL")]
    pub relay: Option<String>,

    /// Do not mirror snapshots over UDP
    #[arg(long)]
    pub no_broadcast: bool,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("source").required(true).args(["relay", "udp"])))]
pub struct WatchArgs {
    /// Join the session on this relay
    #[arg(long, value_name = "URL")]
    pub relay: Option<String>,

    /// Receive snapshot datagrams on this address
    #[arg(long, value_name = "ADDR", requires = "control")]
    pub udp: Option<SocketAddr>,

    /// Operator address that answers snapshot requests
    #[arg(long, value_name = "ADDR", requires = "udp")]
    pub control: Option<SocketAddr>,

    /// Print raw snapshot JSON instead of the scoreboard line
    #[arg(long)]
    pub json: bool,

    /// Exit after the first snapshot
    #[arg(long)]
    pub once: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show {
        #[arg(long, short, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Write a configuration file with default values
    Init {
        #[arg(long, short, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
