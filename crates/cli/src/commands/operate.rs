// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `kenscore operate`: the operator console.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::cli::OperateArgs;
use crate::config::Config;
use crate::console::{ConsoleCommand, HELP};
use crate::display::{render_line, render_status};
use crate::error::Result;
use crate::match_file::MatchFile;
use crate::store::FileStore;
use crate::sync::{
    Coordinator, CoordinatorHandle, SyncError, Transport, UdpBroadcastTransport, WebSocketConnector,
};

use super::config_path;

pub async fn run(args: OperateArgs) -> Result<()> {
    let mut config = Config::load(&config_path(args.config))?;
    if let Some(url) = args.relay {
        config.session.relay_url = Some(url);
        config.validate()?;
    }
    let init = MatchFile::load(&args.match_file)?.into_init()?;

    let store = FileStore::new(config.state_dir());
    let connector = Arc::new(WebSocketConnector::new(config.session.relay_url.clone()));
    let broadcast: Option<Box<dyn Transport>> = if config.broadcast.enabled && !args.no_broadcast
    {
        Some(Box::new(UdpBroadcastTransport::new(
            config.broadcast.target,
            config.broadcast.listen,
        )))
    } else {
        None
    };

    let (handle, task) =
        Coordinator::spawn(config.sync_settings(), connector, broadcast, Box::new(store));
    info!(match_id = %init.record.match_id, "match loaded");
    handle.initialize_match(init)?;

    let mut out = std::io::stdout();
    writeln!(out, "Type 'help' for commands.")?;
    if let Some(snapshot) = handle.snapshot().await? {
        writeln!(out, "{}", render_line(&snapshot))?;
    }

    let input = BufReader::new(tokio::io::stdin());
    let result = tokio::select! {
        result = console_loop(&handle, input, &mut out) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    };

    handle.shutdown().await?;
    if let Err(e) = task.await {
        warn!("coordinator task failed: {}", e);
    }
    result
}

/// Reads commands until `quit` or end of input.
///
/// Parse errors are printed and the console keeps going.
pub(crate) async fn console_loop<R>(
    handle: &CoordinatorHandle,
    input: R,
    out: &mut impl Write,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match ConsoleCommand::parse(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(command)) => execute(handle, command, out).await?,
            Err(e) => writeln!(out, "error: {}", e)?,
        }
    }
    Ok(())
}

/// Applies one command. Mutations print the resulting scoreboard line.
pub(crate) async fn execute(
    handle: &CoordinatorHandle,
    command: ConsoleCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        ConsoleCommand::Score(slot, value) => handle.set_score(slot, value)?,
        ConsoleCommand::Penalty(slot, value) => handle.set_penalty(slot, value)?,
        ConsoleCommand::Finish => handle.finish()?,
        ConsoleCommand::Reset => handle.reset_match()?,
        ConsoleCommand::Start => handle.start_timer()?,
        ConsoleCommand::Stop => handle.stop_timer()?,
        ConsoleCommand::Time(secs) => handle.set_time(secs)?,
        ConsoleCommand::Mode(mode) => handle.set_timer_mode(mode)?,
        ConsoleCommand::Visibility(visibility) => handle.set_visibility(visibility)?,
        ConsoleCommand::View(view_mode) => handle.set_view_mode(view_mode)?,
        ConsoleCommand::SyncStart => {
            let reply = handle.start_sync()?;
            writeln!(out, "connecting to relay...")?;
            tokio::spawn(async move {
                match reply.await {
                    Ok(Ok(session_id)) => info!(%session_id, "session connected"),
                    Ok(Err(SyncError::Cancelled)) => info!("session connect cancelled"),
                    Ok(Err(e)) => warn!("session connect failed: {}", e),
                    Err(_) => {}
                }
            });
        }
        ConsoleCommand::SyncStop => {
            handle.stop_sync()?;
            writeln!(out, "session stopped")?;
        }
        ConsoleCommand::Status => {
            let status = handle.status().await?;
            writeln!(out, "{}", render_status(&status))?;
        }
        ConsoleCommand::Snapshot => match handle.snapshot().await? {
            Some(snapshot) => writeln!(out, "{}", snapshot.to_json()?)?,
            None => writeln!(out, "no match")?,
        },
        ConsoleCommand::Help => writeln!(out, "{}", HELP)?,
        ConsoleCommand::Quit => {}
    }

    if command.is_mutation() {
        if let Some(snapshot) = handle.snapshot().await? {
            writeln!(out, "{}", render_line(&snapshot))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "operate_tests.rs"]
mod tests;
