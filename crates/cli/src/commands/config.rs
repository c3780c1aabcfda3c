// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;
use std::path::Path;

use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::error::{Error, Result};

use super::config_path;

/// Execute a config subcommand.
pub fn run(cmd: ConfigCommand) -> Result<()> {
    let mut out = std::io::stdout();
    match cmd {
        ConfigCommand::Show { config } => show(&config_path(config), &mut out),
        ConfigCommand::Init { config, force } => init(&config_path(config), force, &mut out),
    }
}

/// Prints the effective configuration, defaults filled in.
pub(crate) fn show(path: &Path, out: &mut impl Write) -> Result<()> {
    let config = Config::load(path)?;
    let content = toml::to_string_pretty(&config)
        .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
    writeln!(out, "# {}", path.display())?;
    write!(out, "{}", content)?;
    Ok(())
}

/// Writes a default configuration file.
pub(crate) fn init(path: &Path, force: bool, out: &mut impl Write) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists\n  hint: use --force to overwrite",
            path.display()
        )));
    }
    Config::default().save(path)?;
    writeln!(out, "Wrote {}", path.display())?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
