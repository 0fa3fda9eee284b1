// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fluxion-heater")]
#[command(author, version, about = "Nightly statistics importer for dual-circuit water heaters")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Import the most recent history window once and exit
    RunOnce,

    /// Import every night at the configured trigger time until Ctrl-C
    Daemon,

    /// Import older history windows, newest first, at a limited request rate
    Backfill {
        /// Number of history windows to fetch (defaults to backfill.windows)
        #[arg(short, long)]
        windows: Option<u32>,
    },

    /// Print the stored cumulative totals
    Totals,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_subcommands() {
        let cli = Cli::try_parse_from(["fluxion-heater", "run-once"]).unwrap();
        assert_eq!(cli.command, Command::RunOnce);
        assert_eq!(cli.config, PathBuf::from("config.toml"));

        let cli = Cli::try_parse_from([
            "fluxion-heater",
            "backfill",
            "--windows",
            "5",
            "--config",
            "/etc/heater.toml",
        ])
        .unwrap();
        assert_eq!(cli.command, Command::Backfill { windows: Some(5) });
        assert_eq!(cli.config, PathBuf::from("/etc/heater.toml"));

        assert!(Cli::try_parse_from(["fluxion-heater"]).is_err());
        assert!(Cli::try_parse_from(["fluxion-heater", "backfill", "--windows", "-1"]).is_err());
    }
}
