//! Command-line argument definitions for the Tessera CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Global options select the configuration file and logging
//! verbosity; the [`Command`] picks what to do.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Tessera tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate macro text against a fixture store
    Eval {
        /// Path to the fixture store (TOML); an empty store when omitted
        #[arg(short, long)]
        store: Option<String>,

        /// Data set list of the data set to evaluate for
        #[arg(long, requires = "dataset")]
        list: Option<String>,

        /// Data set that `DS` and `ATTR` references are relative to
        #[arg(long, requires = "list")]
        dataset: Option<String>,

        /// The macro text
        text: String,
    },

    /// Escape quotes inside date macros
    Escape {
        /// The text to escape
        text: String,
    },

    /// Migrate the formulas of a workbook (TOML) to macro text
    Migrate {
        /// Path to the workbook
        #[arg(short, long)]
        input: String,

        /// Where to write the fallout report (TOML)
        #[arg(short, long)]
        report: Option<String>,
    },

    /// Parse macro text and report malformed or unknown calls
    Check {
        /// The macro text
        text: String,
    },
}
