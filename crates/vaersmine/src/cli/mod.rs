//! Command-line interface for vaersmine.
//!
//! This module provides the CLI structure for the `vaersmine` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BasketsCommand, ConfigCommand, FormatArg, InputArgs, MetricArg, MineCommand, RunsCommand,
    StatusCommand,
};

/// vaersmine - Association rule mining over VAERS reports
///
/// Joins the data, symptoms, and vaccine files of a VAERS release, turns
/// every report into a basket of items (demographics, outcomes, vaccine,
/// symptoms), and mines frequent itemsets and association rules with
/// FP-growth.
#[derive(Debug, Parser)]
#[command(name = "vaersmine")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mine itemsets and rules and write the result files
    Mine(MineCommand),

    /// Print the baskets built from a release
    Baskets(BasketsCommand),

    /// Inspect the run history
    #[command(subcommand)]
    Runs(RunsCommand),

    /// Show run history statistics
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
