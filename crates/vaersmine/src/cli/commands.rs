//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands and how their
//! flags override the loaded configuration.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::config::Config;
use crate::mining::Metric;
use crate::output::FileFormat;

/// Flags selecting the input files.
#[derive(Debug, Clone, Default, Args)]
pub struct InputArgs {
    /// Directory holding the release files
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Release year (file name prefix)
    #[arg(short, long)]
    pub year: Option<u16>,

    /// Path to the VAERSDATA file
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Path to the VAERSSYMPTOMS file
    #[arg(long, value_name = "FILE")]
    pub symptoms: Option<PathBuf>,

    /// Path to the VAERSVAX file
    #[arg(long, value_name = "FILE")]
    pub vax: Option<PathBuf>,
}

impl InputArgs {
    /// Overwrite the `[input]` section with the flags that were given.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.dir {
            config.input.directory.clone_from(dir);
        }
        if let Some(year) = self.year {
            config.input.year = year;
        }
        if self.data.is_some() {
            config.input.data_path.clone_from(&self.data);
        }
        if self.symptoms.is_some() {
            config.input.symptoms_path.clone_from(&self.symptoms);
        }
        if self.vax.is_some() {
            config.input.vax_path.clone_from(&self.vax);
        }
    }
}

/// Mine command arguments.
#[derive(Debug, Clone, Default, Args)]
pub struct MineCommand {
    /// Input file selection
    #[command(flatten)]
    pub input: InputArgs,

    /// Minimum itemset support, in (0, 1]
    #[arg(short = 's', long)]
    pub min_support: Option<f64>,

    /// Longest itemset to report (0 for unlimited)
    #[arg(short = 'l', long)]
    pub max_len: Option<usize>,

    /// Metric to filter rules on
    #[arg(short, long, value_enum)]
    pub metric: Option<MetricArg>,

    /// Minimum metric value for a rule
    #[arg(short = 't', long)]
    pub min_threshold: Option<f64>,

    /// Directory for the result files
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Format of the result files
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Don't record the run in the history database
    #[arg(long)]
    pub no_record: bool,

    /// Print the run summary as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl MineCommand {
    /// Overwrite configuration values with the flags that were given.
    pub fn apply(&self, config: &mut Config) {
        self.input.apply(config);
        if let Some(min_support) = self.min_support {
            config.mining.min_support = min_support;
        }
        if let Some(max_len) = self.max_len {
            config.mining.max_len = max_len;
        }
        if let Some(metric) = self.metric {
            config.mining.metric = metric.into();
        }
        if let Some(min_threshold) = self.min_threshold {
            config.mining.min_threshold = min_threshold;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory.clone_from(dir);
        }
        if let Some(format) = self.format {
            config.output.format = format.into();
        }
        if self.no_record {
            config.storage.record_runs = false;
        }
    }
}

/// Baskets command arguments.
#[derive(Debug, Clone, Args)]
pub struct BasketsCommand {
    /// Input file selection
    #[command(flatten)]
    pub input: InputArgs,

    /// Number of baskets to print
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,

    /// Skip the item filter
    #[arg(long)]
    pub no_filter: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Run history commands.
#[derive(Debug, Subcommand)]
pub enum RunsCommand {
    /// List recorded runs, newest first
    List {
        /// Maximum number of runs
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one run with its top itemsets and rules
    Show {
        /// Run id
        id: i64,

        /// Number of itemsets and rules to print
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete a run
    Delete {
        /// Run id
        id: i64,
    },

    /// Delete all but the most recent runs
    Prune {
        /// Runs to keep (defaults to storage.max_runs)
        #[arg(short, long)]
        keep: Option<usize>,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Rule metric argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    /// Joint support
    Support,
    /// Conditional probability of the consequent
    Confidence,
    /// Confidence over consequent support
    Lift,
    /// Observed minus expected support
    Leverage,
    /// Dependence on the antecedent
    Conviction,
    /// Joint over union support
    Jaccard,
    /// Normalised confidence gain
    Certainty,
    /// Mean confidence of both directions
    Kulczynski,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Support => Self::Support,
            MetricArg::Confidence => Self::Confidence,
            MetricArg::Lift => Self::Lift,
            MetricArg::Leverage => Self::Leverage,
            MetricArg::Conviction => Self::Conviction,
            MetricArg::Jaccard => Self::Jaccard,
            MetricArg::Certainty => Self::Certainty,
            MetricArg::Kulczynski => Self::Kulczynski,
        }
    }
}

/// Result file format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Comma-separated values
    Csv,
    /// JSON arrays
    Json,
}

impl From<FormatArg> for FileFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => Self::Csv,
            FormatArg::Json => Self::Json,
        }
    }
}
