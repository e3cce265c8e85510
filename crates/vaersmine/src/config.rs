//! Configuration management for vaersmine.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mining::{Metric, MiningParams};
use crate::output::FileFormat;
use crate::vaers::InputPaths;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "vaersmine";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "runs.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `VAERSMINE_`, sections separated
///    by `__`, e.g. `VAERSMINE_MINING__MIN_SUPPORT=0.01`)
/// 2. TOML config file at `~/.config/vaersmine/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input file configuration.
    pub input: InputConfig,
    /// Mining configuration.
    pub mining: MiningConfig,
    /// Output file configuration.
    pub output: OutputConfig,
    /// Run history configuration.
    pub storage: StorageConfig,
    /// Item filter configuration.
    pub filter: FilterConfig,
}

/// Where the VAERS files are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory holding `<year>VAERS*.csv`.
    pub directory: PathBuf,
    /// Release year, the file name prefix.
    pub year: u16,
    /// Explicit `VAERSDATA` path, overriding directory and year.
    pub data_path: Option<PathBuf>,
    /// Explicit `VAERSSYMPTOMS` path.
    pub symptoms_path: Option<PathBuf>,
    /// Explicit `VAERSVAX` path.
    pub vax_path: Option<PathBuf>,
}

/// Mining parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Minimum itemset support, in (0, 1].
    pub min_support: f64,
    /// Longest itemset to report.
    /// Set to 0 for unlimited.
    pub max_len: usize,
    /// Metric rules are filtered on.
    pub metric: Metric,
    /// Minimum metric value for a rule.
    pub min_threshold: f64,
}

/// Result file configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the result files are written to.
    pub directory: PathBuf,
    /// File name for frequent itemsets.
    pub itemsets_file: String,
    /// File name for association rules.
    pub rules_file: String,
    /// Format of both files.
    pub format: FileFormat,
}

/// Run history configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/vaersmine/runs.db`
    pub database_path: Option<PathBuf>,
    /// Record every `mine` run in the database.
    pub record_runs: bool,
    /// Maximum number of runs to retain.
    /// Set to 0 for unlimited.
    pub max_runs: usize,
}

/// Item exclusion configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Apply the filter.
    pub enabled: bool,
    /// Regex patterns; matching items are dropped.
    pub exclude_patterns: Vec<String>,
    /// Item names dropped regardless of case.
    pub excluded_items: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
            year: 2021,
            data_path: None,
            symptoms_path: None,
            vax_path: None,
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        let params = MiningParams::default();
        Self {
            min_support: params.min_support,
            max_len: 0,
            metric: params.metric,
            min_threshold: params.min_threshold,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            itemsets_file: "freq_itemsets.csv".to_string(),
            rules_file: "assoc_rules.csv".to_string(),
            format: FileFormat::Csv,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            record_runs: true,
            max_runs: 50,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude_patterns: Vec::new(),
            excluded_items: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("VAERSMINE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.input.year == 0 {
            return Err(Error::ConfigValidation {
                message: "input.year must be greater than 0".to_string(),
            });
        }

        self.mining_params()
            .validate()
            .map_err(|e| Error::ConfigValidation {
                message: format!("mining: {e}"),
            })?;

        if self.output.itemsets_file.trim().is_empty() || self.output.rules_file.trim().is_empty()
        {
            return Err(Error::ConfigValidation {
                message: "output file names must not be empty".to_string(),
            });
        }

        if self.output.itemsets_file == self.output.rules_file {
            return Err(Error::ConfigValidation {
                message: format!(
                    "itemsets_file and rules_file are both '{}'",
                    self.output.itemsets_file
                ),
            });
        }

        for pattern in &self.filter.exclude_patterns {
            if regex::Regex::new(pattern).is_err() {
                return Err(Error::ConfigValidation {
                    message: format!("invalid regex pattern: {pattern}"),
                });
            }
        }

        Ok(())
    }

    /// Resolve the three input paths. Explicit paths win over directory and
    /// year.
    #[must_use]
    pub fn input_paths(&self) -> InputPaths {
        let defaults = InputPaths::for_year(&self.input.directory, self.input.year);
        InputPaths {
            data: self.input.data_path.clone().unwrap_or(defaults.data),
            symptoms: self
                .input
                .symptoms_path
                .clone()
                .unwrap_or(defaults.symptoms),
            vax: self.input.vax_path.clone().unwrap_or(defaults.vax),
        }
    }

    /// Mining parameters; a `max_len` of 0 means unlimited.
    #[must_use]
    pub fn mining_params(&self) -> MiningParams {
        MiningParams {
            min_support: self.mining.min_support,
            max_len: (self.mining.max_len > 0).then_some(self.mining.max_len),
            metric: self.mining.metric,
            min_threshold: self.mining.min_threshold,
        }
    }

    /// Path of the itemsets result file.
    #[must_use]
    pub fn itemsets_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.itemsets_file)
    }

    /// Path of the rules result file.
    #[must_use]
    pub fn rules_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.rules_file)
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}
