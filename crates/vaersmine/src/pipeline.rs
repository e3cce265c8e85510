//! End-to-end mining run.
//!
//! Reads a release, joins it, derives baskets, encodes them, and mines
//! itemsets and rules. Every stage logs its row counts at `info`.

use std::fs::File;
use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::basket::{build_baskets, Basket};
use crate::encode::{ItemCatalog, Transactions};
use crate::error::Result;
use crate::filter::ItemFilter;
use crate::mining::{mine, AssociationRule, FrequentItemset, MiningParams};
use crate::vaers::{merge, read_dataset, InputPaths};

/// Baskets of a release together with the row counts that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasketLoad {
    /// Rows in the data file.
    pub reports: usize,
    /// Rows in the symptoms file.
    pub symptom_rows: usize,
    /// Rows in the vax file.
    pub vax_rows: usize,
    /// Rows after the join.
    pub merged_rows: usize,
    /// One basket per joined row.
    pub baskets: Vec<Basket>,
}

/// Counts and metadata of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When mining finished.
    pub finished_at: DateTime<Utc>,
    /// Identifies runs over the same inputs with the same parameters and
    /// item exclusions.
    pub fingerprint: String,
    /// Files the run read.
    pub inputs: InputPaths,
    /// Parameters the run used.
    pub params: MiningParams,
    /// Rows in the data file.
    pub reports: usize,
    /// Rows in the symptoms file.
    pub symptom_rows: usize,
    /// Rows in the vax file.
    pub vax_rows: usize,
    /// Rows after the join.
    pub merged_rows: usize,
    /// Baskets mined.
    pub baskets: usize,
    /// Distinct items across all baskets.
    pub distinct_items: usize,
    /// Frequent itemsets found.
    pub itemsets: usize,
    /// Rules kept.
    pub rules: usize,
}

impl RunSummary {
    /// Wall time of the run in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MiningOutcome {
    /// Counts and metadata.
    pub summary: RunSummary,
    /// Vocabulary the item ids refer to.
    pub catalog: ItemCatalog,
    /// Frequent itemsets, highest support first.
    pub itemsets: Vec<FrequentItemset>,
    /// Rules passing the threshold.
    pub rules: Vec<AssociationRule>,
}

/// BLAKE3 digest over the bytes of the three input files, the mining
/// parameters, and the item exclusions, as lowercase hex.
///
/// # Errors
///
/// Returns an error if an input file cannot be read.
pub fn fingerprint_inputs(
    paths: &InputPaths,
    params: &MiningParams,
    filter: &ItemFilter,
) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    for path in paths.all() {
        let mut file = File::open(path)?;
        let len = io::copy(&mut file, &mut hasher)?;
        hasher.update(&len.to_le_bytes());
    }
    hasher.update(&serde_json::to_vec(params)?);
    filter.hash_into(&mut hasher);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Read, join, and turn a release into baskets.
///
/// # Errors
///
/// Returns an error if any input file cannot be read or parsed.
pub fn load_baskets(paths: &InputPaths, filter: &ItemFilter) -> Result<BasketLoad> {
    let dataset = read_dataset(paths)?;
    info!(
        "Loaded {} reports, {} symptom rows, {} vax rows",
        dataset.reports.len(),
        dataset.symptoms.len(),
        dataset.vaccines.len()
    );

    let merged = merge(&dataset);
    info!("Joined into {} rows", merged.len());

    let baskets = build_baskets(&merged, filter);
    info!("Built {} baskets", baskets.len());

    Ok(BasketLoad {
        reports: dataset.reports.len(),
        symptom_rows: dataset.symptoms.len(),
        vax_rows: dataset.vaccines.len(),
        merged_rows: merged.len(),
        baskets,
    })
}

/// Run the whole pipeline over `paths`.
///
/// # Errors
///
/// Returns an error if `params` is invalid or an input file cannot be read
/// or parsed.
pub fn run(
    paths: &InputPaths,
    params: &MiningParams,
    filter: &ItemFilter,
) -> Result<MiningOutcome> {
    params.validate()?;
    let started_at = Utc::now();
    let fingerprint = fingerprint_inputs(paths, params, filter)?;

    let load = load_baskets(paths, filter)?;

    let transactions = Transactions::from_baskets(&load.baskets);
    info!(
        "Encoded {} transactions over {} distinct items",
        transactions.len(),
        transactions.catalog().len()
    );

    let result = mine(&transactions, params)?;
    info!(
        "Found {} frequent itemsets and {} rules ({} >= {})",
        result.itemsets.len(),
        result.rules.len(),
        params.metric,
        params.min_threshold
    );

    let summary = RunSummary {
        started_at,
        finished_at: Utc::now(),
        fingerprint,
        inputs: paths.clone(),
        params: *params,
        reports: load.reports,
        symptom_rows: load.symptom_rows,
        vax_rows: load.vax_rows,
        merged_rows: load.merged_rows,
        baskets: load.baskets.len(),
        distinct_items: transactions.catalog().len(),
        itemsets: result.itemsets.len(),
        rules: result.rules.len(),
    };

    Ok(MiningOutcome {
        summary,
        catalog: transactions.catalog().clone(),
        itemsets: result.itemsets,
        rules: result.rules,
    })
}
