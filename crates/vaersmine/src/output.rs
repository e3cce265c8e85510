//! Result files for frequent itemsets and association rules.
//!
//! CSV output uses the column names common to association mining tools
//! (`antecedent support`, `consequent support`, ...) with the items of each
//! side joined by [`ITEM_SEPARATOR`]. JSON output writes one array of
//! objects per file with items as string arrays.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::encode::{ItemCatalog, ItemId};
use crate::error::{Error, Result};
use crate::mining::{AssociationRule, FrequentItemset};

/// Separator between items in a CSV cell.
pub const ITEM_SEPARATOR: &str = " | ";

/// Format of the result files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Comma-separated values with a header row.
    #[default]
    Csv,
    /// A pretty-printed JSON array.
    Json,
}

#[derive(Debug, Serialize)]
struct ItemsetCsvRow {
    support: f64,
    count: u64,
    length: usize,
    itemsets: String,
}

#[derive(Debug, Serialize)]
struct ItemsetJsonRow<'a> {
    support: f64,
    count: u64,
    items: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct RuleCsvRow {
    antecedents: String,
    consequents: String,
    #[serde(rename = "antecedent support")]
    antecedent_support: f64,
    #[serde(rename = "consequent support")]
    consequent_support: f64,
    support: f64,
    confidence: f64,
    lift: f64,
    leverage: f64,
    conviction: String,
    jaccard: f64,
    certainty: f64,
    kulczynski: f64,
}

/// Infinite conviction becomes `null`.
#[derive(Debug, Serialize)]
struct RuleJsonRow<'a> {
    antecedents: Vec<&'a str>,
    consequents: Vec<&'a str>,
    antecedent_support: f64,
    consequent_support: f64,
    support: f64,
    confidence: f64,
    lift: f64,
    leverage: f64,
    conviction: Option<f64>,
    jaccard: f64,
    certainty: f64,
    kulczynski: f64,
}

fn join_items(catalog: &ItemCatalog, ids: &[ItemId]) -> String {
    catalog.names(ids).join(ITEM_SEPARATOR)
}

fn format_float(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        value.to_string()
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn write_csv<T: Serialize>(path: &Path, rows: impl Iterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write frequent itemsets to `path`.
///
/// # Errors
///
/// Returns an error if the file or its parent directory cannot be created,
/// or serialization fails.
pub fn write_itemsets(
    path: &Path,
    catalog: &ItemCatalog,
    itemsets: &[FrequentItemset],
    format: FileFormat,
) -> Result<()> {
    match format {
        FileFormat::Csv => write_csv(
            path,
            itemsets.iter().map(|i| ItemsetCsvRow {
                support: i.support,
                count: i.count,
                length: i.len(),
                itemsets: join_items(catalog, &i.items),
            }),
        )?,
        FileFormat::Json => {
            let rows: Vec<ItemsetJsonRow<'_>> = itemsets
                .iter()
                .map(|i| ItemsetJsonRow {
                    support: i.support,
                    count: i.count,
                    items: catalog.names(&i.items),
                })
                .collect();
            write_json(path, &rows)?;
        }
    }

    info!("Wrote {} itemsets to {}", itemsets.len(), path.display());
    Ok(())
}

/// Write association rules to `path`.
///
/// # Errors
///
/// Returns an error if the file or its parent directory cannot be created,
/// or serialization fails.
pub fn write_rules(
    path: &Path,
    catalog: &ItemCatalog,
    rules: &[AssociationRule],
    format: FileFormat,
) -> Result<()> {
    match format {
        FileFormat::Csv => write_csv(
            path,
            rules.iter().map(|r| RuleCsvRow {
                antecedents: join_items(catalog, &r.antecedents),
                consequents: join_items(catalog, &r.consequents),
                antecedent_support: r.antecedent_support,
                consequent_support: r.consequent_support,
                support: r.support,
                confidence: r.confidence,
                lift: r.lift,
                leverage: r.leverage,
                conviction: format_float(r.conviction),
                jaccard: r.jaccard,
                certainty: r.certainty,
                kulczynski: r.kulczynski,
            }),
        )?,
        FileFormat::Json => {
            let rows: Vec<RuleJsonRow<'_>> = rules
                .iter()
                .map(|r| RuleJsonRow {
                    antecedents: catalog.names(&r.antecedents),
                    consequents: catalog.names(&r.consequents),
                    antecedent_support: r.antecedent_support,
                    consequent_support: r.consequent_support,
                    support: r.support,
                    confidence: r.confidence,
                    lift: r.lift,
                    leverage: r.leverage,
                    conviction: r.conviction.is_finite().then_some(r.conviction),
                    jaccard: r.jaccard,
                    certainty: r.certainty,
                    kulczynski: r.kulczynski,
                })
                .collect();
            write_json(path, &rows)?;
        }
    }

    info!("Wrote {} rules to {}", rules.len(), path.display());
    Ok(())
}
