//! Storage layer for vaersmine.
//!
//! This module provides `SQLite`-based persistent storage for the history of
//! mining runs: the parameters and counts of each run together with its
//! itemsets and rules, deduplicated by input fingerprint.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::encode::{ItemCatalog, ItemId};
use crate::error::{Error, Result};
use crate::mining::{Metric, MiningParams};
use crate::pipeline::{MiningOutcome, RunSummary};
use crate::vaers::InputPaths;

const RUN_COLUMNS: &str = r"
    id, started_at, finished_at, fingerprint, data_path, symptoms_path, vax_path,
    min_support, max_len, metric, min_threshold, reports, symptom_rows, vax_rows,
    merged_rows, baskets, distinct_items, itemset_count, rule_count
";

/// Storage engine for the run history.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

/// A run as recorded in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Database id.
    pub id: i64,
    /// What the run did.
    #[serde(flatten)]
    pub summary: RunSummary,
}

/// A stored frequent itemset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItemset {
    /// Item names.
    pub items: Vec<String>,
    /// Transactions containing every item.
    pub count: u64,
    /// Fraction of transactions containing every item.
    pub support: f64,
}

/// A stored association rule. Infinite conviction round-trips as infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRule {
    /// Left-hand item names.
    pub antecedents: Vec<String>,
    /// Right-hand item names.
    pub consequents: Vec<String>,
    /// Support of the antecedent alone.
    pub antecedent_support: f64,
    /// Support of the consequent alone.
    pub consequent_support: f64,
    /// Support of both sides.
    pub support: f64,
    /// See [`Metric::Confidence`].
    pub confidence: f64,
    /// See [`Metric::Lift`].
    pub lift: f64,
    /// See [`Metric::Leverage`].
    pub leverage: f64,
    /// See [`Metric::Conviction`].
    pub conviction: f64,
    /// See [`Metric::Jaccard`].
    pub jaccard: f64,
    /// See [`Metric::Certainty`].
    pub certainty: f64,
    /// See [`Metric::Kulczynski`].
    pub kulczynski: f64,
}

impl StoredRule {
    /// Value of one metric.
    #[must_use]
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Support => self.support,
            Metric::Confidence => self.confidence,
            Metric::Lift => self.lift,
            Metric::Leverage => self.leverage,
            Metric::Conviction => self.conviction,
            Metric::Jaccard => self.jaccard,
            Metric::Certainty => self.certainty,
            Metric::Kulczynski => self.kulczynski,
        }
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of recorded runs.
    pub total_runs: i64,
    /// Itemsets across all runs.
    pub total_itemsets: i64,
    /// Rules across all runs.
    pub total_rules: i64,
    /// Start time of the oldest run.
    pub oldest_run: Option<DateTime<Utc>>,
    /// Start time of the newest run.
    pub newest_run: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

fn to_i64<T: TryInto<i64>>(n: T) -> i64 {
    n.try_into().unwrap_or(i64::MAX)
}

fn to_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or_default()
}

fn item_json(catalog: &ItemCatalog, ids: &[ItemId]) -> Result<String> {
    Ok(serde_json::to_string(&catalog.names(ids))?)
}

fn parse_items(column: usize, json: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_time(column: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

impl Storage {
    /// Open or create a run database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist
    /// and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a run with its itemsets and rules.
    ///
    /// Returns the assigned id, or `None` if a run with the same fingerprint
    /// is already recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_run(&self, outcome: &MiningOutcome) -> Result<Option<i64>> {
        let summary = &outcome.summary;
        if let Some(existing) = self.find_by_fingerprint(&summary.fingerprint)? {
            debug!(
                "Run with fingerprint {} already recorded as {}",
                &summary.fingerprint[..summary.fingerprint.len().min(16)],
                existing
            );
            return Ok(None);
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r"
            INSERT INTO runs (
                started_at, finished_at, fingerprint, data_path, symptoms_path, vax_path,
                min_support, max_len, metric, min_threshold, reports, symptom_rows,
                vax_rows, merged_rows, baskets, distinct_items, itemset_count, rule_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            ",
            params![
                summary.started_at.to_rfc3339(),
                summary.finished_at.to_rfc3339(),
                summary.fingerprint,
                summary.inputs.data.to_string_lossy(),
                summary.inputs.symptoms.to_string_lossy(),
                summary.inputs.vax.to_string_lossy(),
                summary.params.min_support,
                summary.params.max_len.map(to_i64),
                summary.params.metric.as_str(),
                summary.params.min_threshold,
                to_i64(summary.reports),
                to_i64(summary.symptom_rows),
                to_i64(summary.vax_rows),
                to_i64(summary.merged_rows),
                to_i64(summary.baskets),
                to_i64(summary.distinct_items),
                to_i64(summary.itemsets),
                to_i64(summary.rules),
            ],
        )?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r"
                INSERT INTO run_itemsets (run_id, rank, items, length, count, support)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )?;
            for (rank, itemset) in outcome.itemsets.iter().enumerate() {
                stmt.execute(params![
                    id,
                    to_i64(rank),
                    item_json(&outcome.catalog, &itemset.items)?,
                    to_i64(itemset.len()),
                    to_i64(itemset.count),
                    itemset.support,
                ])?;
            }

            let mut stmt = tx.prepare(
                r"
                INSERT INTO run_rules (
                    run_id, rank, antecedents, consequents, antecedent_support,
                    consequent_support, support, confidence, lift, leverage, conviction,
                    jaccard, certainty, kulczynski
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ",
            )?;
            for (rank, rule) in outcome.rules.iter().enumerate() {
                stmt.execute(params![
                    id,
                    to_i64(rank),
                    item_json(&outcome.catalog, &rule.antecedents)?,
                    item_json(&outcome.catalog, &rule.consequents)?,
                    rule.antecedent_support,
                    rule.consequent_support,
                    rule.support,
                    rule.confidence,
                    rule.lift,
                    rule.leverage,
                    rule.conviction.is_finite().then_some(rule.conviction),
                    rule.jaccard,
                    rule.certainty,
                    rule.kulczynski,
                ])?;
            }
        }
        tx.commit()?;

        info!(
            "Recorded run {} ({} itemsets, {} rules)",
            id,
            outcome.itemsets.len(),
            outcome.rules.len()
        );
        Ok(Some(id))
    }

    /// Id of the run with the given fingerprint, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM runs WHERE fingerprint = ?1 LIMIT 1",
                [fingerprint],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Get a run by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_run(&self, id: i64) -> Result<Option<RunRecord>> {
        let sql = format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1");
        let run = self
            .conn
            .query_row(&sql, [id], Self::row_to_run)
            .optional()?;
        Ok(run)
    }

    /// The most recent runs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let sql =
            format!("SELECT {RUN_COLUMNS} FROM runs ORDER BY started_at DESC, id DESC LIMIT ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map([to_i64(limit)], Self::row_to_run)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// Itemsets of a run in their original order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunNotFound`] if there is no such run.
    pub fn run_itemsets(&self, run_id: i64, limit: usize) -> Result<Vec<StoredItemset>> {
        self.ensure_run(run_id)?;
        let mut stmt = self.conn.prepare(
            r"
            SELECT items, count, support FROM run_itemsets
            WHERE run_id = ?1 ORDER BY rank LIMIT ?2
            ",
        )?;
        let itemsets = stmt
            .query_map(params![run_id, to_i64(limit)], |row| {
                let items: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok(StoredItemset {
                    items: parse_items(0, &items)?,
                    count: u64::try_from(count).unwrap_or_default(),
                    support: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(itemsets)
    }

    /// Rules of a run in their original order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunNotFound`] if there is no such run.
    pub fn run_rules(&self, run_id: i64, limit: usize) -> Result<Vec<StoredRule>> {
        self.ensure_run(run_id)?;
        let mut stmt = self.conn.prepare(
            r"
            SELECT antecedents, consequents, antecedent_support, consequent_support,
                   support, confidence, lift, leverage, conviction, jaccard, certainty,
                   kulczynski
            FROM run_rules WHERE run_id = ?1 ORDER BY rank LIMIT ?2
            ",
        )?;
        let rules = stmt
            .query_map(params![run_id, to_i64(limit)], |row| {
                let antecedents: String = row.get(0)?;
                let consequents: String = row.get(1)?;
                let conviction: Option<f64> = row.get(8)?;
                Ok(StoredRule {
                    antecedents: parse_items(0, &antecedents)?,
                    consequents: parse_items(1, &consequents)?,
                    antecedent_support: row.get(2)?,
                    consequent_support: row.get(3)?,
                    support: row.get(4)?,
                    confidence: row.get(5)?,
                    lift: row.get(6)?,
                    leverage: row.get(7)?,
                    conviction: conviction.unwrap_or(f64::INFINITY),
                    jaccard: row.get(9)?,
                    certainty: row.get(10)?,
                    kulczynski: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    fn ensure_run(&self, run_id: i64) -> Result<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM runs WHERE id = ?1)",
            [run_id],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(Error::RunNotFound(run_id))
        }
    }

    /// Count recorded runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a run and its itemsets and rules.
    ///
    /// Returns `true` if a run was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_run(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM runs WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Keep only the most recent `keep_count` runs.
    ///
    /// Returns the number of runs deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_keep_recent(&self, keep_count: usize) -> Result<usize> {
        let affected = self.conn.execute(
            r"
            DELETE FROM runs WHERE id NOT IN (
                SELECT id FROM runs ORDER BY started_at DESC, id DESC LIMIT ?1
            )
            ",
            [to_i64(keep_count)],
        )?;

        if affected > 0 {
            info!("Pruned {} runs to keep {} recent", affected, keep_count);
        }
        Ok(affected)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_runs = self.count()?;
        let total_itemsets: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM run_itemsets", [], |row| row.get(0))?;
        let total_rules: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM run_rules", [], |row| row.get(0))?;

        let (oldest, newest): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(started_at), MAX(started_at) FROM runs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let parse = |s: Option<String>| {
            s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_runs,
            total_itemsets,
            total_rules,
            oldest_run: parse(oldest),
            newest_run: parse(newest),
            db_size_bytes,
        })
    }

    /// Convert a row selected with `RUN_COLUMNS` to a record.
    fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<RunRecord> {
        let started_at: String = row.get(1)?;
        let finished_at: String = row.get(2)?;
        let data: String = row.get(4)?;
        let symptoms: String = row.get(5)?;
        let vax: String = row.get(6)?;
        let max_len: Option<i64> = row.get(8)?;
        let metric_str: String = row.get(9)?;

        let metric = metric_str.parse::<Metric>().unwrap_or_else(|_| {
            warn!("Unknown metric: {}, defaulting to confidence", metric_str);
            Metric::Confidence
        });

        Ok(RunRecord {
            id: row.get(0)?,
            summary: RunSummary {
                started_at: parse_time(1, &started_at)?,
                finished_at: parse_time(2, &finished_at)?,
                fingerprint: row.get(3)?,
                inputs: InputPaths {
                    data: PathBuf::from(data),
                    symptoms: PathBuf::from(symptoms),
                    vax: PathBuf::from(vax),
                },
                params: MiningParams {
                    min_support: row.get(7)?,
                    max_len: max_len.map(to_count),
                    metric,
                    min_threshold: row.get(10)?,
                },
                reports: to_count(row.get(11)?),
                symptom_rows: to_count(row.get(12)?),
                vax_rows: to_count(row.get(13)?),
                merged_rows: to_count(row.get(14)?),
                baskets: to_count(row.get(15)?),
                distinct_items: to_count(row.get(16)?),
                itemsets: to_count(row.get(17)?),
                rules: to_count(row.get(18)?),
            },
        })
    }
}
