//! `SQLite` schema definitions for the run history database.
//!
//! Item lists are stored as JSON arrays of item names so that stored runs
//! stay readable without the vocabulary they were mined with.

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the runs table.
pub const CREATE_RUNS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    data_path TEXT NOT NULL,
    symptoms_path TEXT NOT NULL,
    vax_path TEXT NOT NULL,
    min_support REAL NOT NULL,
    max_len INTEGER,
    metric TEXT NOT NULL,
    min_threshold REAL NOT NULL,
    reports INTEGER NOT NULL,
    symptom_rows INTEGER NOT NULL,
    vax_rows INTEGER NOT NULL,
    merged_rows INTEGER NOT NULL,
    baskets INTEGER NOT NULL,
    distinct_items INTEGER NOT NULL,
    itemset_count INTEGER NOT NULL,
    rule_count INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the frequent itemsets table.
pub const CREATE_RUN_ITEMSETS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS run_itemsets (
    run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    rank INTEGER NOT NULL,
    items TEXT NOT NULL,
    length INTEGER NOT NULL,
    count INTEGER NOT NULL,
    support REAL NOT NULL,
    PRIMARY KEY (run_id, rank)
)
";

/// SQL statement to create the association rules table.
///
/// `conviction` is NULL where it is infinite.
pub const CREATE_RUN_RULES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS run_rules (
    run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    rank INTEGER NOT NULL,
    antecedents TEXT NOT NULL,
    consequents TEXT NOT NULL,
    antecedent_support REAL NOT NULL,
    consequent_support REAL NOT NULL,
    support REAL NOT NULL,
    confidence REAL NOT NULL,
    lift REAL NOT NULL,
    leverage REAL NOT NULL,
    conviction REAL,
    jaccard REAL NOT NULL,
    certainty REAL NOT NULL,
    kulczynski REAL NOT NULL,
    PRIMARY KEY (run_id, rank)
)
";

/// SQL statement to create an index on `fingerprint` for deduplication.
pub const CREATE_FINGERPRINT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_runs_fingerprint ON runs(fingerprint)
";

/// SQL statement to create an index on `started_at` for listing.
pub const CREATE_STARTED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_runs_started ON runs(started_at DESC)
";

/// Statements of schema version 1, in order.
pub const V1_STATEMENTS: &[&str] = &[
    CREATE_RUNS_TABLE,
    CREATE_RUN_ITEMSETS_TABLE,
    CREATE_RUN_RULES_TABLE,
    CREATE_FINGERPRINT_INDEX,
    CREATE_STARTED_INDEX,
];
