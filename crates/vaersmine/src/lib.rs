//! `vaersmine` - Frequent itemset and association rule mining over VAERS
//! adverse event reports
//!
//! This library reads a VAERS release (data, symptoms, and vaccine files),
//! joins it on `VAERS_ID`, turns every joined row into a basket of items,
//! and mines frequent itemsets with FP-growth and association rules from
//! them. Runs can be recorded in a `SQLite` history database.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod basket;
pub mod cli;
pub mod config;
pub mod encode;
pub mod error;
pub mod filter;
pub mod logging;
pub mod mining;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod vaers;

pub use basket::Basket;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use mining::{AssociationRule, FrequentItemset, Metric, MiningParams};
pub use storage::{Storage, StorageStats};
