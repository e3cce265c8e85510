//! Item exclusion for baskets.
//!
//! Some items carry no analytical signal (for example the MedDRA term
//! "No adverse event") and only inflate the itemset count. The filter drops
//! such items before encoding, either by exact name (case-insensitive, with
//! Unicode lowercasing so Latin-1 terms match) or by regex. The default
//! configuration excludes nothing.

use regex::Regex;
use tracing::{trace, warn};

use crate::basket::Basket;
use crate::config::FilterConfig;

/// Decides which basket items survive into the transactions.
#[derive(Debug, Clone)]
pub struct ItemFilter {
    enabled: bool,
    /// Lowercased.
    excluded_items: Vec<String>,
    patterns: Vec<Regex>,
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

impl ItemFilter {
    /// A filter that keeps every item.
    #[must_use]
    pub fn pass_all() -> Self {
        Self {
            enabled: false,
            excluded_items: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Build a filter from configuration.
    ///
    /// Patterns that fail to compile are logged and skipped.
    #[must_use]
    pub fn from_config(config: &FilterConfig) -> Self {
        let patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "Invalid exclusion pattern");
                    None
                }
            })
            .collect();

        Self {
            enabled: config.enabled,
            excluded_items: config
                .excluded_items
                .iter()
                .map(|item| item.to_lowercase())
                .collect(),
            patterns,
        }
    }

    /// Check if filtering is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `item` is kept.
    #[must_use]
    pub fn allows(&self, item: &str) -> bool {
        if !self.enabled {
            return true;
        }

        if !self.excluded_items.is_empty()
            && self.excluded_items.contains(&item.to_lowercase())
        {
            trace!(item, "Item excluded by name");
            return false;
        }

        if let Some(pattern) = self.patterns.iter().find(|p| p.is_match(item)) {
            trace!(item, pattern = %pattern, "Item excluded by pattern");
            return false;
        }

        true
    }

    /// Whether the filter can remove anything at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && !(self.excluded_items.is_empty() && self.patterns.is_empty())
    }

    /// Feed the exclusions this filter applies into `hasher`.
    ///
    /// Filters that remove nothing hash the same as [`ItemFilter::pass_all`].
    pub fn hash_into(&self, hasher: &mut blake3::Hasher) {
        if !self.is_active() {
            hasher.update(&[0]);
            return;
        }
        hasher.update(&[1]);
        let patterns = self.patterns.iter().map(Regex::as_str);
        for (tag, value) in self
            .excluded_items
            .iter()
            .map(|item| (b'i', item.as_str()))
            .chain(patterns.map(|p| (b'p', p)))
        {
            hasher.update(&[tag]);
            hasher.update(&(value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
    }

    /// Remove disallowed items from `basket`, returning how many were removed.
    pub fn apply(&self, basket: &mut Basket) -> usize {
        if !self.enabled {
            return 0;
        }
        let before = basket.len();
        basket.retain(|item| self.allows(item));
        before - basket.len()
    }
}
