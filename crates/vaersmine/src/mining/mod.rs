//! Frequent itemset mining and association rule generation.
//!
//! - [`fpgrowth`] finds every itemset whose support reaches a minimum.
//! - [`association_rules`] splits each frequent itemset into antecedent and
//!   consequent and keeps the rules that score well on a chosen [`Metric`].
//!
//! # Example
//!
//! ```
//! use vaersmine::basket::Basket;
//! use vaersmine::encode::Transactions;
//! use vaersmine::mining::{association_rules, fpgrowth, Metric};
//!
//! let baskets = vec![
//!     Basket::from(vec!["Female", "Headache", "Pyrexia"]),
//!     Basket::from(vec!["Female", "Headache"]),
//!     Basket::from(vec!["Male", "Pyrexia"]),
//! ];
//! let tx = Transactions::from_baskets(&baskets);
//!
//! let itemsets = fpgrowth(&tx, 0.5, None)?;
//! let rules = association_rules(&itemsets, Metric::Confidence, 0.9)?;
//! assert_eq!(rules.len(), 2); // Female => Headache, Headache => Female
//! # Ok::<(), vaersmine::Error>(())
//! ```

mod fpgrowth;
mod rules;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use fpgrowth::{fpgrowth, min_count};
pub use rules::association_rules;

use crate::encode::{ItemId, Transactions};
use crate::error::{Error, Result};

/// An itemset whose support reached the minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentItemset {
    /// Item ids in ascending order.
    pub items: Vec<ItemId>,
    /// Number of transactions containing every item.
    pub count: u64,
    /// `count` divided by the number of transactions.
    pub support: f64,
}

impl FrequentItemset {
    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the itemset is empty (never true for mined itemsets).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Interest measure used to filter association rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Support of antecedent and consequent together.
    Support,
    /// Conditional probability of the consequent given the antecedent.
    #[default]
    Confidence,
    /// Confidence relative to the consequent's own support.
    Lift,
    /// Observed minus expected joint support.
    Leverage,
    /// Dependence of the consequent on the antecedent; infinite for exact rules.
    Conviction,
    /// Joint support over the union of both supports.
    Jaccard,
    /// Gain in confidence normalised by the room left above consequent support.
    Certainty,
    /// Mean of the confidences in both directions.
    Kulczynski,
}

impl Metric {
    /// Every metric, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Support,
        Self::Confidence,
        Self::Lift,
        Self::Leverage,
        Self::Conviction,
        Self::Jaccard,
        Self::Certainty,
        Self::Kulczynski,
    ];

    /// The snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Confidence => "confidence",
            Self::Lift => "lift",
            Self::Leverage => "leverage",
            Self::Conviction => "conviction",
            Self::Jaccard => "jaccard",
            Self::Certainty => "certainty",
            Self::Kulczynski => "kulczynski",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownMetric(s.to_string()))
    }
}

/// A rule `antecedents => consequents` with all its metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    /// Left-hand side, ascending ids.
    pub antecedents: Vec<ItemId>,
    /// Right-hand side, ascending ids.
    pub consequents: Vec<ItemId>,
    /// Support of the antecedent alone.
    pub antecedent_support: f64,
    /// Support of the consequent alone.
    pub consequent_support: f64,
    /// Support of both sides together.
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

impl AssociationRule {
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

/// Parameters of one mining run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MiningParams {
    /// Minimum itemset support, in (0, 1].
    pub min_support: f64,
    /// Longest itemset to report; `None` for no limit.
    pub max_len: Option<usize>,
    /// Metric that rules are filtered on.
    pub metric: Metric,
    /// Minimum value of `metric` for a rule to be kept.
    pub min_threshold: f64,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            min_support: 0.001,
            max_len: None,
            metric: Metric::Confidence,
            min_threshold: 0.8,
        }
    }
}

impl MiningParams {
    /// Check that the parameters are in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] naming the first bad parameter.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(Error::invalid_parameter(
                "min_support",
                format!("{} is not in (0, 1]", self.min_support),
            ));
        }
        if self.max_len == Some(0) {
            return Err(Error::invalid_parameter(
                "max_len",
                "must be at least 1 when set",
            ));
        }
        if !self.min_threshold.is_finite() {
            return Err(Error::invalid_parameter(
                "min_threshold",
                format!("{} is not finite", self.min_threshold),
            ));
        }
        Ok(())
    }
}

/// Itemsets and rules of one mining run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiningResult {
    /// Frequent itemsets, highest support first.
    pub itemsets: Vec<FrequentItemset>,
    /// Rules passing the metric threshold.
    pub rules: Vec<AssociationRule>,
}

/// Run FP-growth and rule generation with `params`.
///
/// # Errors
///
/// Returns an error if `params` is invalid.
pub fn mine(transactions: &Transactions, params: &MiningParams) -> Result<MiningResult> {
    params.validate()?;
    let itemsets = fpgrowth(transactions, params.min_support, params.max_len)?;
    let rules = association_rules(&itemsets, params.metric, params.min_threshold)?;
    Ok(MiningResult { itemsets, rules })
}
