//! Association rules from frequent itemsets.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{AssociationRule, FrequentItemset, Metric};
use crate::encode::ItemId;
use crate::error::{Error, Result};

/// All `r`-element combinations of `items`, in lexicographic order.
fn combinations(items: &[ItemId], r: usize) -> Vec<Vec<ItemId>> {
    fn walk(
        items: &[ItemId],
        r: usize,
        start: usize,
        current: &mut Vec<ItemId>,
        out: &mut Vec<Vec<ItemId>>,
    ) {
        if current.len() == r {
            out.push(current.clone());
            return;
        }
        let needed = r - current.len();
        for i in start..=items.len() - needed {
            current.push(items[i]);
            walk(items, r, i + 1, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    if r <= items.len() {
        walk(items, r, 0, &mut Vec::with_capacity(r), &mut out);
    }
    out
}

fn lookup(supports: &HashMap<&[ItemId], f64>, items: &[ItemId]) -> Result<f64> {
    supports.get(items).copied().ok_or_else(|| {
        Error::invalid_parameter(
            "itemsets",
            format!("subset {items:?} is missing; itemsets must be downward closed"),
        )
    })
}

/// Compute every metric for one split.
fn score(
    antecedents: Vec<ItemId>,
    consequents: Vec<ItemId>,
    s_a: f64,
    s_c: f64,
    s_ac: f64,
) -> AssociationRule {
    let confidence = s_ac / s_a;
    let conviction = if confidence >= 1.0 {
        f64::INFINITY
    } else {
        (1.0 - s_c) / (1.0 - confidence)
    };
    let certainty = if s_c >= 1.0 {
        0.0
    } else {
        (confidence - s_c) / (1.0 - s_c)
    };

    AssociationRule {
        antecedents,
        consequents,
        antecedent_support: s_a,
        consequent_support: s_c,
        support: s_ac,
        confidence,
        lift: confidence / s_c,
        leverage: s_ac - s_a * s_c,
        conviction,
        jaccard: s_ac / (s_a + s_c - s_ac),
        certainty,
        kulczynski: (s_ac / s_a + s_ac / s_c) / 2.0,
    }
}

/// Generate rules from `itemsets` and keep those scoring at least
/// `min_threshold` on `metric`.
///
/// Every itemset of two or more items is split into each non-empty proper
/// subset (antecedent) and its complement (consequent), larger antecedents
/// first. Subset supports are read from `itemsets`, which must therefore
/// contain every subset of every itemset, as FP-growth output does.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `min_threshold` is not finite or a
/// needed subset is absent from `itemsets`.
pub fn association_rules(
    itemsets: &[FrequentItemset],
    metric: Metric,
    min_threshold: f64,
) -> Result<Vec<AssociationRule>> {
    if !min_threshold.is_finite() {
        return Err(Error::invalid_parameter(
            "min_threshold",
            format!("{min_threshold} is not finite"),
        ));
    }
    if itemsets.is_empty() {
        warn!("No frequent itemsets; no association rules can be generated");
        return Ok(Vec::new());
    }

    let supports: HashMap<&[ItemId], f64> = itemsets
        .iter()
        .map(|i| (i.items.as_slice(), i.support))
        .collect();

    let mut rules = Vec::new();
    let mut candidates = 0usize;

    for itemset in itemsets.iter().filter(|i| i.len() > 1) {
        for r in (1..itemset.len()).rev() {
            for antecedents in combinations(&itemset.items, r) {
                let consequents: Vec<ItemId> = itemset
                    .items
                    .iter()
                    .copied()
                    .filter(|item| antecedents.binary_search(item).is_err())
                    .collect();

                let s_a = lookup(&supports, &antecedents)?;
                let s_c = lookup(&supports, &consequents)?;
                candidates += 1;

                let rule = score(antecedents, consequents, s_a, s_c, itemset.support);
                if rule.metric(metric) >= min_threshold {
                    rules.push(rule);
                }
            }
        }
    }

    debug!(
        "Kept {} of {} candidate rules with {} >= {}",
        rules.len(),
        candidates,
        metric,
        min_threshold
    );
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::Basket;
    use crate::encode::Transactions;
    use crate::mining::fpgrowth;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn itemset(items: &[ItemId], support: f64) -> FrequentItemset {
        FrequentItemset {
            items: items.to_vec(),
            count: 0,
            support,
        }
    }

    #[test]
    fn test_combinations() {
        assert_eq!(
            combinations(&[1, 2, 3], 2),
            vec![vec![1, 2], vec![1, 3], vec![2, 3]]
        );
        assert_eq!(combinations(&[1, 2, 3], 3), vec![vec![1, 2, 3]]);
        assert_eq!(combinations(&[1, 2, 3], 1).len(), 3);
        assert!(combinations(&[1, 2], 3).is_empty());
    }

    #[test]
    fn test_score_metrics() {
        // sA = 0.8, sC = 1.0, sAC = 0.8 (Eggs => Kidney Beans)
        let rule = score(vec![0], vec![1], 0.8, 1.0, 0.8);
        assert!(approx(rule.confidence, 1.0));
        assert!(approx(rule.lift, 1.0));
        assert!(approx(rule.leverage, 0.0));
        assert!(rule.conviction.is_infinite());
        assert!(approx(rule.certainty, 0.0));
        assert!(approx(rule.jaccard, 0.8));
        assert!(approx(rule.kulczynski, 0.9));
    }

    #[test]
    fn test_score_conviction_finite() {
        // sA = 0.6, sC = 0.8, sAC = 0.4
        let rule = score(vec![0], vec![1], 0.6, 0.8, 0.4);
        let confidence = 0.4 / 0.6;
        assert!(approx(rule.confidence, confidence));
        assert!(approx(rule.conviction, 0.2 / (1.0 - confidence)));
        assert!(approx(rule.leverage, 0.4 - 0.48));
        assert!(approx(rule.certainty, (confidence - 0.8) / 0.2));
    }

    #[test]
    fn test_rules_from_classic_dataset() {
        let baskets: Vec<Basket> = vec![
            Basket::from(vec!["Milk", "Onion", "Nutmeg", "Kidney Beans", "Eggs", "Yogurt"]),
            Basket::from(vec!["Dill", "Onion", "Nutmeg", "Kidney Beans", "Eggs", "Yogurt"]),
            Basket::from(vec!["Milk", "Apple", "Kidney Beans", "Eggs"]),
            Basket::from(vec!["Milk", "Unicorn", "Corn", "Kidney Beans", "Yogurt"]),
            Basket::from(vec!["Corn", "Onion", "Onion", "Kidney Beans", "Ice cream", "Eggs"]),
        ];
        let tx = Transactions::from_baskets(&baskets);
        let itemsets = fpgrowth(&tx, 0.6, None).unwrap();

        let rules = association_rules(&itemsets, Metric::Confidence, 0.7).unwrap();
        // 12 of the 16 candidate rules reach confidence 0.7
        assert_eq!(rules.len(), 12);

        let catalog = tx.catalog();
        let onion_eggs = rules
            .iter()
            .find(|r| {
                catalog.names(&r.antecedents) == ["Onion"]
                    && catalog.names(&r.consequents) == ["Eggs"]
            })
            .unwrap();
        assert!(approx(onion_eggs.confidence, 1.0));
        assert!(approx(onion_eggs.lift, 1.25));
        assert!(approx(onion_eggs.leverage, 0.12));
        assert!(onion_eggs.conviction.is_infinite());
    }

    #[test]
    fn test_rules_larger_antecedents_first() {
        let itemsets = vec![
            itemset(&[0], 0.5),
            itemset(&[1], 0.5),
            itemset(&[2], 0.5),
            itemset(&[0, 1], 0.5),
            itemset(&[0, 2], 0.5),
            itemset(&[1, 2], 0.5),
            itemset(&[0, 1, 2], 0.5),
        ];
        let rules = association_rules(&itemsets, Metric::Support, 0.0).unwrap();
        // Three pairs give two rules each, the triple gives six
        assert_eq!(rules.len(), 12);

        let triple_rules: Vec<_> = rules
            .iter()
            .filter(|r| r.antecedents.len() + r.consequents.len() == 3)
            .collect();
        assert_eq!(triple_rules[0].antecedents, vec![0, 1]);
        assert_eq!(triple_rules[0].consequents, vec![2]);
        assert_eq!(triple_rules[3].antecedents, vec![0]);
        assert_eq!(triple_rules[3].consequents, vec![1, 2]);
    }

    #[test]
    fn test_rules_threshold_filters() {
        let itemsets = vec![itemset(&[0], 0.8), itemset(&[1], 0.4), itemset(&[0, 1], 0.4)];
        // 0 => 1 has confidence 0.5, 1 => 0 has confidence 1.0
        let rules = association_rules(&itemsets, Metric::Confidence, 0.8).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].antecedents, vec![1]);
    }

    #[test]
    fn test_rules_empty_itemsets() {
        assert!(association_rules(&[], Metric::Lift, 1.0).unwrap().is_empty());
    }

    #[test]
    fn test_rules_single_items_only() {
        let itemsets = vec![itemset(&[0], 0.5), itemset(&[1], 0.5)];
        assert!(association_rules(&itemsets, Metric::Confidence, 0.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rules_missing_subset() {
        let itemsets = vec![itemset(&[0], 0.5), itemset(&[0, 1], 0.4)];
        let err = association_rules(&itemsets, Metric::Confidence, 0.0).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "itemsets", .. }));
    }

    #[test]
    fn test_rules_reject_nan_threshold() {
        let itemsets = vec![itemset(&[0], 0.5)];
        assert!(association_rules(&itemsets, Metric::Confidence, f64::NAN).is_err());
    }
}
