//! Property-based tests for itemset mining and rule generation.
//!
//! FP-growth output is checked against brute-force subset counting over
//! small random item universes.

use std::collections::BTreeMap;

use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use vaersmine::encode::{ItemId, Transactions};
use vaersmine::mining::{association_rules, fpgrowth, min_count, Metric};
use vaersmine::Basket;

const UNIVERSE: usize = 7;

fn baskets_strategy() -> impl Strategy<Value = Vec<Basket>> {
    vec(btree_set(0..UNIVERSE, 0..=UNIVERSE), 1..30).prop_map(|rows| {
        rows.into_iter()
            .map(|row| row.into_iter().map(|i| format!("item{i}")).collect())
            .collect()
    })
}

/// Every non-empty subset of the vocabulary reaching `min`, with its count.
fn brute_force(tx: &Transactions, min: u64) -> BTreeMap<Vec<ItemId>, u64> {
    let n = tx.catalog().len();
    let mut out = BTreeMap::new();
    for mask in 1u32..(1 << n) {
        let items: Vec<ItemId> = (0..n as ItemId).filter(|i| mask & (1 << i) != 0).collect();
        let count = tx
            .rows()
            .iter()
            .filter(|row| items.iter().all(|i| row.binary_search(i).is_ok()))
            .count() as u64;
        if count >= min && count > 0 {
            out.insert(items, count);
        }
    }
    out
}

proptest! {
    /// FP-growth finds exactly the itemsets brute force finds, with the same counts.
    #[test]
    fn fpgrowth_matches_brute_force(baskets in baskets_strategy(), min_support in 0.05f64..=1.0) {
        let tx = Transactions::from_baskets(&baskets);
        let itemsets = fpgrowth(&tx, min_support, None).expect("mine");

        let found: BTreeMap<Vec<ItemId>, u64> =
            itemsets.iter().map(|i| (i.items.clone(), i.count)).collect();
        prop_assert_eq!(found.len(), itemsets.len(), "duplicate itemsets");
        prop_assert_eq!(found, brute_force(&tx, min_count(min_support, tx.len())));
    }

    /// Supports are counts over the number of transactions and never below the minimum.
    #[test]
    fn supports_consistent(baskets in baskets_strategy(), min_support in 0.05f64..=1.0) {
        let tx = Transactions::from_baskets(&baskets);
        for itemset in fpgrowth(&tx, min_support, None).expect("mine") {
            let expected = itemset.count as f64 / tx.len() as f64;
            prop_assert!((itemset.support - expected).abs() < 1e-12);
            prop_assert!(itemset.support + 1e-12 >= min_support);
        }
    }

    /// `max_len` keeps exactly the short itemsets of an unbounded run.
    #[test]
    fn max_len_truncates(baskets in baskets_strategy(), max_len in 1usize..4) {
        let tx = Transactions::from_baskets(&baskets);
        let all = fpgrowth(&tx, 0.1, None).expect("mine");
        let bounded = fpgrowth(&tx, 0.1, Some(max_len)).expect("mine");

        let expected: Vec<_> = all.into_iter().filter(|i| i.len() <= max_len).collect();
        prop_assert_eq!(bounded, expected);
    }

    /// Rule metrics agree with the supports they are derived from.
    #[test]
    fn rule_metrics_consistent(baskets in baskets_strategy()) {
        let tx = Transactions::from_baskets(&baskets);
        let itemsets = fpgrowth(&tx, 0.1, None).expect("mine");
        let rules = association_rules(&itemsets, Metric::Support, 0.0).expect("rules");

        for rule in &rules {
            prop_assert!(!rule.antecedents.is_empty());
            prop_assert!(!rule.consequents.is_empty());
            prop_assert!(rule.antecedents.iter().all(|a| !rule.consequents.contains(a)));

            prop_assert!(rule.support <= rule.antecedent_support + 1e-12);
            prop_assert!(rule.support <= rule.consequent_support + 1e-12);
            prop_assert!(rule.confidence > 0.0 && rule.confidence <= 1.0 + 1e-12);
            prop_assert!((rule.confidence - rule.support / rule.antecedent_support).abs() < 1e-9);
            prop_assert!((rule.lift * rule.consequent_support - rule.confidence).abs() < 1e-9);
            prop_assert!(rule.jaccard > 0.0 && rule.jaccard <= 1.0 + 1e-12);
            if rule.confidence >= 1.0 {
                prop_assert!(rule.conviction.is_infinite());
            }
        }
    }

    /// Every rule passes the threshold, and raising it never adds rules.
    #[test]
    fn rule_threshold_monotone(baskets in baskets_strategy(), low in 0.0f64..0.5, step in 0.0f64..0.5) {
        let tx = Transactions::from_baskets(&baskets);
        let itemsets = fpgrowth(&tx, 0.1, None).expect("mine");

        let loose = association_rules(&itemsets, Metric::Confidence, low).expect("rules");
        let strict = association_rules(&itemsets, Metric::Confidence, low + step).expect("rules");

        prop_assert!(strict.len() <= loose.len());
        for rule in &strict {
            prop_assert!(rule.confidence >= low + step);
            prop_assert!(loose.contains(rule));
        }
    }
}
