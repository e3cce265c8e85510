//! FP-growth frequent itemset mining.
//!
//! Transactions are compressed into a prefix tree whose paths list items by
//! descending frequency. Itemsets are then grown suffix-first: for each item
//! the paths ending in it form a conditional pattern base, which becomes a
//! smaller tree mined recursively.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::FrequentItemset;
use crate::encode::{ItemId, Transactions};
use crate::error::{Error, Result};

/// Minimum transaction count for `min_support` over `n` transactions.
///
/// An itemset is frequent iff its count is at least `ceil(min_support * n)`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn min_count(min_support: f64, n: usize) -> u64 {
    (min_support * n as f64).ceil() as u64
}

#[derive(Debug)]
struct FpNode {
    item: ItemId,
    count: u64,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Prefix tree over weighted transactions. Node 0 is the root.
#[derive(Debug)]
struct FpTree {
    nodes: Vec<FpNode>,
    /// Nodes holding each frequent item.
    header: HashMap<ItemId, Vec<usize>>,
    /// Total weight of each frequent item.
    counts: HashMap<ItemId, u64>,
    /// Frequent items, most frequent first (ties by ascending id).
    order: Vec<ItemId>,
}

impl FpTree {
    fn build<'a>(
        transactions: impl Iterator<Item = (&'a [ItemId], u64)> + Clone,
        min_count: u64,
    ) -> Self {
        let mut counts: HashMap<ItemId, u64> = HashMap::new();
        for (items, weight) in transactions.clone() {
            for &item in items {
                *counts.entry(item).or_default() += weight;
            }
        }
        counts.retain(|_, count| *count >= min_count);

        let mut order: Vec<ItemId> = counts.keys().copied().collect();
        order.sort_unstable_by(|a, b| counts[b].cmp(&counts[a]).then(a.cmp(b)));
        let rank: HashMap<ItemId, usize> =
            order.iter().enumerate().map(|(r, &item)| (item, r)).collect();

        let mut tree = Self {
            nodes: vec![FpNode {
                item: ItemId::MAX,
                count: 0,
                parent: None,
                children: Vec::new(),
            }],
            header: HashMap::new(),
            counts,
            order,
        };

        let mut path: Vec<ItemId> = Vec::new();
        for (items, weight) in transactions {
            path.clear();
            path.extend(items.iter().copied().filter(|i| rank.contains_key(i)));
            path.sort_unstable_by_key(|i| rank[i]);
            tree.insert(&path, weight);
        }

        trace!(
            nodes = tree.nodes.len(),
            items = tree.order.len(),
            "Built FP-tree"
        );
        tree
    }

    fn insert(&mut self, path: &[ItemId], weight: u64) {
        let mut current = 0;
        for &item in path {
            let existing = self.nodes[current]
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child].item == item);

            current = if let Some(child) = existing {
                self.nodes[child].count += weight;
                child
            } else {
                let idx = self.nodes.len();
                self.nodes.push(FpNode {
                    item,
                    count: weight,
                    parent: Some(current),
                    children: Vec::new(),
                });
                self.nodes[current].children.push(idx);
                self.header.entry(item).or_default().push(idx);
                idx
            };
        }
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Items on the path from the root down to (excluding) `node`.
    fn prefix_path(&self, node: usize) -> Vec<ItemId> {
        let mut path = Vec::new();
        let mut current = self.nodes[node].parent;
        while let Some(idx) = current {
            if idx == 0 {
                break;
            }
            path.push(self.nodes[idx].item);
            current = self.nodes[idx].parent;
        }
        path.reverse();
        path
    }

    fn mine(
        &self,
        suffix: &[ItemId],
        min_count: u64,
        max_len: Option<usize>,
        out: &mut Vec<(Vec<ItemId>, u64)>,
    ) {
        for &item in self.order.iter().rev() {
            let mut itemset = Vec::with_capacity(suffix.len() + 1);
            itemset.push(item);
            itemset.extend_from_slice(suffix);
            out.push((itemset.clone(), self.counts[&item]));

            if max_len.is_some_and(|max| itemset.len() >= max) {
                continue;
            }

            let base: Vec<(Vec<ItemId>, u64)> = self.header[&item]
                .iter()
                .map(|&node| (self.prefix_path(node), self.nodes[node].count))
                .filter(|(path, _)| !path.is_empty())
                .collect();
            if base.is_empty() {
                continue;
            }

            let conditional = Self::build(
                base.iter().map(|(path, count)| (path.as_slice(), *count)),
                min_count,
            );
            if !conditional.is_empty() {
                conditional.mine(&itemset, min_count, max_len, out);
            }
        }
    }
}

/// Find all itemsets with support of at least `min_support`.
///
/// `max_len` bounds the length of reported itemsets. The result is ordered
/// by support (highest first), then by length, then by item ids.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `min_support` is not in (0, 1] or
/// `max_len` is `Some(0)`.
pub fn fpgrowth(
    transactions: &Transactions,
    min_support: f64,
    max_len: Option<usize>,
) -> Result<Vec<FrequentItemset>> {
    if !(min_support > 0.0 && min_support <= 1.0) {
        return Err(Error::invalid_parameter(
            "min_support",
            format!("{min_support} is not in (0, 1]"),
        ));
    }
    if max_len == Some(0) {
        return Err(Error::invalid_parameter(
            "max_len",
            "must be at least 1 when set",
        ));
    }

    let n = transactions.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let min_count = min_count(min_support, n);
    let tree = FpTree::build(
        transactions.rows().iter().map(|row| (row.as_slice(), 1)),
        min_count,
    );

    let mut raw = Vec::new();
    tree.mine(&[], min_count, max_len, &mut raw);

    let total = n as f64;
    let mut itemsets: Vec<FrequentItemset> = raw
        .into_iter()
        .map(|(mut items, count)| {
            items.sort_unstable();
            FrequentItemset {
                items,
                count,
                support: count as f64 / total,
            }
        })
        .collect();
    itemsets.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.items.len().cmp(&b.items.len()))
            .then_with(|| a.items.cmp(&b.items))
    });

    debug!(
        "FP-growth found {} itemsets over {} transactions (min count {})",
        itemsets.len(),
        n,
        min_count
    );
    Ok(itemsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::Basket;

    fn transactions(rows: &[&[&str]]) -> Transactions {
        let baskets: Vec<Basket> = rows.iter().map(|r| r.iter().copied().collect()).collect();
        Transactions::from_baskets(&baskets)
    }

    fn named(tx: &Transactions, itemset: &FrequentItemset) -> Vec<String> {
        tx.catalog()
            .names(&itemset.items)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn find<'a>(
        tx: &Transactions,
        itemsets: &'a [FrequentItemset],
        names: &[&str],
    ) -> Option<&'a FrequentItemset> {
        itemsets.iter().find(|i| named(tx, i) == names)
    }

    // The classic mlxtend example dataset
    fn dataset() -> Transactions {
        transactions(&[
            &["Milk", "Onion", "Nutmeg", "Kidney Beans", "Eggs", "Yogurt"],
            &["Dill", "Onion", "Nutmeg", "Kidney Beans", "Eggs", "Yogurt"],
            &["Milk", "Apple", "Kidney Beans", "Eggs"],
            &["Milk", "Unicorn", "Corn", "Kidney Beans", "Yogurt"],
            &["Corn", "Onion", "Onion", "Kidney Beans", "Ice cream", "Eggs"],
        ])
    }

    #[test]
    fn test_min_count() {
        assert_eq!(min_count(0.6, 5), 3);
        assert_eq!(min_count(0.5, 5), 3);
        assert_eq!(min_count(0.001, 1000), 1);
        assert_eq!(min_count(1.0, 7), 7);
    }

    #[test]
    fn test_fpgrowth_classic_dataset() {
        let tx = dataset();
        let itemsets = fpgrowth(&tx, 0.6, None).unwrap();

        // Kidney Beans 1.0, Eggs 0.8, Yogurt 0.6, Onion 0.6, Milk 0.6,
        // Eggs+Kidney Beans 0.8, Kidney Beans+Yogurt 0.6, Eggs+Onion 0.6,
        // Kidney Beans+Onion 0.6, Kidney Beans+Milk 0.6,
        // Eggs+Kidney Beans+Onion 0.6
        assert_eq!(itemsets.len(), 11);

        let kb = find(&tx, &itemsets, &["Kidney Beans"]).unwrap();
        assert_eq!(kb.count, 5);
        assert!((kb.support - 1.0).abs() < 1e-12);

        let triple = find(&tx, &itemsets, &["Eggs", "Kidney Beans", "Onion"]).unwrap();
        assert_eq!(triple.count, 3);
        assert!((triple.support - 0.6).abs() < 1e-12);

        assert!(find(&tx, &itemsets, &["Milk", "Yogurt"]).is_none());
    }

    #[test]
    fn test_fpgrowth_sorted_by_support_then_length() {
        let tx = dataset();
        let itemsets = fpgrowth(&tx, 0.6, None).unwrap();

        assert_eq!(named(&tx, &itemsets[0]), vec!["Kidney Beans"]);
        assert_eq!(named(&tx, &itemsets[1]), vec!["Eggs"]);
        assert_eq!(named(&tx, &itemsets[2]), vec!["Eggs", "Kidney Beans"]);
        for pair in itemsets.windows(2) {
            assert!(pair[0].count >= pair[1].count);
        }
    }

    #[test]
    fn test_fpgrowth_max_len() {
        let tx = dataset();
        let itemsets = fpgrowth(&tx, 0.6, Some(1)).unwrap();
        assert_eq!(itemsets.len(), 5);
        assert!(itemsets.iter().all(|i| i.len() == 1));

        let itemsets = fpgrowth(&tx, 0.6, Some(2)).unwrap();
        assert_eq!(itemsets.len(), 10);
    }

    #[test]
    fn test_fpgrowth_items_sorted_within_itemset() {
        let tx = dataset();
        for itemset in fpgrowth(&tx, 0.2, None).unwrap() {
            assert!(itemset.items.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_fpgrowth_full_support() {
        let tx = transactions(&[&["a", "b"], &["a", "b"], &["a"]]);
        let itemsets = fpgrowth(&tx, 1.0, None).unwrap();
        assert_eq!(itemsets.len(), 1);
        assert_eq!(named(&tx, &itemsets[0]), vec!["a"]);
    }

    #[test]
    fn test_fpgrowth_empty_input() {
        let tx = Transactions::from_baskets(&[]);
        assert!(fpgrowth(&tx, 0.5, None).unwrap().is_empty());
    }

    #[test]
    fn test_fpgrowth_empty_baskets() {
        let tx = transactions(&[&[], &[]]);
        assert!(fpgrowth(&tx, 0.1, None).unwrap().is_empty());
    }

    #[test]
    fn test_fpgrowth_rejects_bad_parameters() {
        let tx = dataset();
        assert!(fpgrowth(&tx, 0.0, None).is_err());
        assert!(fpgrowth(&tx, 1.01, None).is_err());
        assert!(fpgrowth(&tx, 0.5, Some(0)).is_err());
    }
}
