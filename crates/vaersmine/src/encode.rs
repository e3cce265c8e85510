//! One-hot encoding of baskets into transactions.
//!
//! The vocabulary is the sorted set of every item seen in any basket; an
//! item's position in that order is its [`ItemId`]. Each basket becomes the
//! sorted, de-duplicated list of the ids it contains, which is the sparse
//! form of a one-hot row.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::basket::Basket;

/// Position of an item in an [`ItemCatalog`].
pub type ItemId = u32;

/// Sorted vocabulary of distinct items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemCatalog {
    names: Vec<String>,
}

impl ItemCatalog {
    /// Collect the distinct items of `baskets`.
    #[must_use]
    pub fn from_baskets(baskets: &[Basket]) -> Self {
        let names: BTreeSet<&str> = baskets
            .iter()
            .flat_map(|b| b.items().iter().map(String::as_str))
            .collect();
        Self {
            names: names.into_iter().map(str::to_string).collect(),
        }
    }

    /// Number of distinct items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the vocabulary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of an item.
    #[must_use]
    pub fn name(&self, id: ItemId) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Id of an item.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<ItemId> {
        self.names
            .binary_search_by(|probe| probe.as_str().cmp(name))
            .ok()
            .and_then(|pos| ItemId::try_from(pos).ok())
    }

    /// Names of `ids`, skipping ids outside the vocabulary.
    #[must_use]
    pub fn names(&self, ids: &[ItemId]) -> Vec<&str> {
        ids.iter().filter_map(|&id| self.name(id)).collect()
    }

    /// All item names in id order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Encoded baskets over a shared vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transactions {
    catalog: ItemCatalog,
    rows: Vec<Vec<ItemId>>,
}

impl Transactions {
    /// Encode `baskets`.
    #[must_use]
    pub fn from_baskets(baskets: &[Basket]) -> Self {
        let catalog = ItemCatalog::from_baskets(baskets);
        let rows = baskets
            .iter()
            .map(|basket| {
                let mut ids: Vec<ItemId> = basket
                    .items()
                    .iter()
                    .filter_map(|item| catalog.id(item))
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                ids
            })
            .collect();

        Self { catalog, rows }
    }

    /// The shared vocabulary.
    #[must_use]
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// Encoded rows, each sorted and free of duplicates.
    #[must_use]
    pub fn rows(&self) -> &[Vec<ItemId>] {
        &self.rows
    }

    /// Number of transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no transactions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of transactions containing each item, indexed by id.
    #[must_use]
    pub fn item_counts(&self) -> Vec<u64> {
        let mut counts = vec![0u64; self.catalog.len()];
        for row in &self.rows {
            for &id in row {
                counts[id as usize] += 1;
            }
        }
        counts
    }
}
