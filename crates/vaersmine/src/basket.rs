//! Conversion of joined VAERS rows into item baskets.
//!
//! A basket is the set of categorical facts of one joined row: where the
//! report came from, who the patient was, how serious the outcome was, which
//! vaccine was given and which symptoms were coded.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::filter::ItemFilter;
use crate::vaers::{MergedReport, Outcomes};

/// Age bands from <https://www.ncbi.nlm.nih.gov/pmc/articles/PMC3825015/>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgeGroup {
    /// Under 3 years.
    Infant,
    /// 3 to 5 years.
    Preschool,
    /// 6 to 13 years.
    Child,
    /// 14 to 18 years.
    Adolescent,
    /// 19 to 33 years.
    YoungAdult,
    /// 34 to 48 years.
    Adult,
    /// 49 to 64 years.
    MiddleAged,
    /// 65 to 78 years.
    Senior,
    /// 79 years and older.
    Elderly,
}

impl AgeGroup {
    /// Band an age in years. Upper bounds are exclusive.
    #[must_use]
    pub fn from_age(age: f64) -> Self {
        if age < 3.0 {
            Self::Infant
        } else if age < 6.0 {
            Self::Preschool
        } else if age < 14.0 {
            Self::Child
        } else if age < 19.0 {
            Self::Adolescent
        } else if age < 34.0 {
            Self::YoungAdult
        } else if age < 49.0 {
            Self::Adult
        } else if age < 65.0 {
            Self::MiddleAged
        } else if age < 79.0 {
            Self::Senior
        } else {
            Self::Elderly
        }
    }

    /// The basket item for this band.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Infant => "Age 0-2",
            Self::Preschool => "Age 3-5",
            Self::Child => "Age 6-13",
            Self::Adolescent => "Age 14-18",
            Self::YoungAdult => "Age 19-33",
            Self::Adult => "Age 34-48",
            Self::MiddleAged => "Age 49-64",
            Self::Senior => "Age 65-78",
            Self::Elderly => "Age 79-older",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Patient sex as a basket item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SexGroup {
    /// `F`
    Female,
    /// `M`
    Male,
    /// `U`, missing, or anything else.
    Unknown,
}

impl SexGroup {
    /// Map a raw `SEX` cell.
    #[must_use]
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("F") => Self::Female,
            Some("M") => Self::Male,
            _ => Self::Unknown,
        }
    }

    /// The basket item for this group.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
            Self::Unknown => "Unknown Sex",
        }
    }
}

impl fmt::Display for SexGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Labels of the outcome flags that are set, in column order.
pub fn outcome_labels(outcomes: &Outcomes) -> impl Iterator<Item = &'static str> {
    [
        (outcomes.died, "Died"),
        (outcomes.life_threatening, "Life-threatening illness"),
        (outcomes.er_visit, "Emergency room visit"),
        (outcomes.hospitalized, "Hospitalized"),
        (
            outcomes.prolonged_stay,
            "Prolongation of existing hospitalization",
        ),
        (outcomes.disabled, "Disability"),
        (outcomes.recovered, "Recovered"),
        (outcomes.birth_defect, "Birth defect"),
    ]
    .into_iter()
    .filter_map(|(set, label)| set.then_some(label))
}

/// The items of one joined row, in derivation order.
///
/// Duplicates are allowed here; encoding collapses them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Basket(Vec<String>);

impl Basket {
    /// An empty basket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item.
    pub fn push(&mut self, item: impl Into<String>) {
        self.0.push(item.into());
    }

    /// Append an item if present.
    pub fn push_some(&mut self, item: Option<&str>) {
        if let Some(item) = item {
            self.push(item);
        }
    }

    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.0
    }

    /// Number of items, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the basket has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `item` is in the basket.
    #[must_use]
    pub fn contains(&self, item: &str) -> bool {
        self.0.iter().any(|i| i == item)
    }

    /// Keep only the items for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&String) -> bool) {
        self.0.retain(keep);
    }
}

impl<S: Into<String>> From<Vec<S>> for Basket {
    fn from(items: Vec<S>) -> Self {
        items.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Basket {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Build the basket of one joined row.
///
/// Items, in order: state, age group, sex group, set outcome labels,
/// vaccine name, symptom terms. Missing values contribute nothing; a
/// missing or non-finite age contributes no age group.
#[must_use]
pub fn build_basket(row: &MergedReport<'_>) -> Basket {
    let report = row.report;
    let mut basket = Basket::new();

    basket.push_some(report.state.as_deref());
    if let Some(age) = report.age_years.filter(|age| age.is_finite()) {
        basket.push(AgeGroup::from_age(age).label());
    }
    basket.push(SexGroup::from_code(report.sex.as_deref()).label());
    for label in outcome_labels(&report.outcomes) {
        basket.push(label);
    }
    basket.push_some(row.vaccine.name.as_deref());
    for symptom in &row.symptoms.symptoms {
        basket.push(symptom.term.as_str());
    }

    basket
}

/// Build and filter the baskets of all joined rows.
#[must_use]
pub fn build_baskets(rows: &[MergedReport<'_>], filter: &ItemFilter) -> Vec<Basket> {
    let mut removed = 0usize;
    let baskets: Vec<Basket> = rows
        .iter()
        .map(|row| {
            let mut basket = build_basket(row);
            removed += filter.apply(&mut basket);
            basket
        })
        .collect();

    debug!(
        "Built {} baskets ({} items removed by filter)",
        baskets.len(),
        removed
    );
    baskets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::vaers::{Report, Symptom, SymptomEntry, VaxEntry};

    fn symptoms(id: u64, terms: &[&str]) -> SymptomEntry {
        SymptomEntry {
            vaers_id: id,
            symptoms: terms
                .iter()
                .map(|t| Symptom {
                    term: (*t).to_string(),
                    version: Some("23.1".to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_age_group_boundaries() {
        assert_eq!(AgeGroup::from_age(0.0).label(), "Age 0-2");
        assert_eq!(AgeGroup::from_age(2.99).label(), "Age 0-2");
        assert_eq!(AgeGroup::from_age(3.0).label(), "Age 3-5");
        assert_eq!(AgeGroup::from_age(6.0).label(), "Age 6-13");
        assert_eq!(AgeGroup::from_age(14.0).label(), "Age 14-18");
        assert_eq!(AgeGroup::from_age(19.0).label(), "Age 19-33");
        assert_eq!(AgeGroup::from_age(34.0).label(), "Age 34-48");
        assert_eq!(AgeGroup::from_age(49.0).label(), "Age 49-64");
        assert_eq!(AgeGroup::from_age(64.9).label(), "Age 49-64");
        assert_eq!(AgeGroup::from_age(65.0).label(), "Age 65-78");
        assert_eq!(AgeGroup::from_age(79.0).label(), "Age 79-older");
        assert_eq!(AgeGroup::from_age(105.0).label(), "Age 79-older");
    }

    #[test]
    fn test_age_group_display() {
        assert_eq!(AgeGroup::Adult.to_string(), "Age 34-48");
    }

    #[test]
    fn test_sex_group_from_code() {
        assert_eq!(SexGroup::from_code(Some("F")), SexGroup::Female);
        assert_eq!(SexGroup::from_code(Some("M")), SexGroup::Male);
        assert_eq!(SexGroup::from_code(Some("U")), SexGroup::Unknown);
        assert_eq!(SexGroup::from_code(None), SexGroup::Unknown);
        assert_eq!(SexGroup::Unknown.to_string(), "Unknown Sex");
    }

    #[test]
    fn test_outcome_labels_in_column_order() {
        let outcomes = Outcomes {
            died: true,
            hospitalized: true,
            birth_defect: true,
            ..Outcomes::default()
        };
        let labels: Vec<_> = outcome_labels(&outcomes).collect();
        assert_eq!(labels, vec!["Died", "Hospitalized", "Birth defect"]);
    }

    #[test]
    fn test_outcome_labels_none_set() {
        assert_eq!(outcome_labels(&Outcomes::default()).count(), 0);
    }

    #[test]
    fn test_build_basket_full_row() {
        let mut report = Report::new(916_600);
        report.state = Some("TX".to_string());
        report.age_years = Some(33.0);
        report.sex = Some("F".to_string());
        report.outcomes.er_visit = true;
        report.outcomes.recovered = true;
        let symptom_row = symptoms(916_600, &["Dysphagia", "Epiglottitis"]);
        let vax = VaxEntry::named(916_600, "COVID19 (COVID19 (MODERNA))");

        let basket = build_basket(&MergedReport {
            report: &report,
            symptoms: &symptom_row,
            vaccine: &vax,
        });

        assert_eq!(
            basket.items(),
            [
                "TX",
                "Age 19-33",
                "Female",
                "Emergency room visit",
                "Recovered",
                "COVID19 (COVID19 (MODERNA))",
                "Dysphagia",
                "Epiglottitis",
            ]
        );
    }

    #[test]
    fn test_build_basket_skips_missing_values() {
        let report = Report::new(1);
        let symptom_row = symptoms(1, &[]);
        let mut vax = VaxEntry::named(1, "FLU");
        vax.name = None;

        let basket = build_basket(&MergedReport {
            report: &report,
            symptoms: &symptom_row,
            vaccine: &vax,
        });

        // Sex is always present; a missing code maps to "Unknown Sex"
        assert_eq!(basket.items(), ["Unknown Sex"]);
    }

    #[test]
    fn test_build_basket_nan_age_has_no_group() {
        let mut report = Report::new(1);
        report.age_years = Some(f64::NAN);
        let symptom_row = symptoms(1, &[]);
        let vax = VaxEntry::named(1, "FLU");

        let basket = build_basket(&MergedReport {
            report: &report,
            symptoms: &symptom_row,
            vaccine: &vax,
        });
        assert!(!basket.items().iter().any(|i| i.starts_with("Age ")));
    }

    #[test]
    fn test_build_baskets_applies_filter() {
        let mut report = Report::new(1);
        report.sex = Some("M".to_string());
        let symptom_row = symptoms(1, &["No adverse event", "Headache"]);
        let vax = VaxEntry::named(1, "FLU");
        let rows = [MergedReport {
            report: &report,
            symptoms: &symptom_row,
            vaccine: &vax,
        }];

        let filter = ItemFilter::from_config(&FilterConfig {
            enabled: true,
            excluded_items: vec!["No adverse event".to_string()],
            exclude_patterns: Vec::new(),
        });
        let baskets = build_baskets(&rows, &filter);

        assert_eq!(baskets.len(), 1);
        assert!(baskets[0].contains("Headache"));
        assert!(!baskets[0].contains("No adverse event"));
    }

    #[test]
    fn test_basket_from_iter() {
        let basket: Basket = ["a", "b", "a"].into_iter().collect();
        assert_eq!(basket.len(), 3);
        assert!(basket.contains("a"));
        assert!(!basket.is_empty());
    }
}
