//! Inner join of the three VAERS files on `VAERS_ID`.

use std::collections::HashMap;

use tracing::debug;

use super::model::{Report, SymptomEntry, VaersDataset, VaersId, VaxEntry};

/// One joined row: a report with one of its symptom rows and one of its
/// vaccine rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedReport<'a> {
    /// The `VAERSDATA` row.
    pub report: &'a Report,
    /// A `VAERSSYMPTOMS` row with the same id.
    pub symptoms: &'a SymptomEntry,
    /// A `VAERSVAX` row with the same id.
    pub vaccine: &'a VaxEntry,
}

fn index_by_id<T>(rows: &[T], id: impl Fn(&T) -> VaersId) -> HashMap<VaersId, Vec<&T>> {
    let mut index: HashMap<VaersId, Vec<&T>> = HashMap::new();
    for row in rows {
        index.entry(id(row)).or_default().push(row);
    }
    index
}

/// Join reports, symptom rows and vaccine rows on `VAERS_ID`.
///
/// A report with `m` symptom rows and `n` vaccine rows produces `m * n`
/// joined rows; a report missing from either side produces none. Rows come
/// out in report order, then symptom order, then vaccine order.
#[must_use]
pub fn merge(dataset: &VaersDataset) -> Vec<MergedReport<'_>> {
    let symptoms = index_by_id(&dataset.symptoms, |s| s.vaers_id);
    let vaccines = index_by_id(&dataset.vaccines, |v| v.vaers_id);

    let mut merged = Vec::with_capacity(dataset.reports.len());
    let mut unmatched = 0usize;

    for report in &dataset.reports {
        let (Some(symptom_rows), Some(vax_rows)) =
            (symptoms.get(&report.vaers_id), vaccines.get(&report.vaers_id))
        else {
            unmatched += 1;
            continue;
        };

        for &symptom_row in symptom_rows {
            for &vax_row in vax_rows {
                merged.push(MergedReport {
                    report,
                    symptoms: symptom_row,
                    vaccine: vax_row,
                });
            }
        }
    }

    debug!(
        "Merged {} reports into {} rows ({} reports without symptoms or vaccines)",
        dataset.reports.len(),
        merged.len(),
        unmatched
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vaers::model::Symptom;

    fn symptom_entry(id: VaersId, terms: &[&str]) -> SymptomEntry {
        SymptomEntry {
            vaers_id: id,
            symptoms: terms
                .iter()
                .map(|term| Symptom {
                    term: (*term).to_string(),
                    version: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_merge_one_to_one() {
        let dataset = VaersDataset {
            reports: vec![Report::new(1), Report::new(2)],
            symptoms: vec![symptom_entry(2, &["Headache"]), symptom_entry(1, &["Pyrexia"])],
            vaccines: vec![VaxEntry::named(1, "FLU"), VaxEntry::named(2, "COVID19")],
        };

        let merged = merge(&dataset);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].report.vaers_id, 1);
        assert_eq!(merged[0].symptoms.symptoms[0].term, "Pyrexia");
        assert_eq!(merged[0].vaccine.name.as_deref(), Some("FLU"));
        assert_eq!(merged[1].report.vaers_id, 2);
        assert_eq!(merged[1].vaccine.name.as_deref(), Some("COVID19"));
    }

    #[test]
    fn test_merge_cartesian_product_per_id() {
        let dataset = VaersDataset {
            reports: vec![Report::new(7)],
            symptoms: vec![symptom_entry(7, &["A"]), symptom_entry(7, &["B"])],
            vaccines: vec![
                VaxEntry::named(7, "X"),
                VaxEntry::named(7, "Y"),
                VaxEntry::named(7, "Z"),
            ],
        };

        let merged = merge(&dataset);
        assert_eq!(merged.len(), 6);

        let pairs: Vec<(&str, &str)> = merged
            .iter()
            .map(|m| {
                (
                    m.symptoms.symptoms[0].term.as_str(),
                    m.vaccine.name.as_deref().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![("A", "X"), ("A", "Y"), ("A", "Z"), ("B", "X"), ("B", "Y"), ("B", "Z")]
        );
    }

    #[test]
    fn test_merge_drops_unmatched_reports() {
        let dataset = VaersDataset {
            reports: vec![Report::new(1), Report::new(2), Report::new(3)],
            symptoms: vec![symptom_entry(1, &["A"]), symptom_entry(2, &["B"])],
            vaccines: vec![VaxEntry::named(1, "X"), VaxEntry::named(3, "Z")],
        };

        let merged = merge(&dataset);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].report.vaers_id, 1);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge(&VaersDataset::default()).is_empty());
    }
}
