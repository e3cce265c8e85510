//! Typed rows of the three VAERS files.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier shared by all three VAERS files.
pub type VaersId = u64;

/// Serious outcome flags of a report. A flag is set when the cell is `Y`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcomes {
    /// `DIED`
    pub died: bool,
    /// `L_THREAT`
    pub life_threatening: bool,
    /// `ER_VISIT`
    pub er_visit: bool,
    /// `HOSPITAL`
    pub hospitalized: bool,
    /// `X_STAY`
    pub prolonged_stay: bool,
    /// `DISABLE`
    pub disabled: bool,
    /// `RECOVD`
    pub recovered: bool,
    /// `BIRTH_DEFECT`
    pub birth_defect: bool,
}

/// One row of a `VAERSDATA` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// `VAERS_ID`
    pub vaers_id: VaersId,
    /// `RECVDATE`
    pub received: Option<NaiveDate>,
    /// `STATE`, two-letter code.
    pub state: Option<String>,
    /// `AGE_YRS`
    pub age_years: Option<f64>,
    /// `CAGE_YR`, calculated age in years.
    pub calc_age_years: Option<f64>,
    /// `CAGE_MO`, calculated age in months.
    pub calc_age_months: Option<f64>,
    /// `SEX`, raw code (`F`, `M`, `U`).
    pub sex: Option<String>,
    /// `SYMPTOM_TEXT`
    pub symptom_text: Option<String>,
    /// Outcome flags.
    pub outcomes: Outcomes,
    /// `DATEDIED`
    pub died_on: Option<NaiveDate>,
    /// `HOSPDAYS`
    pub hospital_days: Option<f64>,
    /// `VAX_DATE`
    pub vaccinated_on: Option<NaiveDate>,
    /// `ONSET_DATE`
    pub onset_on: Option<NaiveDate>,
    /// `NUMDAYS`, days from vaccination to onset.
    pub days_to_onset: Option<f64>,
    /// `V_ADMINBY`
    pub administered_by: Option<String>,
    /// `OTHER_MEDS`
    pub other_meds: Option<String>,
    /// `CUR_ILL`
    pub current_illness: Option<String>,
    /// `HISTORY`
    pub history: Option<String>,
    /// `FORM_VERS`
    pub form_version: Option<f64>,
    /// `ALLERGIES`
    pub allergies: Option<String>,
}

impl Report {
    /// A report with the given id and every optional field empty.
    #[must_use]
    pub fn new(vaers_id: VaersId) -> Self {
        Self {
            vaers_id,
            received: None,
            state: None,
            age_years: None,
            calc_age_years: None,
            calc_age_months: None,
            sex: None,
            symptom_text: None,
            outcomes: Outcomes::default(),
            died_on: None,
            hospital_days: None,
            vaccinated_on: None,
            onset_on: None,
            days_to_onset: None,
            administered_by: None,
            other_meds: None,
            current_illness: None,
            history: None,
            form_version: None,
            allergies: None,
        }
    }
}

/// A MedDRA symptom term and the dictionary version it was coded with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    /// `SYMPTOMn`
    pub term: String,
    /// `SYMPTOMVERSIONn`
    pub version: Option<String>,
}

/// One row of a `VAERSSYMPTOMS` file. A report with more than five symptoms
/// spans several rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomEntry {
    /// `VAERS_ID`
    pub vaers_id: VaersId,
    /// Present symptoms, in column order.
    pub symptoms: Vec<Symptom>,
}

/// One row of a `VAERSVAX` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaxEntry {
    /// `VAERS_ID`
    pub vaers_id: VaersId,
    /// `VAX_TYPE`
    pub vax_type: Option<String>,
    /// `VAX_MANU`
    pub manufacturer: Option<String>,
    /// `VAX_LOT`
    pub lot: Option<String>,
    /// `VAX_DOSE_SERIES`
    pub dose_series: Option<String>,
    /// `VAX_ROUTE`
    pub route: Option<String>,
    /// `VAX_SITE`
    pub site: Option<String>,
    /// `VAX_NAME`
    pub name: Option<String>,
}

impl VaxEntry {
    /// A vaccine row with only the id and name set.
    #[must_use]
    pub fn named(vaers_id: VaersId, name: impl Into<String>) -> Self {
        Self {
            vaers_id,
            vax_type: None,
            manufacturer: None,
            lot: None,
            dose_series: None,
            route: None,
            site: None,
            name: Some(name.into()),
        }
    }
}

/// The three files of one VAERS release, loaded in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaersDataset {
    /// Rows of `VAERSDATA`.
    pub reports: Vec<Report>,
    /// Rows of `VAERSSYMPTOMS`.
    pub symptoms: Vec<SymptomEntry>,
    /// Rows of `VAERSVAX`.
    pub vaccines: Vec<VaxEntry>,
}
