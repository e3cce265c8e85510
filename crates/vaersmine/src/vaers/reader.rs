//! CSV readers for the VAERS files.
//!
//! VAERS releases are ISO-8859-1 encoded, so records are read as bytes and
//! every byte is mapped to the code point of the same value. Empty cells are
//! missing values.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::model::{Outcomes, Report, Symptom, SymptomEntry, VaersId, VaxEntry};
use crate::error::{Error, Result};

/// Date layouts seen in VAERS releases, tried in order.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// Symptom term and version column pairs of a `VAERSSYMPTOMS` file.
const SYMPTOM_COLUMNS: [(&str, &str); 5] = [
    ("SYMPTOM1", "SYMPTOMVERSION1"),
    ("SYMPTOM2", "SYMPTOMVERSION2"),
    ("SYMPTOM3", "SYMPTOMVERSION3"),
    ("SYMPTOM4", "SYMPTOMVERSION4"),
    ("SYMPTOM5", "SYMPTOMVERSION5"),
];

/// Decode ISO-8859-1 bytes.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// An open VAERS CSV file with its header resolved.
struct CsvSource {
    path: PathBuf,
    reader: csv::Reader<File>,
    columns: HashMap<String, usize>,
}

impl CsvSource {
    fn open(path: &Path) -> Result<Self> {
        let csv_err = |source| Error::CsvRead {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(csv_err)?;

        let columns = reader
            .byte_headers()
            .map_err(csv_err)?
            .iter()
            .enumerate()
            .map(|(idx, name)| (decode_latin1(name).trim().to_string(), idx))
            .collect();

        debug!("Opened {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            columns,
        })
    }

    fn required(&self, column: &'static str) -> Result<usize> {
        self.columns
            .get(column)
            .copied()
            .ok_or_else(|| Error::MissingColumn {
                path: self.path.clone(),
                column,
            })
    }

    fn optional(&self, column: &str) -> Option<usize> {
        self.columns.get(column).copied()
    }

    /// Call `f` for every data row. Stops at the first error.
    fn for_each_row(&mut self, mut f: impl FnMut(&Row<'_>) -> Result<()>) -> Result<()> {
        let mut record = csv::ByteRecord::new();
        loop {
            let more = self
                .reader
                .read_byte_record(&mut record)
                .map_err(|source| Error::CsvRead {
                    path: self.path.clone(),
                    source,
                })?;
            if !more {
                return Ok(());
            }
            let row = Row {
                record: &record,
                path: &self.path,
                line: record.position().map_or(0, csv::Position::line),
            };
            f(&row)?;
        }
    }
}

/// A borrowed data row with typed cell accessors.
struct Row<'a> {
    record: &'a csv::ByteRecord,
    path: &'a Path,
    line: u64,
}

impl Row<'_> {
    fn text(&self, idx: Option<usize>) -> Option<String> {
        let raw = self.record.get(idx?)?;
        let value = decode_latin1(raw);
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn invalid(&self, column: &'static str, value: String) -> Error {
        Error::InvalidField {
            path: self.path.to_path_buf(),
            line: self.line,
            column,
            value,
        }
    }

    fn id(&self, idx: usize) -> Result<VaersId> {
        let value = self.text(Some(idx)).unwrap_or_default();
        value
            .parse::<VaersId>()
            .map_err(|_| self.invalid("VAERS_ID", value))
    }

    fn float(&self, idx: Option<usize>, column: &'static str) -> Result<Option<f64>> {
        match self.text(idx) {
            None => Ok(None),
            Some(value) => value
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.invalid(column, value)),
        }
    }

    fn date(&self, idx: Option<usize>, column: &'static str) -> Option<NaiveDate> {
        let value = self.text(idx)?;
        let parsed = parse_date(&value);
        if parsed.is_none() {
            warn!(
                file = %self.path.display(),
                line = self.line,
                column,
                value = %value,
                "Unparseable date treated as missing"
            );
        }
        parsed
    }

    fn flag(&self, idx: Option<usize>) -> bool {
        self.text(idx).is_some_and(|value| value == "Y")
    }
}

/// Column positions of a `VAERSDATA` file.
struct DataColumns {
    vaers_id: usize,
    state: usize,
    age_years: usize,
    sex: usize,
    died: usize,
    life_threatening: usize,
    er_visit: usize,
    hospitalized: usize,
    prolonged_stay: usize,
    disabled: usize,
    recovered: usize,
    birth_defect: usize,
    received: Option<usize>,
    calc_age_years: Option<usize>,
    calc_age_months: Option<usize>,
    symptom_text: Option<usize>,
    died_on: Option<usize>,
    hospital_days: Option<usize>,
    vaccinated_on: Option<usize>,
    onset_on: Option<usize>,
    days_to_onset: Option<usize>,
    administered_by: Option<usize>,
    other_meds: Option<usize>,
    current_illness: Option<usize>,
    history: Option<usize>,
    form_version: Option<usize>,
    allergies: Option<usize>,
}

impl DataColumns {
    fn resolve(source: &CsvSource) -> Result<Self> {
        Ok(Self {
            vaers_id: source.required("VAERS_ID")?,
            state: source.required("STATE")?,
            age_years: source.required("AGE_YRS")?,
            sex: source.required("SEX")?,
            died: source.required("DIED")?,
            life_threatening: source.required("L_THREAT")?,
            er_visit: source.required("ER_VISIT")?,
            hospitalized: source.required("HOSPITAL")?,
            prolonged_stay: source.required("X_STAY")?,
            disabled: source.required("DISABLE")?,
            recovered: source.required("RECOVD")?,
            birth_defect: source.required("BIRTH_DEFECT")?,
            received: source.optional("RECVDATE"),
            calc_age_years: source.optional("CAGE_YR"),
            calc_age_months: source.optional("CAGE_MO"),
            symptom_text: source.optional("SYMPTOM_TEXT"),
            died_on: source.optional("DATEDIED"),
            hospital_days: source.optional("HOSPDAYS"),
            vaccinated_on: source.optional("VAX_DATE"),
            onset_on: source.optional("ONSET_DATE"),
            days_to_onset: source.optional("NUMDAYS"),
            administered_by: source.optional("V_ADMINBY"),
            other_meds: source.optional("OTHER_MEDS"),
            current_illness: source.optional("CUR_ILL"),
            history: source.optional("HISTORY"),
            form_version: source.optional("FORM_VERS"),
            allergies: source.optional("ALLERGIES"),
        })
    }

    fn parse(&self, row: &Row<'_>) -> Result<Report> {
        Ok(Report {
            vaers_id: row.id(self.vaers_id)?,
            received: row.date(self.received, "RECVDATE"),
            state: row.text(Some(self.state)),
            age_years: row.float(Some(self.age_years), "AGE_YRS")?,
            calc_age_years: row.float(self.calc_age_years, "CAGE_YR")?,
            calc_age_months: row.float(self.calc_age_months, "CAGE_MO")?,
            sex: row.text(Some(self.sex)),
            symptom_text: row.text(self.symptom_text),
            outcomes: Outcomes {
                died: row.flag(Some(self.died)),
                life_threatening: row.flag(Some(self.life_threatening)),
                er_visit: row.flag(Some(self.er_visit)),
                hospitalized: row.flag(Some(self.hospitalized)),
                prolonged_stay: row.flag(Some(self.prolonged_stay)),
                disabled: row.flag(Some(self.disabled)),
                recovered: row.flag(Some(self.recovered)),
                birth_defect: row.flag(Some(self.birth_defect)),
            },
            died_on: row.date(self.died_on, "DATEDIED"),
            hospital_days: row.float(self.hospital_days, "HOSPDAYS")?,
            vaccinated_on: row.date(self.vaccinated_on, "VAX_DATE"),
            onset_on: row.date(self.onset_on, "ONSET_DATE"),
            days_to_onset: row.float(self.days_to_onset, "NUMDAYS")?,
            administered_by: row.text(self.administered_by),
            other_meds: row.text(self.other_meds),
            current_illness: row.text(self.current_illness),
            history: row.text(self.history),
            form_version: row.float(self.form_version, "FORM_VERS")?,
            allergies: row.text(self.allergies),
        })
    }
}

/// Read a `VAERSDATA` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a required column is
/// missing, or an id or numeric cell does not parse.
pub fn read_data_file(path: impl AsRef<Path>) -> Result<Vec<Report>> {
    let mut source = CsvSource::open(path.as_ref())?;
    let columns = DataColumns::resolve(&source)?;

    let mut reports = Vec::new();
    source.for_each_row(|row| {
        reports.push(columns.parse(row)?);
        Ok(())
    })?;

    debug!("Read {} reports from {}", reports.len(), source.path.display());
    Ok(reports)
}

/// Read a `VAERSSYMPTOMS` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a symptom column is
/// missing, or an id does not parse.
pub fn read_symptoms_file(path: impl AsRef<Path>) -> Result<Vec<SymptomEntry>> {
    let mut source = CsvSource::open(path.as_ref())?;
    let id_col = source.required("VAERS_ID")?;
    let symptom_cols = SYMPTOM_COLUMNS
        .iter()
        .map(|&(term, version)| -> Result<(usize, Option<usize>)> {
            Ok((source.required(term)?, source.optional(version)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut entries = Vec::new();
    source.for_each_row(|row| {
        let symptoms = symptom_cols
            .iter()
            .filter_map(|&(term_idx, version_idx)| {
                row.text(Some(term_idx)).map(|term| Symptom {
                    term,
                    version: row.text(version_idx),
                })
            })
            .collect();
        entries.push(SymptomEntry {
            vaers_id: row.id(id_col)?,
            symptoms,
        });
        Ok(())
    })?;

    debug!(
        "Read {} symptom rows from {}",
        entries.len(),
        source.path.display()
    );
    Ok(entries)
}

/// Read a `VAERSVAX` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, `VAERS_ID` or `VAX_NAME` is
/// missing, or an id does not parse.
pub fn read_vax_file(path: impl AsRef<Path>) -> Result<Vec<VaxEntry>> {
    let mut source = CsvSource::open(path.as_ref())?;
    let id_col = source.required("VAERS_ID")?;
    let name_col = source.required("VAX_NAME")?;
    let type_col = source.optional("VAX_TYPE");
    let manu_col = source.optional("VAX_MANU");
    let lot_col = source.optional("VAX_LOT");
    let dose_col = source.optional("VAX_DOSE_SERIES");
    let route_col = source.optional("VAX_ROUTE");
    let site_col = source.optional("VAX_SITE");

    let mut entries = Vec::new();
    source.for_each_row(|row| {
        entries.push(VaxEntry {
            vaers_id: row.id(id_col)?,
            vax_type: row.text(type_col),
            manufacturer: row.text(manu_col),
            lot: row.text(lot_col),
            dose_series: row.text(dose_col),
            route: row.text(route_col),
            site: row.text(site_col),
            name: row.text(Some(name_col)),
        });
        Ok(())
    })?;

    debug!(
        "Read {} vaccine rows from {}",
        entries.len(),
        source.path.display()
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DATA_HEADER: &str = "VAERS_ID,RECVDATE,STATE,AGE_YRS,CAGE_YR,CAGE_MO,SEX,RPT_DATE,SYMPTOM_TEXT,DIED,DATEDIED,L_THREAT,ER_VISIT,HOSPITAL,HOSPDAYS,X_STAY,DISABLE,RECOVD,VAX_DATE,ONSET_DATE,NUMDAYS,LAB_DATA,V_ADMINBY,V_FUNDBY,OTHER_MEDS,CUR_ILL,HISTORY,PRIOR_VAX,SPLTTYPE,FORM_VERS,TODAYS_DATE,BIRTH_DEFECT,OFC_VISIT,ER_ED_VISIT,ALLERGIES";

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_latin1(b"caf\xe9"), "café");
        assert_eq!(decode_latin1(b"plain"), "plain");
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("01/02/2021"), NaiveDate::from_ymd_opt(2021, 1, 2));
        assert_eq!(parse_date("2021-01-02"), NaiveDate::from_ymd_opt(2021, 1, 2));
        assert_eq!(parse_date("13/45/2021"), None);
    }

    #[test]
    fn test_read_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{DATA_HEADER}\n\
             916600,01/01/2021,TX,33.0,33,,F,,Right side of epiglottis swelled,,,,,,,,,Y,12/28/2020,12/30/2020,2.0,,PVT,,None,None,None,,,2,01/01/2021,,,Y,Pcn and bee venom\n\
             916601,01/01/2021,CA,73.0,73,,M,,Approximately 30 min post vaccination,Y,01/05/2021,Y,,Y,3,,,N,12/31/2020,12/31/2020,0.0,,SEN,,,,,,,2,01/01/2021,,,,\n"
        );
        let path = write_file(&dir, "2021VAERSDATA.csv", body.as_bytes());

        let reports = read_data_file(&path).unwrap();
        assert_eq!(reports.len(), 2);

        let first = &reports[0];
        assert_eq!(first.vaers_id, 916_600);
        assert_eq!(first.state.as_deref(), Some("TX"));
        assert_eq!(first.age_years, Some(33.0));
        assert_eq!(first.sex.as_deref(), Some("F"));
        assert!(first.outcomes.recovered);
        assert!(!first.outcomes.died);
        assert_eq!(first.received, NaiveDate::from_ymd_opt(2021, 1, 1));
        assert_eq!(first.days_to_onset, Some(2.0));
        assert_eq!(first.allergies.as_deref(), Some("Pcn and bee venom"));

        let second = &reports[1];
        assert!(second.outcomes.died);
        assert!(second.outcomes.life_threatening);
        assert!(second.outcomes.hospitalized);
        assert!(!second.outcomes.recovered);
        assert_eq!(second.hospital_days, Some(3.0));
        assert_eq!(second.died_on, NaiveDate::from_ymd_opt(2021, 1, 5));
    }

    #[test]
    fn test_read_data_file_latin1_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = format!("{DATA_HEADER}\n").into_bytes();
        body.extend_from_slice(b"1,,PR,40,,,F,,fi\xe8vre,,,,,,,,,,,,,,,,,,,,,,,,,,\n");
        let path = write_file(&dir, "data.csv", &body);

        let reports = read_data_file(&path).unwrap();
        assert_eq!(reports[0].symptom_text.as_deref(), Some("fièvre"));
    }

    #[test]
    fn test_read_data_file_trims_cells() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{DATA_HEADER}\n\
             1,,TX ,40,,,F,,,,,,,,,,,,,,,,,,,,,,,,,,,,\n\
             2,, TX,40,,,F ,,,,,,,,,,,,,,,,,,,,,,,,,,,,\n\
             3,,   ,40,,,F,,,,,,,,,,,,,,,,,,,,,,,,,,,,\n"
        );
        let path = write_file(&dir, "data.csv", body.as_bytes());

        let reports = read_data_file(&path).unwrap();
        assert_eq!(reports[0].state.as_deref(), Some("TX"));
        assert_eq!(reports[1].state.as_deref(), Some("TX"));
        assert_eq!(reports[1].sex.as_deref(), Some("F"));
        assert_eq!(reports[2].state, None);
    }

    #[test]
    fn test_read_data_file_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "data.csv", b"VAERS_ID,STATE\n1,TX\n");

        let err = read_data_file(&path).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { column: "AGE_YRS", .. }));
    }

    #[test]
    fn test_read_data_file_invalid_age() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{DATA_HEADER}\n1,,TX,old,,,F,,,,,,,,,,,,,,,,,,,,,,,,,,,,\n");
        let path = write_file(&dir, "data.csv", body.as_bytes());

        let err = read_data_file(&path).unwrap_err();
        match err {
            Error::InvalidField {
                line,
                column,
                value,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(column, "AGE_YRS");
                assert_eq!(value, "old");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_data_file_bad_date_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{DATA_HEADER}\n1,someday,TX,,,,F,,,,,,,,,,,,,,,,,,,,,,,,,,,,\n");
        let path = write_file(&dir, "data.csv", body.as_bytes());

        let reports = read_data_file(&path).unwrap();
        assert!(reports[0].received.is_none());
    }

    #[test]
    fn test_read_symptoms_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "symptoms.csv",
            b"VAERS_ID,SYMPTOM1,SYMPTOMVERSION1,SYMPTOM2,SYMPTOMVERSION2,SYMPTOM3,SYMPTOMVERSION3,SYMPTOM4,SYMPTOMVERSION4,SYMPTOM5,SYMPTOMVERSION5\n\
              916600,Dysphagia,23.1,Epiglottitis,23.1,,,,,,\n\
              916601,Anxiety,23.1,Dyspnoea,23.1,,,,,,\n",
        );

        let entries = read_symptoms_file(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].vaers_id, 916_600);
        assert_eq!(entries[0].symptoms.len(), 2);
        assert_eq!(entries[0].symptoms[1].term, "Epiglottitis");
        assert_eq!(entries[0].symptoms[1].version.as_deref(), Some("23.1"));
    }

    #[test]
    fn test_read_vax_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "vax.csv",
            b"VAERS_ID,VAX_TYPE,VAX_MANU,VAX_LOT,VAX_DOSE_SERIES,VAX_ROUTE,VAX_SITE,VAX_NAME\n\
              916600,COVID19,MODERNA,037K20A,1,IM,LA,COVID19 (COVID19 (MODERNA))\n",
        );

        let entries = read_vax_file(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].manufacturer.as_deref(), Some("MODERNA"));
        assert_eq!(entries[0].name.as_deref(), Some("COVID19 (COVID19 (MODERNA))"));
    }

    #[test]
    fn test_read_vax_file_invalid_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "vax.csv", b"VAERS_ID,VAX_NAME\nabc,FLU\n");

        let err = read_vax_file(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidField { column: "VAERS_ID", .. }));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_vax_file("/nonexistent/2021VAERSVAX.csv").unwrap_err();
        assert!(err.is_input_error());
    }
}
