//! Loading of VAERS releases.
//!
//! A VAERS release for one year is three CSV files sharing the `VAERS_ID`
//! key:
//!
//! - `<year>VAERSDATA.csv`: one row per report (demographics, outcomes).
//! - `<year>VAERSSYMPTOMS.csv`: up to five MedDRA symptom terms per row.
//! - `<year>VAERSVAX.csv`: one row per vaccine administered.
//!
//! # Example
//!
//! ```no_run
//! use vaersmine::vaers::{merge, read_dataset, InputPaths};
//!
//! let paths = InputPaths::for_year("data", 2021);
//! let dataset = read_dataset(&paths)?;
//! let rows = merge(&dataset);
//! println!("{} joined rows", rows.len());
//! # Ok::<(), vaersmine::Error>(())
//! ```

mod merge;
mod model;
mod reader;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

pub use merge::{merge, MergedReport};
pub use model::{Outcomes, Report, Symptom, SymptomEntry, VaersDataset, VaersId, VaxEntry};
pub use reader::{decode_latin1, read_data_file, read_symptoms_file, read_vax_file};

use crate::error::Result;

/// Locations of the three files of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPaths {
    /// `VAERSDATA` file.
    pub data: PathBuf,
    /// `VAERSSYMPTOMS` file.
    pub symptoms: PathBuf,
    /// `VAERSVAX` file.
    pub vax: PathBuf,
}

impl InputPaths {
    /// The conventional file names of a release inside `dir`.
    #[must_use]
    pub fn for_year(dir: impl AsRef<Path>, year: u16) -> Self {
        let dir = dir.as_ref();
        Self {
            data: dir.join(format!("{year}VAERSDATA.csv")),
            symptoms: dir.join(format!("{year}VAERSSYMPTOMS.csv")),
            vax: dir.join(format!("{year}VAERSVAX.csv")),
        }
    }

    /// The three paths in data, symptoms, vax order.
    #[must_use]
    pub fn all(&self) -> [&Path; 3] {
        [
            self.data.as_path(),
            self.symptoms.as_path(),
            self.vax.as_path(),
        ]
    }
}

/// Read all three files of a release.
///
/// # Errors
///
/// Returns the first read or parse error among the three files.
pub fn read_dataset(paths: &InputPaths) -> Result<VaersDataset> {
    info!("Reading {}", paths.data.display());
    let reports = read_data_file(&paths.data)?;
    info!("Reading {}", paths.symptoms.display());
    let symptoms = read_symptoms_file(&paths.symptoms)?;
    info!("Reading {}", paths.vax.display());
    let vaccines = read_vax_file(&paths.vax)?;

    Ok(VaersDataset {
        reports,
        symptoms,
        vaccines,
    })
}
