//! # Model inputs
//!
//! Per-AE aggregated counts as produced by the upstream reshaping step, and the
//! dataset container that validates them before any model is bound.
//!
//! # Examples
//!
//! ```
//! use ae_hierarchical_models::{AeDataset, AeRecord};
//!
//! let records = vec![
//!     AeRecord::new(1, 1, 100, 100, 5, 10, "Nervous system disorders", "Headache"),
//!     AeRecord::new(1, 2, 100, 100, 2, 3, "Nervous system disorders", "Dizziness"),
//! ];
//! let dataset = AeDataset::new(records).expect("records should be valid");
//! assert_eq!(dataset.len(), 2);
//! assert_eq!(dataset.soc_count(), 1);
//! ```
//!
//! ```
//! use ae_hierarchical_models::{AeDataset, AeRecord};
//!
//! // More events than enrolled patients.
//! let records = vec![AeRecord::new(1, 1, 10, 10, 11, 0, "SOC", "PT")];
//! assert!(AeDataset::new(records).is_err());
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned when validating AE-level inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AeInputError {
    #[error("AE dataset must contain at least one record")]
    Empty,
    #[error("record {row}: SOC index (b) and PT index (j) are 1-based; found b={soc_index}, j={pt_index}")]
    ZeroGroupIndex {
        row: usize,
        soc_index: usize,
        pt_index: usize,
    },
    #[error("record {row}: arm sizes must be positive (Nc={n_control}, Nt={n_treatment})")]
    EmptyArm {
        row: usize,
        n_control: u32,
        n_treatment: u32,
    },
    #[error("record {row}: AE count {events} exceeds arm size {enrolled} in the {arm} arm")]
    CountExceedsEnrollment {
        row: usize,
        arm: &'static str,
        events: u32,
        enrolled: u32,
    },
    #[error(
        "record {row}: arm sizes (Nc={n_control}, Nt={n_treatment}) differ from the first record (Nc={expected_control}, Nt={expected_treatment})"
    )]
    InconsistentArmSizes {
        row: usize,
        n_control: u32,
        n_treatment: u32,
        expected_control: u32,
        expected_treatment: u32,
    },
    #[error("SOC indices must be dense from 1; index {missing} is absent (max {max})")]
    SparseSocIndex { missing: usize, max: usize },
    #[error("record {row}: SOC index {soc_index} is labelled '{found}' but earlier records use '{expected}'")]
    InconsistentSocLabel {
        row: usize,
        soc_index: usize,
        expected: String,
        found: String,
    },
}

/// One AE's aggregated counts and group identity.
///
/// Serialized field names follow the external table layout (`SoC, PT, Nt, Nc, AEt, AEc, b, j`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AeRecord {
    /// System-organ-class group index `b` (1-based).
    #[serde(rename = "b")]
    pub soc_index: usize,
    /// Preferred-term group index `j` (1-based).
    #[serde(rename = "j")]
    pub pt_index: usize,
    #[serde(rename = "Nc")]
    pub n_control: u32,
    #[serde(rename = "Nt")]
    pub n_treatment: u32,
    #[serde(rename = "AEc")]
    pub ae_control: u32,
    #[serde(rename = "AEt")]
    pub ae_treatment: u32,
    #[serde(rename = "SoC")]
    pub soc_label: String,
    #[serde(rename = "PT")]
    pub pt_label: String,
}

impl AeRecord {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        soc_index: usize,
        pt_index: usize,
        n_control: u32,
        n_treatment: u32,
        ae_control: u32,
        ae_treatment: u32,
        soc_label: impl Into<String>,
        pt_label: impl Into<String>,
    ) -> Self {
        Self {
            soc_index,
            pt_index,
            n_control,
            n_treatment,
            ae_control,
            ae_treatment,
            soc_label: soc_label.into(),
            pt_label: pt_label.into(),
        }
    }

    /// `(b, j)` group pair.
    #[must_use]
    pub const fn group(&self) -> (usize, usize) {
        (self.soc_index, self.pt_index)
    }
}

/// Validated, immutable collection of AE records.
#[derive(Debug, Clone)]
pub struct AeDataset {
    records: Vec<AeRecord>,
    soc_count: usize,
}

impl AeDataset {
    /// # Errors
    ///
    /// Returns `AeInputError` if any record is malformed or the records disagree
    /// on arm sizes or SOC labelling.
    pub fn new(records: Vec<AeRecord>) -> Result<Self, AeInputError> {
        let soc_count = validate_records(&records)?;
        Ok(Self { records, soc_count })
    }

    #[must_use]
    pub fn records(&self) -> &[AeRecord] {
        &self.records
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of SOC groups `B`.
    #[must_use]
    pub const fn soc_count(&self) -> usize {
        self.soc_count
    }

    /// Control-arm size shared by every record.
    #[must_use]
    pub fn n_control(&self) -> u32 {
        self.records.first().map_or(0, |record| record.n_control)
    }

    /// Treatment-arm size shared by every record.
    #[must_use]
    pub fn n_treatment(&self) -> u32 {
        self.records.first().map_or(0, |record| record.n_treatment)
    }
}

fn validate_records(records: &[AeRecord]) -> Result<usize, AeInputError> {
    let first = records.first().ok_or(AeInputError::Empty)?;
    let mut soc_labels: BTreeMap<usize, &str> = BTreeMap::new();

    for (row, record) in records.iter().enumerate() {
        if record.soc_index == 0 || record.pt_index == 0 {
            return Err(AeInputError::ZeroGroupIndex {
                row,
                soc_index: record.soc_index,
                pt_index: record.pt_index,
            });
        }
        if record.n_control == 0 || record.n_treatment == 0 {
            return Err(AeInputError::EmptyArm {
                row,
                n_control: record.n_control,
                n_treatment: record.n_treatment,
            });
        }
        if record.n_control != first.n_control || record.n_treatment != first.n_treatment {
            return Err(AeInputError::InconsistentArmSizes {
                row,
                n_control: record.n_control,
                n_treatment: record.n_treatment,
                expected_control: first.n_control,
                expected_treatment: first.n_treatment,
            });
        }
        if record.ae_control > record.n_control {
            return Err(AeInputError::CountExceedsEnrollment {
                row,
                arm: "control",
                events: record.ae_control,
                enrolled: record.n_control,
            });
        }
        if record.ae_treatment > record.n_treatment {
            return Err(AeInputError::CountExceedsEnrollment {
                row,
                arm: "treatment",
                events: record.ae_treatment,
                enrolled: record.n_treatment,
            });
        }

        let label = soc_labels
            .entry(record.soc_index)
            .or_insert(record.soc_label.as_str());
        if *label != record.soc_label {
            return Err(AeInputError::InconsistentSocLabel {
                row,
                soc_index: record.soc_index,
                expected: (*label).to_owned(),
                found: record.soc_label.clone(),
            });
        }
    }

    let soc_indices: BTreeSet<usize> = soc_labels.keys().copied().collect();
    let max = soc_indices.last().copied().unwrap_or(0);
    if let Some(missing) = (1..=max).find(|index| !soc_indices.contains(index)) {
        return Err(AeInputError::SparseSocIndex { missing, max });
    }

    Ok(max)
}
