//! Per-draw incidence probabilities for each AE.

use serde::Serialize;

use super::graph::GroupCell;
use super::likelihood::logistic_stable;
use super::posterior::{ParameterFamily, ParameterKey, PosteriorSampleTable};
use super::report::ensure_unique_labels;
use super::types::HierarchyError;
use crate::input::{AeDataset, AeRecord};

/// One AE's probability draws, one value per posterior draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityRow {
    #[serde(rename = "SoC")]
    pub soc: String,
    #[serde(rename = "PT")]
    pub pt: String,
    pub draws: Vec<f64>,
}

/// One probability table: a row per AE, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbabilityTable {
    pub rows: Vec<ProbabilityRow>,
}

impl ProbabilityTable {
    #[must_use]
    pub fn rows(&self) -> &[ProbabilityRow] {
        &self.rows
    }

    #[must_use]
    pub fn find(&self, soc: &str, pt: &str) -> Option<&ProbabilityRow> {
        self.rows.iter().find(|row| row.soc == soc && row.pt == pt)
    }
}

/// Treatment (`pit`) and control (`pic`) incidence draws.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncidenceDraws {
    pub pit: ProbabilityTable,
    pub pic: ProbabilityTable,
}

/// Transform `gamma`/`theta` draws into incidence probabilities.
///
/// `pic = logistic(gamma)` and `pit = logistic(gamma + theta)` per draw.
///
/// # Errors
///
/// Returns `HierarchyError::JoinAmbiguity` for a repeated `(SOC, PT)` pair and
/// `HierarchyError::MissingColumn` for the first AE whose `gamma` or `theta`
/// column is absent; no partial tables are returned.
pub fn extract_probabilities(
    data: &AeDataset,
    posterior: &PosteriorSampleTable,
) -> Result<IncidenceDraws, HierarchyError> {
    ensure_unique_labels(data)?;

    let mut pit = Vec::with_capacity(data.len());
    let mut pic = Vec::with_capacity(data.len());
    for record in data.records() {
        let gamma = required_column(posterior, record, ParameterFamily::Gamma)?;
        let theta = required_column(posterior, record, ParameterFamily::Theta)?;

        let control = gamma.iter().map(|value| logistic_stable(*value)).collect();
        let treatment = gamma
            .iter()
            .zip(&theta)
            .map(|(gamma, theta)| logistic_stable(gamma + theta))
            .collect();

        pic.push(row(record, control));
        pit.push(row(record, treatment));
    }

    Ok(IncidenceDraws {
        pit: ProbabilityTable { rows: pit },
        pic: ProbabilityTable { rows: pic },
    })
}

fn required_column(
    posterior: &PosteriorSampleTable,
    record: &AeRecord,
    family: ParameterFamily,
) -> Result<Vec<f64>, HierarchyError> {
    let key = ParameterKey::new(family, GroupCell::new(record.soc_index, record.pt_index));
    posterior
        .column(&key)
        .ok_or_else(|| HierarchyError::MissingColumn {
            soc: record.soc_label.clone(),
            pt: record.pt_label.clone(),
            column: key.to_string(),
        })
}

fn row(record: &AeRecord, draws: Vec<f64>) -> ProbabilityRow {
    ProbabilityRow {
        soc: record.soc_label.clone(),
        pt: record.pt_label.clone(),
        draws,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn dataset() -> AeDataset {
        AeDataset::new(vec![
            AeRecord::new(1, 1, 80, 80, 4, 8, "Hepatic", "ALT increased"),
            AeRecord::new(1, 1, 80, 80, 4, 8, "Hepatic", "AST increased"),
        ])
        .expect("records should be valid")
    }

    fn gamma_theta_table(gamma: &[f64], theta: &[f64]) -> PosteriorSampleTable {
        let cell = GroupCell::new(1, 1);
        let mut table = PosteriorSampleTable::new(vec![
            ParameterKey::new(ParameterFamily::Gamma, cell),
            ParameterKey::new(ParameterFamily::Theta, cell),
        ]);
        for (gamma, theta) in gamma.iter().zip(theta) {
            table.push_draw(vec![*gamma, *theta]);
        }
        table
    }

    #[test]
    fn probabilities_follow_logistic_transform() {
        let table = gamma_theta_table(&[0.0, -2.0], &[0.0, 1.0]);
        let draws = extract_probabilities(&dataset(), &table).expect("columns exist");

        let control = &draws.pic.rows()[0].draws;
        let treatment = &draws.pit.rows()[0].draws;
        assert_relative_eq!(control[0], 0.5);
        assert_relative_eq!(treatment[0], 0.5);
        assert_relative_eq!(control[1], logistic_stable(-2.0));
        assert_relative_eq!(treatment[1], logistic_stable(-1.0));
    }

    #[test]
    fn shared_cells_yield_identical_rows() {
        let table = gamma_theta_table(&[-1.0, -1.5, -0.5], &[0.2, 0.0, 0.4]);
        let draws = extract_probabilities(&dataset(), &table).expect("columns exist");

        assert_eq!(draws.pit.rows().len(), 2);
        let alt = draws.pit.find("Hepatic", "ALT increased").expect("ALT row");
        let ast = draws.pit.find("Hepatic", "AST increased").expect("AST row");
        assert_eq!(alt.draws, ast.draws);
        assert_eq!(alt.draws.len(), 3);
    }

    #[test]
    fn missing_theta_fails_whole_extraction() {
        let cell = GroupCell::new(1, 1);
        let mut table =
            PosteriorSampleTable::new(vec![ParameterKey::new(ParameterFamily::Gamma, cell)]);
        table.push_draw(vec![0.0]);

        let error = extract_probabilities(&dataset(), &table).expect_err("theta is absent");
        match error {
            HierarchyError::MissingColumn { pt, column, .. } => {
                assert_eq!(pt, "ALT increased");
                assert_eq!(column, "theta.1.1.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
