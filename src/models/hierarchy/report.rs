//! Per-AE summary table: `Diff` and `OR` posterior summaries joined onto the raw counts.

use std::collections::{HashMap, HashSet};

use comfy_table::{
    Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED,
};
use serde::{Deserialize, Serialize};

use super::graph::GroupCell;
use super::posterior::{ParameterFamily, ParameterKey, PosteriorSampleTable};
use super::summary::{SummaryStats, summarize};
use super::types::HierarchyError;
use crate::input::{AeDataset, AeRecord};

/// Value of the `Method` column for every row.
pub const METHOD_LABEL: &str = "Bayesian Hierarchical Model";

/// One AE row of the summary report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeSummaryRow {
    #[serde(rename = "SoC")]
    pub soc: String,
    #[serde(rename = "PT")]
    pub pt: String,
    #[serde(rename = "Nt")]
    pub n_treatment: u32,
    #[serde(rename = "Nc")]
    pub n_control: u32,
    #[serde(rename = "AEt")]
    pub ae_treatment: u32,
    #[serde(rename = "AEc")]
    pub ae_control: u32,
    #[serde(rename = "Diff_mean")]
    pub diff_mean: f64,
    #[serde(rename = "Diff_2.5%")]
    pub diff_lower: f64,
    #[serde(rename = "Diff_97.5%")]
    pub diff_upper: f64,
    #[serde(rename = "OR_mean")]
    pub or_mean: f64,
    #[serde(rename = "OR_2.5%")]
    pub or_lower: f64,
    #[serde(rename = "OR_97.5%")]
    pub or_upper: f64,
    #[serde(rename = "Method")]
    pub method: String,
}

impl AeSummaryRow {
    fn new(record: &AeRecord, diff: SummaryStats, odds_ratio: SummaryStats) -> Self {
        Self {
            soc: record.soc_label.clone(),
            pt: record.pt_label.clone(),
            n_treatment: record.n_treatment,
            n_control: record.n_control,
            ae_treatment: record.ae_treatment,
            ae_control: record.ae_control,
            diff_mean: diff.mean,
            diff_lower: diff.p2_5,
            diff_upper: diff.p97_5,
            or_mean: odds_ratio.mean,
            or_lower: odds_ratio.p2_5,
            or_upper: odds_ratio.p97_5,
            method: METHOD_LABEL.to_owned(),
        }
    }

    /// Whether the 95% interval of the odds ratio excludes 1.
    #[must_use]
    pub fn odds_ratio_excludes_one(&self) -> bool {
        self.or_lower > 1.0 || self.or_upper < 1.0
    }
}

/// Summary rows sorted by SOC, then PT.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AeSummaryReport {
    pub rows: Vec<AeSummaryRow>,
}

impl AeSummaryReport {
    #[must_use]
    pub fn rows(&self) -> &[AeSummaryRow] {
        &self.rows
    }

    #[must_use]
    pub fn find(&self, soc: &str, pt: &str) -> Option<&AeSummaryRow> {
        self.rows.iter().find(|row| row.soc == soc && row.pt == pt)
    }
}

/// Build the per-AE report from pooled posterior draws.
///
/// Every record yields one row. Records sharing a `(b, j)` cell read the same
/// columns and so carry identical summaries.
///
/// # Errors
///
/// Returns `HierarchyError::JoinAmbiguity` if a `(SOC, PT)` label pair occurs twice and
/// `HierarchyError::MissingColumn` if a record's `Diff` or `OR` column is absent.
pub fn build_report(
    data: &AeDataset,
    posterior: &PosteriorSampleTable,
) -> Result<AeSummaryReport, HierarchyError> {
    ensure_unique_labels(data)?;

    let summaries: HashMap<ParameterKey, SummaryStats> =
        [ParameterFamily::Diff, ParameterFamily::OddsRatio]
            .into_iter()
            .flat_map(|family| posterior.family_columns(family))
            .filter_map(|key| posterior.column(&key).map(|column| (key, summarize(&column))))
            .collect();

    let lookup = |record: &AeRecord, family: ParameterFamily| {
        let key = ParameterKey::new(family, GroupCell::new(record.soc_index, record.pt_index));
        summaries
            .get(&key)
            .copied()
            .ok_or_else(|| HierarchyError::MissingColumn {
                soc: record.soc_label.clone(),
                pt: record.pt_label.clone(),
                column: key.to_string(),
            })
    };

    let mut rows = data
        .records()
        .iter()
        .map(|record| {
            let diff = lookup(record, ParameterFamily::Diff)?;
            let odds_ratio = lookup(record, ParameterFamily::OddsRatio)?;
            Ok(AeSummaryRow::new(record, diff, odds_ratio))
        })
        .collect::<Result<Vec<_>, HierarchyError>>()?;
    rows.sort_by(|left, right| left.soc.cmp(&right.soc).then_with(|| left.pt.cmp(&right.pt)));

    Ok(AeSummaryReport { rows })
}

pub(crate) fn ensure_unique_labels(data: &AeDataset) -> Result<(), HierarchyError> {
    let mut seen = HashSet::with_capacity(data.len());
    for record in data.records() {
        if !seen.insert((record.soc_label.as_str(), record.pt_label.as_str())) {
            return Err(HierarchyError::JoinAmbiguity {
                soc: record.soc_label.clone(),
                pt: record.pt_label.clone(),
            });
        }
    }
    Ok(())
}

/// Render the report as a terminal table.
///
/// Rows whose odds-ratio interval excludes 1 are highlighted.
#[must_use]
pub fn render_report(report: &AeSummaryReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            [
                "SoC",
                "PT",
                "Nt",
                "Nc",
                "AEt",
                "AEc",
                "Diff_mean",
                "Diff_2.5%",
                "Diff_97.5%",
                "OR_mean",
                "OR_2.5%",
                "OR_97.5%",
                "Method",
            ]
            .into_iter()
            .map(Cell::new)
            .collect::<Vec<_>>(),
        );

    for row in &report.rows {
        let signal = row.odds_ratio_excludes_one();
        table.add_row(vec![
            Cell::new(&row.soc),
            Cell::new(&row.pt),
            Cell::new(row.n_treatment),
            Cell::new(row.n_control),
            Cell::new(row.ae_treatment),
            Cell::new(row.ae_control),
            Cell::new(format!("{:.4}", row.diff_mean)),
            Cell::new(format!("{:.4}", row.diff_lower)),
            Cell::new(format!("{:.4}", row.diff_upper)),
            highlight_cell(row.or_mean, signal),
            highlight_cell(row.or_lower, signal),
            highlight_cell(row.or_upper, signal),
            Cell::new(&row.method),
        ]);
    }

    table.to_string()
}

fn highlight_cell(value: f64, highlight: bool) -> Cell {
    let cell = Cell::new(format!("{value:.3}"));
    if highlight {
        cell.fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        cell
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn dataset() -> AeDataset {
        AeDataset::new(vec![
            AeRecord::new(2, 1, 100, 100, 1, 2, "Skin", "Rash"),
            AeRecord::new(1, 2, 100, 100, 3, 9, "Cardiac", "Tachycardia"),
            AeRecord::new(1, 1, 100, 100, 2, 2, "Cardiac", "Bradycardia"),
        ])
        .expect("records should be valid")
    }

    fn posterior(data: &AeDataset, draws: usize) -> PosteriorSampleTable {
        let cells: Vec<GroupCell> = data
            .records()
            .iter()
            .map(|record| GroupCell::new(record.soc_index, record.pt_index))
            .collect();
        let columns: Vec<ParameterKey> = [ParameterFamily::Diff, ParameterFamily::OddsRatio]
            .into_iter()
            .flat_map(|family| cells.iter().map(move |cell| ParameterKey::new(family, *cell)))
            .collect();
        let mut table = PosteriorSampleTable::new(columns);
        for draw in 0..draws {
            let offset = f64::from(u32::try_from(draw).expect("small draw count"));
            let mut values: Vec<f64> = cells
                .iter()
                .map(|cell| f64::from(u32::try_from(cell.pt).expect("small index")) * 0.01)
                .collect();
            values.extend(cells.iter().map(|_| 1.0 + offset));
            table.push_draw(values);
        }
        table
    }

    #[test]
    fn report_has_one_sorted_row_per_ae() {
        let data = dataset();
        let report = build_report(&data, &posterior(&data, 5)).expect("report builds");

        let keys: Vec<(&str, &str)> = report
            .rows()
            .iter()
            .map(|row| (row.soc.as_str(), row.pt.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Cardiac", "Bradycardia"),
                ("Cardiac", "Tachycardia"),
                ("Skin", "Rash")
            ]
        );

        let rash = report.find("Skin", "Rash").expect("rash row");
        assert_relative_eq!(rash.diff_mean, 0.01, epsilon = 1.0e-12);
        assert_relative_eq!(rash.or_mean, 3.0, epsilon = 1.0e-12);
        assert_relative_eq!(rash.or_lower, 1.1, epsilon = 1.0e-12);
        assert_eq!(rash.ae_treatment, 2);
        assert_eq!(rash.method, METHOD_LABEL);
    }

    #[test]
    fn duplicate_labels_fail_before_joining() {
        let data = AeDataset::new(vec![
            AeRecord::new(1, 1, 100, 100, 1, 2, "Skin", "Rash"),
            AeRecord::new(1, 2, 100, 100, 1, 2, "Skin", "Rash"),
        ])
        .expect("records should be valid");
        let error = build_report(&data, &posterior(&data, 3)).expect_err("labels repeat");
        assert!(matches!(error, HierarchyError::JoinAmbiguity { .. }));
    }

    #[test]
    fn missing_column_names_the_ae() {
        let data = dataset();
        let columns = vec![ParameterKey::new(ParameterFamily::Diff, GroupCell::new(1, 1))];
        let mut table = PosteriorSampleTable::new(columns);
        table.push_draw(vec![0.0]);

        let error = build_report(&data, &table).expect_err("OR columns are absent");
        match error {
            HierarchyError::MissingColumn { soc, pt, column } => {
                assert_eq!((soc.as_str(), pt.as_str()), ("Skin", "Rash"));
                assert_eq!(column, "Diff.2.1.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rows_serialize_with_external_column_names() {
        let data = dataset();
        let report = build_report(&data, &posterior(&data, 2)).expect("report builds");
        let json = serde_json::to_value(&report.rows()[0]).expect("row serializes");

        assert_eq!(json["SoC"], "Cardiac");
        assert!(json.get("Diff_2.5%").is_some());
        assert!(json.get("OR_97.5%").is_some());
        assert_eq!(json["Method"], METHOD_LABEL);
    }

    #[test]
    fn rendered_table_lists_every_ae() {
        let data = dataset();
        let report = build_report(&data, &posterior(&data, 4)).expect("report builds");
        let rendered = render_report(&report);

        assert!(rendered.contains("Diff_mean"));
        assert!(rendered.contains("Tachycardia"));
        assert!(rendered.contains("Rash"));
    }
}
