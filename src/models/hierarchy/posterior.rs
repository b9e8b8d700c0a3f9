//! Posterior sample storage keyed by typed `(parameter, b, j)` columns.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::graph::GroupCell;
use super::types::HierarchyError;

/// Tracked parameter families.
///
/// Declaration order is the column-emission order: `Diff`, `OR`, `gamma`, `theta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterFamily {
    /// Incidence difference `t[b,j] - c[b,j]`.
    Diff,
    /// Odds ratio `exp(theta[b,j])`.
    OddsRatio,
    /// Control-arm log-odds `gamma[b,j]`.
    Gamma,
    /// Realized log odds ratio `theta[b,j]`.
    Theta,
}

impl ParameterFamily {
    pub const ALL: [Self; 4] = [Self::Diff, Self::OddsRatio, Self::Gamma, Self::Theta];

    /// Node name as used in column names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Diff => "Diff",
            Self::OddsRatio => "OR",
            Self::Gamma => "gamma",
            Self::Theta => "theta",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.name() == name)
    }
}

/// A posterior column: one parameter family at one group cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterKey {
    pub family: ParameterFamily,
    pub cell: GroupCell,
}

impl ParameterKey {
    #[must_use]
    pub const fn new(family: ParameterFamily, cell: GroupCell) -> Self {
        Self { family, cell }
    }
}

/// Renders the flat column name `<param>.<b>.<j>.`, e.g. `gamma.1.3.`.
impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.",
            self.family.name(),
            self.cell.soc,
            self.cell.pt
        )
    }
}

/// Failure to parse a flat column name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{0}' is not a column name of the form <param>.<b>.<j>.")]
pub struct ParseParameterKeyError(pub String);

impl FromStr for ParameterKey {
    type Err = ParseParameterKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseParameterKeyError(value.to_owned());
        let body = value.strip_suffix('.').ok_or_else(invalid)?;
        let mut parts = body.split('.');
        let family = parts
            .next()
            .and_then(ParameterFamily::from_name)
            .ok_or_else(invalid)?;
        let soc = parts
            .next()
            .and_then(|part| part.parse::<usize>().ok())
            .ok_or_else(invalid)?;
        let pt = parts
            .next()
            .and_then(|part| part.parse::<usize>().ok())
            .ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(family, GroupCell::new(soc, pt)))
    }
}

/// Ordered posterior draws over a fixed column set.
///
/// Rows are draws in sampling order; tables from several chains are concatenated
/// in chain order and remember each chain's row count.
#[derive(Debug, Clone, Default)]
pub struct PosteriorSampleTable {
    columns: Vec<ParameterKey>,
    index: HashMap<ParameterKey, usize>,
    draws: Vec<Vec<f64>>,
    chain_lengths: Vec<usize>,
}

impl PosteriorSampleTable {
    /// Empty single-chain table over `columns`.
    #[must_use]
    pub fn new(columns: Vec<ParameterKey>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(position, key)| (*key, position))
            .collect();
        Self {
            columns,
            index,
            draws: Vec::new(),
            chain_lengths: vec![0],
        }
    }

    /// Append one draw to the last chain.
    ///
    /// `values` must be in column order.
    pub(crate) fn push_draw(&mut self, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.draws.push(values);
        if let Some(last) = self.chain_lengths.last_mut() {
            *last += 1;
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.draws.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &[ParameterKey] {
        &self.columns
    }

    /// Flat column names (`<param>.<b>.<j>.`) in column order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(ToString::to_string).collect()
    }

    /// Columns of one family, in emission order.
    pub fn family_columns(
        &self,
        family: ParameterFamily,
    ) -> impl Iterator<Item = ParameterKey> + '_ {
        self.columns
            .iter()
            .copied()
            .filter(move |key| key.family == family)
    }

    #[must_use]
    pub fn column_index(&self, key: &ParameterKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// All draws of one column, or `None` if the column is absent.
    #[must_use]
    pub fn column(&self, key: &ParameterKey) -> Option<Vec<f64>> {
        let position = self.column_index(key)?;
        Some(self.draws.iter().map(|draw| draw[position]).collect())
    }

    /// Draw `row` in column order.
    #[must_use]
    pub fn draw(&self, row: usize) -> &[f64] {
        &self.draws[row]
    }

    /// Row counts per chain, in chain order.
    #[must_use]
    pub fn chain_lengths(&self) -> &[usize] {
        &self.chain_lengths
    }

    #[must_use]
    pub fn chain_count(&self) -> usize {
        self.chain_lengths.len()
    }

    /// Per-chain slices of one column.
    #[must_use]
    pub fn chain_columns(&self, key: &ParameterKey) -> Option<Vec<Vec<f64>>> {
        let position = self.column_index(key)?;
        let mut start = 0;
        let chains = self
            .chain_lengths
            .iter()
            .map(|length| {
                let chain = self.draws[start..start + length]
                    .iter()
                    .map(|draw| draw[position])
                    .collect();
                start += length;
                chain
            })
            .collect();
        Some(chains)
    }

    #[must_use]
    pub fn has_same_columns(&self, other: &Self) -> bool {
        self.columns == other.columns
    }

    /// Concatenate chain tables row-wise in the given order.
    ///
    /// # Errors
    ///
    /// Returns `HierarchyError::EmptyPosterior` for an empty input and
    /// `HierarchyError::SchemaMismatch` naming the first chain whose columns differ
    /// from chain 0.
    pub fn concat(chains: Vec<Self>) -> Result<Self, HierarchyError> {
        let mut chains = chains.into_iter();
        let mut pooled = chains.next().ok_or(HierarchyError::EmptyPosterior)?;
        for (offset, chain) in chains.enumerate() {
            if !pooled.has_same_columns(&chain) {
                return Err(HierarchyError::SchemaMismatch { chain: offset + 1 });
            }
            pooled.draws.extend(chain.draws);
            pooled.chain_lengths.extend(chain.chain_lengths);
        }
        Ok(pooled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(family: ParameterFamily, soc: usize, pt: usize) -> ParameterKey {
        ParameterKey::new(family, GroupCell::new(soc, pt))
    }

    fn table(columns: Vec<ParameterKey>, rows: &[&[f64]]) -> PosteriorSampleTable {
        let mut table = PosteriorSampleTable::new(columns);
        for row in rows {
            table.push_draw(row.to_vec());
        }
        table
    }

    #[test]
    fn column_names_follow_dotted_convention() {
        assert_eq!(key(ParameterFamily::Gamma, 1, 3).to_string(), "gamma.1.3.");
        assert_eq!(key(ParameterFamily::OddsRatio, 2, 10).to_string(), "OR.2.10.");
    }

    #[test]
    fn column_names_parse_back_to_keys() {
        let parsed: ParameterKey = "Diff.4.2.".parse().expect("name should parse");
        assert_eq!(parsed, key(ParameterFamily::Diff, 4, 2));
        assert!("Diff.4.2".parse::<ParameterKey>().is_err());
        assert!("beta.1.1.".parse::<ParameterKey>().is_err());
        assert!("theta.1.1.1.".parse::<ParameterKey>().is_err());
    }

    #[test]
    fn concat_tracks_chain_lengths() {
        let columns = vec![key(ParameterFamily::Gamma, 1, 1)];
        let first = table(columns.clone(), &[&[1.0], &[2.0]]);
        let second = table(columns.clone(), &[&[3.0]]);
        let pooled = PosteriorSampleTable::concat(vec![first, second]).expect("schemas match");

        assert_eq!(pooled.len(), 3);
        assert_eq!(pooled.chain_lengths(), &[2, 1]);
        assert_eq!(pooled.column(&columns[0]), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(
            pooled.chain_columns(&columns[0]),
            Some(vec![vec![1.0, 2.0], vec![3.0]])
        );
    }

    #[test]
    fn concat_rejects_mismatched_columns() {
        let first = table(vec![key(ParameterFamily::Gamma, 1, 1)], &[&[1.0]]);
        let second = table(vec![key(ParameterFamily::Gamma, 1, 2)], &[&[1.0]]);
        let error = PosteriorSampleTable::concat(vec![first, second])
            .expect_err("different columns should fail");
        assert!(matches!(error, HierarchyError::SchemaMismatch { chain: 1 }));
    }

    #[test]
    fn missing_column_lookup_returns_none() {
        let table = table(vec![key(ParameterFamily::Theta, 1, 1)], &[&[0.0]]);
        assert!(table.column(&key(ParameterFamily::Theta, 9, 9)).is_none());
    }
}
