//! Labeled tables.
//!
//! The numeric kernels in this crate are label-agnostic and work on
//! `ndarray` views. Labels live here, as an ordered list of column names
//! parallel to the columns of the data, so that fitted models can select
//! their fit-time columns by name and recognize supplementary ones.

use std::collections::{BTreeSet, HashSet};

use ndarray::{Array2, ArrayView2};

use crate::errors::FactorError;
use crate::Result;

/// An ordered set of named numeric columns over a set of rows.
#[derive(Debug, Clone)]
pub struct Table {
    names: Vec<String>,
    values: Array2<f64>,
}

impl Table {
    /// Builds a table from column names and a matching matrix.
    ///
    /// Fails with a validation error when the number of names differs from
    /// the number of columns, or when a name appears twice.
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(FactorError::validation(format!(
                "got {} column names for a matrix with {} columns",
                names.len(),
                values.ncols()
            )));
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(FactorError::validation(format!(
                    "duplicate column name '{name}'"
                )));
            }
        }
        Ok(Self { names, values })
    }

    /// Builds a table from a bare matrix, naming columns by their position.
    pub fn from_array(values: Array2<f64>) -> Self {
        let names = (0..values.ncols()).map(|j| j.to_string()).collect();
        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Position of a column by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Gathers the requested columns, in the requested order.
    ///
    /// Fails with a validation error when a requested column is absent.
    pub fn select(&self, names: &[String]) -> Result<Table> {
        let mut out = Array2::zeros((self.nrows(), names.len()));
        for (j, name) in names.iter().enumerate() {
            let i = self.position(name).ok_or_else(|| {
                FactorError::validation(format!("column '{name}' is missing from the input"))
            })?;
            out.column_mut(j).assign(&self.values.column(i));
        }
        Table::new(names.to_vec(), out)
    }

    /// Names of columns not present in `fitted_names`, input order preserved.
    pub fn supplementary_names(&self, fitted_names: &[String]) -> Vec<String> {
        let fitted: HashSet<&str> = fitted_names.iter().map(String::as_str).collect();
        self.names
            .iter()
            .filter(|n| !fitted.contains(n.as_str()))
            .cloned()
            .collect()
    }
}

/// An ordered set of named categorical columns over a set of rows.
///
/// Each column is a vector of category labels, one per row.
#[derive(Debug, Clone)]
pub struct CategoricalTable {
    names: Vec<String>,
    columns: Vec<Vec<String>>,
}

impl CategoricalTable {
    /// Builds a categorical table from column names and per-column values.
    ///
    /// All columns must have the same number of rows.
    pub fn new(names: Vec<String>, columns: Vec<Vec<String>>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(FactorError::validation(format!(
                "got {} column names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        if let Some(first) = columns.first() {
            let n_rows = first.len();
            for (name, column) in names.iter().zip(&columns) {
                if column.len() != n_rows {
                    return Err(FactorError::validation(format!(
                        "column '{}' has {} rows, expected {}",
                        name,
                        column.len(),
                        n_rows
                    )));
                }
            }
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(FactorError::validation(format!(
                    "duplicate column name '{name}'"
                )));
            }
        }
        Ok(Self { names, columns })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, j: usize) -> &[String] {
        &self.columns[j]
    }
}

/// The category set observed per column at fit time.
///
/// Applying the schema to new rows always yields the fit-time indicator
/// column set: categories unseen at fit time produce an all-zero block for
/// that row, never a new column.
#[derive(Debug, Clone)]
pub struct IndicatorSchema {
    /// Per original column: the column name and its sorted category list.
    columns: Vec<(String, Vec<String>)>,
}

impl IndicatorSchema {
    /// Records the sorted category set of each column of `x`.
    pub fn infer(x: &CategoricalTable) -> Self {
        let columns = x
            .names()
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let categories: BTreeSet<&str> =
                    x.column(j).iter().map(String::as_str).collect();
                (
                    name.clone(),
                    categories.into_iter().map(str::to_owned).collect(),
                )
            })
            .collect();
        Self { columns }
    }

    /// Number of indicator columns the schema expands to.
    pub fn n_indicators(&self) -> usize {
        self.columns.iter().map(|(_, cats)| cats.len()).sum()
    }

    /// `"{column}_{category}"` names of the indicator columns, in schema order.
    pub fn indicator_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|(name, cats)| cats.iter().map(move |c| format!("{name}_{c}")))
            .collect()
    }

    /// One-hot encodes `x` against this schema.
    ///
    /// `x` must carry exactly the schema's columns, in the schema's order.
    pub fn encode(&self, x: &CategoricalTable) -> Result<Table> {
        let expected: Vec<&str> = self.columns.iter().map(|(n, _)| n.as_str()).collect();
        let actual: Vec<&str> = x.names().iter().map(String::as_str).collect();
        if expected != actual {
            return Err(FactorError::validation(format!(
                "categorical columns {actual:?} do not match the fitted columns {expected:?}"
            )));
        }

        let n_rows = x.nrows();
        let mut values = Array2::zeros((n_rows, self.n_indicators()));
        let mut offset = 0;
        for (j, (_, categories)) in self.columns.iter().enumerate() {
            for (i, value) in x.column(j).iter().enumerate() {
                // Unseen categories stay all-zero for this block.
                if let Ok(pos) = categories.binary_search(value) {
                    values[[i, offset + pos]] = 1.0;
                }
            }
            offset += categories.len();
        }
        Table::new(self.indicator_names(), values)
    }
}
