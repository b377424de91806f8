//! Multiple correspondence analysis: one-hot indicator expansion plus
//! correspondence analysis, with the K/J eigenvalue corrections.
//!
//! Expanding `K` categorical columns into `J` indicator columns inflates
//! the apparent inertia; the Benzécri and Greenacre corrections re-express
//! the eigenvalues to account for the gap between `K` and `J` before
//! variance percentages are reported. Raw eigenvalues stay uncorrected.

use log::debug;
use ndarray::{Array1, Array2};

use crate::ca::Ca;
use crate::errors::FactorError;
use crate::svd::SvdEngine;
use crate::table::{CategoricalTable, IndicatorSchema, Table};
use crate::{FactorModel, Result};

/// Which eigenvalue correction to apply when reporting variance shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McaCorrection {
    /// Raw CA percentages of the indicator-matrix inertia.
    None,
    /// Benzécri: `λ* = (K/(K−1)·(λ − 1/K))²` for `λ > 1/K`, else 0;
    /// percentages are shares of `Σλ*`.
    Benzecri,
    /// Benzécri numerator over the Greenacre average inertia
    /// `K/(K−1)·(Σλ² − (J−K)/K²)`.
    Greenacre,
}

/// Multiple correspondence analysis over a table of categorical columns.
#[derive(Debug, Clone)]
pub struct Mca {
    correction: McaCorrection,
    check_input: bool,
    ca: Ca,
    fitted: Option<FittedMca>,
}

#[derive(Debug, Clone)]
struct FittedMca {
    schema: IndicatorSchema,
    /// Number of original categorical columns.
    n_original_columns: usize,
    /// Number of indicator columns the expansion produced.
    n_indicator_columns: usize,
}

impl Default for Mca {
    fn default() -> Self {
        Self::new()
    }
}

impl Mca {
    pub fn new() -> Self {
        Self {
            correction: McaCorrection::Benzecri,
            check_input: true,
            ca: Ca::new().with_check_input(true),
            fitted: None,
        }
    }

    pub fn with_n_components(mut self, n_components: usize) -> Self {
        self.ca = self.ca.with_n_components(n_components);
        self
    }

    /// Power iterations for the randomized engine.
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.ca = self.ca.with_n_iter(n_iter);
        self
    }

    pub fn with_check_input(mut self, check_input: bool) -> Self {
        self.check_input = check_input;
        self.ca = self.ca.with_check_input(check_input);
        self
    }

    pub fn with_random_state(mut self, random_state: Option<u64>) -> Self {
        self.ca = self.ca.with_random_state(random_state);
        self
    }

    pub fn with_engine(mut self, engine: SvdEngine) -> Self {
        self.ca = self.ca.with_engine(engine);
        self
    }

    pub fn with_correction(mut self, correction: McaCorrection) -> Self {
        self.correction = correction;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn fitted(&self) -> Result<&FittedMca> {
        self.fitted.as_ref().ok_or(FactorError::NotFitted)
    }

    fn check_table(&self, x: &CategoricalTable) -> Result<()> {
        if self.check_input && (x.nrows() == 0 || x.ncols() == 0) {
            return Err(FactorError::validation(
                "input table has zero rows or zero columns",
            ));
        }
        Ok(())
    }

    /// Fits the analysis on a table of categorical columns.
    ///
    /// Records the number of original columns (`K`) and, after one-hot
    /// expansion against the inferred schema, the number of indicator
    /// columns (`J`), then fits the underlying correspondence analysis on
    /// the indicator matrix.
    pub fn fit(&mut self, x: &CategoricalTable) -> Result<&mut Self> {
        self.check_table(x)?;

        let schema = IndicatorSchema::infer(x);
        let indicator = schema.encode(x)?;
        debug!(
            "one-hot encoded {} categorical columns into {} indicator columns",
            x.ncols(),
            indicator.ncols()
        );
        self.ca.fit(&indicator)?;

        self.fitted = Some(FittedMca {
            n_original_columns: x.ncols(),
            n_indicator_columns: indicator.ncols(),
            schema,
        });
        Ok(self)
    }

    /// `K`: the number of original categorical columns.
    pub fn n_original_columns(&self) -> Result<usize> {
        Ok(self.fitted()?.n_original_columns)
    }

    /// `J`: the number of indicator columns produced by the expansion.
    pub fn n_indicator_columns(&self) -> Result<usize> {
        Ok(self.fitted()?.n_indicator_columns)
    }

    /// The fit-time category set per column.
    pub fn schema(&self) -> Result<&IndicatorSchema> {
        Ok(&self.fitted()?.schema)
    }

    /// One-hot encodes `x` against the fit-time schema. Categories unseen
    /// at fit time become all-zero indicator blocks, never a new column.
    fn encode(&self, x: &CategoricalTable) -> Result<Table> {
        self.fitted()?.schema.encode(x)
    }

    /// Raw eigenvalues of the indicator-matrix CA, uncorrected.
    pub fn eigenvalues(&self) -> Result<Array1<f64>> {
        self.fitted()?;
        self.ca.eigenvalues()
    }

    /// Total inertia of the indicator-matrix CA.
    pub fn total_inertia(&self) -> Result<f64> {
        self.fitted()?;
        self.ca.total_inertia()
    }

    /// Benzécri-corrected eigenvalues: components with `λ ≤ 1/K` carry no
    /// inertia beyond the coding artifact and are zeroed.
    pub fn corrected_eigenvalues(&self) -> Result<Array1<f64>> {
        let k = self.n_original_columns()? as f64;
        let eigenvalues = self.eigenvalues()?;
        Ok(eigenvalues.mapv(|value| {
            if value > 1.0 / k {
                (k / (k - 1.0) * (value - 1.0 / k)).powi(2)
            } else {
                0.0
            }
        }))
    }

    /// Share of inertia per component, under the configured correction.
    ///
    /// Both corrections work from the retained eigenvalues only: the
    /// Benzécri shares normalize by the retained corrected sum and the
    /// Greenacre average inertia uses the retained `Σλ²`, so under heavy
    /// truncation the shares are relative to what was kept, not to the full
    /// spectrum. Fit with full rank for exact shares.
    pub fn percentage_of_variance(&self) -> Result<Array1<f64>> {
        match self.correction {
            McaCorrection::None => {
                self.fitted()?;
                self.ca.percentage_of_variance()
            }
            McaCorrection::Benzecri => {
                let corrected = self.corrected_eigenvalues()?;
                let total = corrected.sum();
                if total <= 0.0 {
                    return Err(FactorError::validation(
                        "all corrected eigenvalues are zero; no component carries inertia beyond the coding artifact",
                    ));
                }
                Ok(corrected / total)
            }
            McaCorrection::Greenacre => {
                let k = self.n_original_columns()? as f64;
                let j = self.n_indicator_columns()? as f64;
                let eigenvalues = self.eigenvalues()?;
                let corrected = self.corrected_eigenvalues()?;
                let average_inertia = k / (k - 1.0)
                    * (eigenvalues.mapv(|v| v * v).sum() - (j - k) / (k * k));
                if average_inertia <= 0.0 {
                    return Err(FactorError::validation(
                        "Greenacre average inertia is not positive for this table",
                    ));
                }
                Ok(corrected / average_inertia)
            }
        }
    }

    pub fn cumulative_percentage_of_variance(&self) -> Result<Array1<f64>> {
        let mut acc = 0.0;
        Ok(self
            .percentage_of_variance()?
            .iter()
            .map(|&v| {
                acc += v;
                acc
            })
            .collect())
    }

    /// Row principal coordinates of `x`, one-hot encoded through the
    /// fit-time schema.
    pub fn row_coordinates(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        let indicator = self.encode(x)?;
        self.ca.row_coordinates(&indicator)
    }

    /// Alias for [`Mca::row_coordinates`].
    pub fn transform(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        self.check_table(x)?;
        self.row_coordinates(x)
    }

    /// Column principal coordinates: one row per indicator column.
    pub fn column_coordinates(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        let indicator = self.encode(x)?;
        self.ca.column_coordinates(&indicator)
    }

    pub fn row_cosine_similarities(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        let indicator = self.encode(x)?;
        self.ca.row_cosine_similarities(&indicator)
    }

    pub fn column_cosine_similarities(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        let indicator = self.encode(x)?;
        self.ca.column_cosine_similarities(&indicator)
    }

    pub fn row_contributions(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        let indicator = self.encode(x)?;
        self.ca.row_contributions(&indicator)
    }

    pub fn column_contributions(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        let indicator = self.encode(x)?;
        self.ca.column_contributions(&indicator)
    }
}

impl FactorModel for Mca {
    type Input = CategoricalTable;

    fn fit(&mut self, x: &CategoricalTable) -> Result<()> {
        Mca::fit(self, x)?;
        Ok(())
    }

    fn eigenvalues(&self) -> Result<Array1<f64>> {
        Mca::eigenvalues(self)
    }

    fn percentage_of_variance(&self) -> Result<Array1<f64>> {
        Mca::percentage_of_variance(self)
    }

    fn row_coordinates(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        Mca::row_coordinates(self, x)
    }

    fn column_coordinates(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        Mca::column_coordinates(self, x)
    }

    fn row_cosine_similarities(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        Mca::row_cosine_similarities(self, x)
    }

    fn column_cosine_similarities(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        Mca::column_cosine_similarities(self, x)
    }

    fn row_contributions(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        Mca::row_contributions(self, x)
    }

    fn column_contributions(&self, x: &CategoricalTable) -> Result<Array2<f64>> {
        Mca::column_contributions(self, x)
    }
}
