//! Correspondence analysis of a non-negative two-way table.
//!
//! The table is re-expressed as a correspondence matrix `P = X / total`,
//! centered against the independence model `r·cᵀ` built from its row and
//! column masses, and standardized into the chi-square residual matrix
//! `S = D_r^{-1/2}·(P − r·cᵀ)·D_c^{-1/2}`, which is decomposed by the
//! shared SVD engine. Eigenvalues are `s²` and the total inertia is the
//! squared Frobenius norm of `S`.

use log::debug;
use ndarray::{Array1, Array2, Axis};

use crate::errors::FactorError;
use crate::svd::{compute_svd, Svd, SvdEngine};
use crate::table::Table;
use crate::{FactorModel, Result};

/// Correspondence analysis over a non-negative contingency (or indicator)
/// table.
#[derive(Debug, Clone)]
pub struct Ca {
    n_components: usize,
    n_iter: usize,
    check_input: bool,
    random_state: Option<u64>,
    engine: SvdEngine,
    fitted: Option<FittedCa>,
}

#[derive(Debug, Clone)]
struct FittedCa {
    column_names_in: Vec<String>,
    n_rows: usize,
    row_masses: Array1<f64>,
    col_masses: Array1<f64>,
    svd: Svd,
    total_inertia: f64,
}

impl Default for Ca {
    fn default() -> Self {
        Self::new()
    }
}

impl Ca {
    pub fn new() -> Self {
        Self {
            n_components: 2,
            n_iter: 3,
            check_input: true,
            random_state: None,
            engine: SvdEngine::Exact,
            fitted: None,
        }
    }

    pub fn with_n_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    /// Power iterations for the randomized engine.
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn with_check_input(mut self, check_input: bool) -> Self {
        self.check_input = check_input;
        self
    }

    pub fn with_random_state(mut self, random_state: Option<u64>) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn with_engine(mut self, engine: SvdEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn fitted(&self) -> Result<&FittedCa> {
        self.fitted.as_ref().ok_or(FactorError::NotFitted)
    }

    fn check_table(&self, x: &Table) -> Result<()> {
        if !self.check_input {
            return Ok(());
        }
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(FactorError::validation(
                "input table has zero rows or zero columns",
            ));
        }
        if x.values().iter().any(|v| !v.is_finite()) {
            return Err(FactorError::validation(
                "input table contains non-finite values",
            ));
        }
        if x.values().iter().any(|&v| v < 0.0) {
            return Err(FactorError::validation(
                "correspondence analysis needs non-negative entries",
            ));
        }
        Ok(())
    }

    /// Fits the analysis on a non-negative table.
    ///
    /// Rows or columns with zero mass are rejected; on failure the
    /// previously fitted state, if any, is left untouched.
    pub fn fit(&mut self, x: &Table) -> Result<&mut Self> {
        self.check_table(x)?;

        let values = x.values();
        let total = values.sum();
        if total <= 0.0 {
            return Err(FactorError::validation("input table sums to zero"));
        }

        let p = values.to_owned() / total;
        let row_masses = p.sum_axis(Axis(1));
        let col_masses = p.sum_axis(Axis(0));
        if let Some(i) = row_masses.iter().position(|&m| m <= 0.0) {
            return Err(FactorError::validation(format!("row {i} has zero mass")));
        }
        if let Some(j) = col_masses.iter().position(|&m| m <= 0.0) {
            return Err(FactorError::validation(format!(
                "column '{}' has zero mass",
                x.names()[j]
            )));
        }

        // Chi-square residuals of P against the independence model.
        let expected = Array2::from_shape_fn(p.dim(), |(i, j)| row_masses[i] * col_masses[j]);
        let mut residuals = p - expected;
        for (i, mut row) in residuals.axis_iter_mut(Axis(0)).enumerate() {
            row /= row_masses[i].sqrt();
        }
        let col_masses_sqrt = col_masses.mapv(f64::sqrt);
        residuals /= &col_masses_sqrt;

        let svd = compute_svd(
            residuals.view(),
            self.n_components,
            self.n_iter,
            self.random_state,
            self.engine,
        )?;
        let total_inertia = residuals.iter().map(|v| v * v).sum::<f64>();
        debug!(
            "fitted CA on {} rows x {} columns, total inertia {:.6}",
            x.nrows(),
            x.ncols(),
            total_inertia
        );

        self.fitted = Some(FittedCa {
            column_names_in: x.names().to_vec(),
            n_rows: x.nrows(),
            row_masses,
            col_masses,
            svd,
            total_inertia,
        });
        Ok(self)
    }

    /// Column names seen at fit time.
    pub fn column_names_in(&self) -> Result<&[String]> {
        Ok(&self.fitted()?.column_names_in)
    }

    /// Row marginal masses of the fit table.
    pub fn row_masses(&self) -> Result<&Array1<f64>> {
        Ok(&self.fitted()?.row_masses)
    }

    /// Column marginal masses of the fit table.
    pub fn col_masses(&self) -> Result<&Array1<f64>> {
        Ok(&self.fitted()?.col_masses)
    }

    /// Sum of squared chi-square residuals of the fit table.
    pub fn total_inertia(&self) -> Result<f64> {
        Ok(self.fitted()?.total_inertia)
    }

    /// Eigenvalues per retained component: `s²`, descending.
    pub fn eigenvalues(&self) -> Result<Array1<f64>> {
        Ok(self.fitted()?.svd.s.mapv(|s| s * s))
    }

    /// Share of the total inertia explained by each component.
    pub fn percentage_of_variance(&self) -> Result<Array1<f64>> {
        let total = self.total_inertia()?;
        Ok(self.eigenvalues()? / total)
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

    /// Row profiles of `x` restricted to the fit-time columns: each row
    /// divided by its total. A zero row total is a validation error.
    fn row_profiles(&self, fitted: &FittedCa, x: &Table) -> Result<Array2<f64>> {
        let selected = x.select(&fitted.column_names_in)?;
        self.check_table(&selected)?;
        let mut profiles = selected.values().to_owned();
        for (i, mut row) in profiles.axis_iter_mut(Axis(0)).enumerate() {
            let row_total = row.sum();
            if row_total <= 0.0 {
                return Err(FactorError::validation(format!(
                    "row {i} has a zero total and no profile"
                )));
            }
            row /= row_total;
        }
        Ok(profiles)
    }

    /// Column profiles of `x`: each fit-time column divided by its total,
    /// transposed to one row per column. `x` must have the fit-time row
    /// count.
    fn column_profiles(&self, fitted: &FittedCa, x: &Table) -> Result<Array2<f64>> {
        let selected = x.select(&fitted.column_names_in)?;
        self.check_table(&selected)?;
        if selected.nrows() != fitted.n_rows {
            return Err(FactorError::validation(format!(
                "column projections need the fit-time row count ({}), got {}",
                fitted.n_rows,
                selected.nrows()
            )));
        }
        let mut profiles = selected.values().t().to_owned();
        for (j, mut profile) in profiles.axis_iter_mut(Axis(0)).enumerate() {
            let col_total = profile.sum();
            if col_total <= 0.0 {
                return Err(FactorError::validation(format!(
                    "column '{}' has a zero total and no profile",
                    fitted.column_names_in[j]
                )));
            }
            profile /= col_total;
        }
        Ok(profiles)
    }

    /// Row principal coordinates: row profiles projected through
    /// `D_c^{-1/2}·Vᵀ`.
    ///
    /// Supplementary rows use their own profile; the fitted masses and
    /// singular vectors are only read.
    pub fn row_coordinates(&self, x: &Table) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        let mut profiles = self.row_profiles(fitted, x)?;
        let col_masses_sqrt = fitted.col_masses.mapv(f64::sqrt);
        profiles /= &col_masses_sqrt;
        Ok(profiles.dot(&fitted.svd.vt.t()))
    }

    /// Alias for [`Ca::row_coordinates`].
    pub fn transform(&self, x: &Table) -> Result<Array2<f64>> {
        self.row_coordinates(x)
    }

    /// Column principal coordinates: column profiles projected through
    /// `D_r^{-1/2}·U`.
    pub fn column_coordinates(&self, x: &Table) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        let mut profiles = self.column_profiles(fitted, x)?;
        let row_masses_sqrt = fitted.row_masses.mapv(f64::sqrt);
        profiles /= &row_masses_sqrt;
        Ok(profiles.dot(&fitted.svd.u))
    }

    /// Quality of representation of each row: squared row principal
    /// coordinates over the chi-square distance of the row profile to the
    /// centroid (the column-mass vector).
    pub fn row_cosine_similarities(&self, x: &Table) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        let profiles = self.row_profiles(fitted, x)?;
        let distances: Array1<f64> = profiles
            .axis_iter(Axis(0))
            .map(|profile| {
                profile
                    .iter()
                    .zip(fitted.col_masses.iter())
                    .map(|(&p, &c)| (p - c) * (p - c) / c)
                    .sum()
            })
            .collect();

        let mut similarities = self.row_coordinates(x)?;
        similarities.mapv_inplace(|v| v * v);
        for (i, mut row) in similarities.axis_iter_mut(Axis(0)).enumerate() {
            row /= distances[i];
        }
        Ok(similarities)
    }

    /// Quality of representation of each column: squared column principal
    /// coordinates over the chi-square distance of the column profile to
    /// the centroid (the row-mass vector).
    pub fn column_cosine_similarities(&self, x: &Table) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        let profiles = self.column_profiles(fitted, x)?;
        let distances: Array1<f64> = profiles
            .axis_iter(Axis(0))
            .map(|profile| {
                profile
                    .iter()
                    .zip(fitted.row_masses.iter())
                    .map(|(&p, &r)| (p - r) * (p - r) / r)
                    .sum()
            })
            .collect();

        let mut similarities = self.column_coordinates(x)?;
        similarities.mapv_inplace(|v| v * v);
        for (j, mut row) in similarities.axis_iter_mut(Axis(0)).enumerate() {
            row /= distances[j];
        }
        Ok(similarities)
    }

    /// Mass-weighted row contributions: `mass_i · F_ij² / λ_j`, with the
    /// masses taken from `x`. For the fit table each component's column
    /// sums to 1.
    pub fn row_contributions(&self, x: &Table) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        let selected = x.select(&fitted.column_names_in)?;
        let total = selected.values().sum();
        if total <= 0.0 {
            return Err(FactorError::validation("input table sums to zero"));
        }
        let masses = selected.values().sum_axis(Axis(1)) / total;
        let eigenvalues = self.eigenvalues()?;

        let mut contributions = self.row_coordinates(x)?;
        contributions.mapv_inplace(|v| v * v);
        for (i, mut row) in contributions.axis_iter_mut(Axis(0)).enumerate() {
            row *= masses[i];
        }
        for (j, mut column) in contributions.axis_iter_mut(Axis(1)).enumerate() {
            column /= eigenvalues[j];
        }
        Ok(contributions)
    }

    /// Mass-weighted column contributions: `mass_j · G_ij² / λ_j`. For the
    /// fit table each component's column sums to 1.
    pub fn column_contributions(&self, x: &Table) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        let selected = x.select(&fitted.column_names_in)?;
        let total = selected.values().sum();
        if total <= 0.0 {
            return Err(FactorError::validation("input table sums to zero"));
        }
        let masses = selected.values().sum_axis(Axis(0)) / total;
        let eigenvalues = self.eigenvalues()?;

        let mut contributions = self.column_coordinates(x)?;
        contributions.mapv_inplace(|v| v * v);
        for (j, mut row) in contributions.axis_iter_mut(Axis(0)).enumerate() {
            row *= masses[j];
        }
        for (k, mut column) in contributions.axis_iter_mut(Axis(1)).enumerate() {
            column /= eigenvalues[k];
        }
        Ok(contributions)
    }
}

impl FactorModel for Ca {
    type Input = Table;

    fn fit(&mut self, x: &Table) -> Result<()> {
        Ca::fit(self, x)?;
        Ok(())
    }

    fn eigenvalues(&self) -> Result<Array1<f64>> {
        Ca::eigenvalues(self)
    }

    fn percentage_of_variance(&self) -> Result<Array1<f64>> {
        Ca::percentage_of_variance(self)
    }

    fn row_coordinates(&self, x: &Table) -> Result<Array2<f64>> {
        Ca::row_coordinates(self, x)
    }

    fn column_coordinates(&self, x: &Table) -> Result<Array2<f64>> {
        Ca::column_coordinates(self, x)
    }

    fn row_cosine_similarities(&self, x: &Table) -> Result<Array2<f64>> {
        Ca::row_cosine_similarities(self, x)
    }

    fn column_cosine_similarities(&self, x: &Table) -> Result<Array2<f64>> {
        Ca::column_cosine_similarities(self, x)
    }

    fn row_contributions(&self, x: &Table) -> Result<Array2<f64>> {
        Ca::row_contributions(self, x)
    }

    fn column_contributions(&self, x: &Table) -> Result<Array2<f64>> {
        Ca::column_contributions(self, x)
    }
}
