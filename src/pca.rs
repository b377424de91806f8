//! Principal component analysis: the factor-model core shared in spirit by
//! every variant in this crate.
//!
//! The model standardizes its input (optionally), runs the SVD engine, and
//! derives the whole family of coordinate and quality diagnostics from the
//! stored `{U, s, Vᵀ}` triple. Row coordinates come in two independent
//! flavors: the generic projection `X_scaled·Vᵀ` used by
//! [`Pca::row_coordinates`], and the fit-time fast path `U·√n·√λ` used by
//! [`Pca::fit_transform`]; the two agree to floating-point tolerance.

use log::debug;
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};

use crate::errors::FactorError;
use crate::scaler::Scaler;
use crate::svd::{compute_svd, Svd, SvdEngine};
use crate::table::Table;
use crate::{FactorModel, Result};

/// Per-component eigenvalue bookkeeping, for display and downstream tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSummary {
    pub component: usize,
    pub eigenvalue: f64,
    pub percentage_of_variance: f64,
    pub cumulative_percentage_of_variance: f64,
}

/// Principal component analysis over a table of numeric columns.
///
/// Configuration is set through the builder-style `with_*` methods before
/// fitting; the fitted state is replaced atomically by each successful
/// `fit` and is read-only afterwards.
#[derive(Debug, Clone)]
pub struct Pca {
    rescale_with_mean: bool,
    rescale_with_std: bool,
    n_components: usize,
    n_iter: usize,
    check_input: bool,
    random_state: Option<u64>,
    engine: SvdEngine,
    fitted: Option<FittedPca>,
}

#[derive(Debug, Clone)]
struct FittedPca {
    feature_names_in: Vec<String>,
    n_features_in: usize,
    n_rows: usize,
    scaler: Option<Scaler>,
    svd: Svd,
    total_inertia: f64,
}

impl Default for Pca {
    fn default() -> Self {
        Self::new()
    }
}

impl Pca {
    /// A PCA with the conventional defaults: center and scale to unit
    /// variance, keep 2 components, exact SVD engine.
    pub fn new() -> Self {
        Self {
            rescale_with_mean: true,
            rescale_with_std: true,
            n_components: 2,
            n_iter: 3,
            check_input: true,
            random_state: None,
            engine: SvdEngine::Exact,
            fitted: None,
        }
    }

    pub fn with_rescale_with_mean(mut self, rescale_with_mean: bool) -> Self {
        self.rescale_with_mean = rescale_with_mean;
        self
    }

    pub fn with_rescale_with_std(mut self, rescale_with_std: bool) -> Self {
        self.rescale_with_std = rescale_with_std;
        self
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

    fn fitted(&self) -> Result<&FittedPca> {
        self.fitted.as_ref().ok_or(FactorError::NotFitted)
    }

    fn check_matrix(&self, x: ArrayView2<'_, f64>) -> Result<()> {
        if !self.check_input {
            return Ok(());
        }
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(FactorError::validation(
                "input matrix has zero rows or zero columns",
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(FactorError::validation(
                "input matrix contains non-finite values",
            ));
        }
        Ok(())
    }

    /// Fits the model on a table of numeric columns.
    ///
    /// Records the fit-time column names, standardizes if configured, runs
    /// the SVD engine and stores the decomposition together with the total
    /// inertia of the (scaled) matrix. On failure the previously fitted
    /// state, if any, is left untouched.
    pub fn fit(&mut self, x: &Table) -> Result<&mut Self> {
        self.check_matrix(x.values())?;

        let n_rows = x.nrows();
        let (scaler, scaled) = if self.rescale_with_mean || self.rescale_with_std {
            let mut scaler = Scaler::new(self.rescale_with_mean, self.rescale_with_std);
            let scaled = scaler.fit_transform(x.values())?;
            (Some(scaler), scaled)
        } else {
            (None, x.values().to_owned())
        };

        let svd = compute_svd(
            scaled.view(),
            self.n_components,
            self.n_iter,
            self.random_state,
            self.engine,
        )?;
        let total_inertia = scaled.iter().map(|v| v * v).sum::<f64>() / n_rows as f64;
        debug!(
            "fitted PCA on {} rows x {} columns, total inertia {:.6}",
            n_rows,
            x.ncols(),
            total_inertia
        );

        self.fitted = Some(FittedPca {
            feature_names_in: x.names().to_vec(),
            n_features_in: x.ncols(),
            n_rows,
            scaler,
            svd,
            total_inertia,
        });
        Ok(self)
    }

    /// Column names seen at fit time.
    pub fn feature_names_in(&self) -> Result<&[String]> {
        Ok(&self.fitted()?.feature_names_in)
    }

    pub fn n_features_in(&self) -> Result<usize> {
        Ok(self.fitted()?.n_features_in)
    }

    /// Mean squared Frobenius norm of the scaled fit matrix: the total
    /// variance being decomposed.
    pub fn total_inertia(&self) -> Result<f64> {
        Ok(self.fitted()?.total_inertia)
    }

    /// Eigenvalues per retained component: `s² / n_rows`, descending.
    pub fn eigenvalues(&self) -> Result<Array1<f64>> {
        let fitted = self.fitted()?;
        let n = fitted.n_rows as f64;
        Ok(fitted.svd.s.mapv(|s| s * s / n))
    }

    /// Share of the total inertia explained by each component.
    pub fn percentage_of_variance(&self) -> Result<Array1<f64>> {
        let total = self.total_inertia()?;
        Ok(self.eigenvalues()? / total)
    }

    /// Running sum of [`Pca::percentage_of_variance`]; non-decreasing and
    /// bounded by 1.
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

    /// One [`ComponentSummary`] per retained component.
    pub fn eigenvalue_summary(&self) -> Result<Vec<ComponentSummary>> {
        let eigenvalues = self.eigenvalues()?;
        let percentages = self.percentage_of_variance()?;
        let cumulative = self.cumulative_percentage_of_variance()?;
        Ok((0..eigenvalues.len())
            .map(|j| ComponentSummary {
                component: j,
                eigenvalue: eigenvalues[j],
                percentage_of_variance: percentages[j],
                cumulative_percentage_of_variance: cumulative[j],
            })
            .collect())
    }

    /// Scales `x` the way the fit data was scaled.
    ///
    /// Fit-time columns go through the stored scaler. When
    /// `include_supplementary` is set, columns not seen at fit time are
    /// independently fitted on the fly and appended after the fit-time
    /// block, without touching the stored parameters.
    fn scale(
        &self,
        fitted: &FittedPca,
        x: &Table,
        include_supplementary: bool,
    ) -> Result<Array2<f64>> {
        let base = x.select(&fitted.feature_names_in)?;
        let scaled_base = match &fitted.scaler {
            Some(scaler) => scaler.transform(base.values())?,
            None => base.values().to_owned(),
        };

        if !include_supplementary {
            return Ok(scaled_base);
        }
        let supplementary = x.supplementary_names(&fitted.feature_names_in);
        if supplementary.is_empty() {
            return Ok(scaled_base);
        }

        let sup_table = x.select(&supplementary)?;
        let scaled_sup = match &fitted.scaler {
            Some(_) => {
                let mut sup_scaler = Scaler::new(self.rescale_with_mean, self.rescale_with_std);
                sup_scaler.fit_transform(sup_table.values())?
            }
            None => sup_table.values().to_owned(),
        };
        concatenate(Axis(1), &[scaled_base.view(), scaled_sup.view()])
            .map_err(FactorError::backend)
    }

    /// Row principal coordinates: the projection of `x` onto the right
    /// singular vectors, `X_scaled·Vᵀ`.
    ///
    /// Columns of `x` beyond the fit-time set are ignored; a missing
    /// fit-time column is a validation error.
    pub fn row_coordinates(&self, x: &Table) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        let scaled = self.scale(fitted, x, false)?;
        Ok(scaled.dot(&fitted.svd.vt.t()))
    }

    /// Alias for [`Pca::row_coordinates`], for a uniform fit/transform
    /// calling convention.
    pub fn transform(&self, x: &Table) -> Result<Array2<f64>> {
        self.fitted()?;
        self.check_matrix(x.values())?;
        self.row_coordinates(x)
    }

    /// Fits and returns the row principal coordinates of the fit data in
    /// one pass.
    ///
    /// The coordinates are derived directly from the left singular vectors
    /// (`U·√n·√λ`), skipping the projection matrix multiply; the result
    /// equals `fit(x)` followed by `row_coordinates(x)` to floating-point
    /// tolerance.
    pub fn fit_transform(&mut self, x: &Table) -> Result<Array2<f64>> {
        self.fit(x)?;
        let eigenvalues = self.eigenvalues()?;
        let fitted = self.fitted()?;
        let sqrt_n = (fitted.n_rows as f64).sqrt();

        let mut coordinates = fitted.svd.u.clone() * sqrt_n;
        for (j, mut column) in coordinates.axis_iter_mut(Axis(1)).enumerate() {
            column *= eigenvalues[j].sqrt();
        }
        Ok(coordinates)
    }

    /// Row principal coordinates rescaled back toward unit variance per
    /// axis: each component divided by its eigenvalue.
    pub fn row_standard_coordinates(&self, x: &Table) -> Result<Array2<f64>> {
        let eigenvalues = self.eigenvalues()?;
        let mut coordinates = self.row_coordinates(x)?;
        for (j, mut column) in coordinates.axis_iter_mut(Axis(1)).enumerate() {
            column /= eigenvalues[j];
        }
        Ok(coordinates)
    }

    /// Quality of representation of each row by each component: squared
    /// row principal coordinate over the row's squared (scaled) distance
    /// from the origin. Values lie in [0, 1]; they sum to 1 across
    /// components only at full rank.
    ///
    /// A row lying exactly at the column means scales to the origin and has
    /// no direction to represent; its similarities are NaN (0/0).
    pub fn row_cosine_similarities(&self, x: &Table) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        let scaled = self.scale(fitted, x, false)?;
        let squared_distances = scaled.mapv(|v| v * v).sum_axis(Axis(1));

        let mut similarities = scaled.dot(&fitted.svd.vt.t());
        similarities.mapv_inplace(|v| v * v);
        for (i, mut row) in similarities.axis_iter_mut(Axis(0)).enumerate() {
            row /= squared_distances[i];
        }
        Ok(similarities)
    }

    /// Share of each component's variance attributable to each row:
    /// squared row principal coordinate over `n_rows · eigenvalue`. For a
    /// given component the contributions of all rows sum to 1.
    pub fn row_contributions(&self, x: &Table) -> Result<Array2<f64>> {
        let eigenvalues = self.eigenvalues()?;
        let mut contributions = self.row_coordinates(x)?;
        let n_rows = contributions.nrows() as f64;
        contributions.mapv_inplace(|v| v * v);
        for (j, mut column) in contributions.axis_iter_mut(Axis(1)).enumerate() {
            column /= n_rows * eigenvalues[j];
        }
        Ok(contributions)
    }

    /// Column principal coordinates: the projection of features onto the
    /// left singular vectors, `X_scaledᵀ·(U/√n)`.
    ///
    /// Supplementary columns of `x` are scaled independently and projected
    /// alongside the fit-time columns; `x` must have the fit-time row
    /// count.
    pub fn column_coordinates(&self, x: &Table) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        let scaled = self.scale(fitted, x, true)?;
        if scaled.nrows() != fitted.n_rows {
            return Err(FactorError::validation(format!(
                "column projections need the fit-time row count ({}), got {}",
                fitted.n_rows,
                scaled.nrows()
            )));
        }
        let sqrt_n = (fitted.n_rows as f64).sqrt();
        Ok(scaled.t().dot(&fitted.svd.u) / sqrt_n)
    }

    /// Semantic alias for [`Pca::column_coordinates`]: with standardized
    /// input the column coordinates are the correlations (loadings)
    /// between variables and components.
    pub fn column_correlations(&self, x: &Table) -> Result<Array2<f64>> {
        self.column_coordinates(x)
    }

    /// Squared column correlations: the share of each variable's variance
    /// explained by each component.
    pub fn column_cosine_similarities(&self, x: &Table) -> Result<Array2<f64>> {
        let mut correlations = self.column_correlations(x)?;
        correlations.mapv_inplace(|v| v * v);
        Ok(correlations)
    }

    /// Squared column coordinates divided by the eigenvalue per component.
    ///
    /// Unlike the row case this is not normalized by an entity count; the
    /// asymmetry follows the standard convention for variable
    /// contributions.
    pub fn column_contributions(&self, x: &Table) -> Result<Array2<f64>> {
        let eigenvalues = self.eigenvalues()?;
        let mut contributions = self.column_coordinates(x)?;
        contributions.mapv_inplace(|v| v * v);
        for (j, mut column) in contributions.axis_iter_mut(Axis(1)).enumerate() {
            column /= eigenvalues[j];
        }
        Ok(contributions)
    }

    /// Maps row principal coordinates back to the original feature space:
    /// `X·V`, then the inverse of the fit-time standardization.
    pub fn inverse_transform(&self, coordinates: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        if coordinates.ncols() != fitted.svd.n_components() {
            return Err(FactorError::validation(format!(
                "expected {} coordinate columns, got {}",
                fitted.svd.n_components(),
                coordinates.ncols()
            )));
        }
        let reconstructed = coordinates.dot(&fitted.svd.vt);
        match &fitted.scaler {
            Some(scaler) => scaler.inverse_transform(reconstructed.view()),
            None => Ok(reconstructed),
        }
    }
}

impl FactorModel for Pca {
    type Input = Table;

    fn fit(&mut self, x: &Table) -> Result<()> {
        Pca::fit(self, x)?;
        Ok(())
    }

    fn eigenvalues(&self) -> Result<Array1<f64>> {
        Pca::eigenvalues(self)
    }

    fn percentage_of_variance(&self) -> Result<Array1<f64>> {
        Pca::percentage_of_variance(self)
    }

    fn row_coordinates(&self, x: &Table) -> Result<Array2<f64>> {
        Pca::row_coordinates(self, x)
    }

    fn column_coordinates(&self, x: &Table) -> Result<Array2<f64>> {
        Pca::column_coordinates(self, x)
    }

    fn row_cosine_similarities(&self, x: &Table) -> Result<Array2<f64>> {
        Pca::row_cosine_similarities(self, x)
    }

    fn column_cosine_similarities(&self, x: &Table) -> Result<Array2<f64>> {
        Pca::column_cosine_similarities(self, x)
    }

    fn row_contributions(&self, x: &Table) -> Result<Array2<f64>> {
        Pca::row_contributions(self, x)
    }

    fn column_contributions(&self, x: &Table) -> Result<Array2<f64>> {
        Pca::column_contributions(self, x)
    }
}
