//! Per-column standardization.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::errors::FactorError;
use crate::Result;

/// Per-column mean-centering and/or unit-variance scaling.
///
/// Centering and scaling are independently toggleable. The fitted
/// parameters are immutable; transforming new data never updates them.
/// Standard deviations use the population convention (ddof = 0), matching
/// the inertia bookkeeping of the factor models.
#[derive(Debug, Clone)]
pub struct Scaler {
    with_mean: bool,
    with_std: bool,
    state: Option<ScalerState>,
}

#[derive(Debug, Clone)]
struct ScalerState {
    /// Per-column means; zeros when centering is disabled.
    means: Array1<f64>,
    /// Per-column standard deviations; ones when scaling is disabled.
    stds: Array1<f64>,
}

impl Scaler {
    pub fn new(with_mean: bool, with_std: bool) -> Self {
        Self {
            with_mean,
            with_std,
            state: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Computes and stores the per-column parameters.
    ///
    /// Fails with a validation error on empty input, or when unit-variance
    /// scaling is requested and a column has zero variance. Zero-variance
    /// columns are rejected rather than epsilon-guarded so the failure is
    /// deterministic and observable.
    pub fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<&mut Self> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(FactorError::validation(
                "cannot fit a scaler on an empty matrix",
            ));
        }

        let means = if self.with_mean {
            x.mean_axis(Axis(0))
                .ok_or_else(|| FactorError::validation("failed to compute column means"))?
        } else {
            Array1::zeros(x.ncols())
        };

        let stds = if self.with_std {
            let stds = x.map_axis(Axis(0), |column| column.std(0.0));
            if let Some(j) = stds.iter().position(|&s| s <= f64::EPSILON) {
                return Err(FactorError::validation(format!(
                    "column {j} has zero variance and cannot be scaled to unit variance"
                )));
            }
            stds
        } else {
            Array1::ones(x.ncols())
        };

        self.state = Some(ScalerState { means, stds });
        Ok(self)
    }

    /// Applies `(x - mean) / std` per column.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let state = self.state.as_ref().ok_or(FactorError::NotFitted)?;
        self.check_width(state, x.ncols())?;
        let mut out = x.to_owned();
        out -= &state.means;
        out /= &state.stds;
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Exactly reverses `transform`.
    pub fn inverse_transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let state = self.state.as_ref().ok_or(FactorError::NotFitted)?;
        self.check_width(state, x.ncols())?;
        let mut out = x.to_owned();
        out *= &state.stds;
        out += &state.means;
        Ok(out)
    }

    fn check_width(&self, state: &ScalerState, ncols: usize) -> Result<()> {
        if ncols != state.means.len() {
            return Err(FactorError::validation(format!(
                "input has {} columns but the scaler was fitted on {}",
                ncols,
                state.means.len()
            )));
        }
        Ok(())
    }
}
