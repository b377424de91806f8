// Factor projections via truncated SVD (PCA, CA, MCA)

#![doc = include_str!("../README.md")]

use ndarray::{Array1, Array2};

pub mod ca;
pub mod errors;
pub mod mca;
pub mod pca;
pub mod scaler;
pub mod svd;
pub mod table;

pub use ca::Ca;
pub use errors::FactorError;
pub use mca::{Mca, McaCorrection};
pub use pca::{ComponentSummary, Pca};
pub use scaler::Scaler;
pub use svd::{compute_svd, Svd, SvdEngine};
pub use table::{CategoricalTable, IndicatorSchema, Table};

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, FactorError>;

/// The contract shared by every analysis variant.
///
/// `Pca` (plain standardization), `Ca` (mass-weighted centering) and `Mca`
/// (indicator expansion plus CA) implement this independently; there is no
/// hierarchy between them. All accessors other than `fit` fail with
/// [`FactorError::NotFitted`] on an unfitted model.
pub trait FactorModel {
    /// The kind of table the variant consumes: numeric for `Pca`/`Ca`,
    /// categorical for `Mca`.
    type Input;

    fn fit(&mut self, x: &Self::Input) -> Result<()>;

    /// Eigenvalues per retained component, descending and non-negative.
    fn eigenvalues(&self) -> Result<Array1<f64>>;

    /// Share of the total inertia explained by each component.
    fn percentage_of_variance(&self) -> Result<Array1<f64>>;

    /// Running sum of [`FactorModel::percentage_of_variance`].
    fn cumulative_percentage_of_variance(&self) -> Result<Array1<f64>> {
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

    fn row_coordinates(&self, x: &Self::Input) -> Result<Array2<f64>>;

    fn column_coordinates(&self, x: &Self::Input) -> Result<Array2<f64>>;

    fn row_cosine_similarities(&self, x: &Self::Input) -> Result<Array2<f64>>;

    fn column_cosine_similarities(&self, x: &Self::Input) -> Result<Array2<f64>>;

    fn row_contributions(&self, x: &Self::Input) -> Result<Array2<f64>>;

    fn column_contributions(&self, x: &Self::Input) -> Result<Array2<f64>>;
}

#[cfg(test)]
mod pca_tests;
