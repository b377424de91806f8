//! Truncated singular value decomposition with pluggable backends.

use log::debug;
use ndarray::{s, Array1, Array2, ArrayView2};
use ndarray_linalg::{SVDInto, QR};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;

use crate::errors::FactorError;
use crate::Result;

/// Which decomposition algorithm backs `compute_svd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvdEngine {
    /// Full LAPACK SVD, truncated to the requested rank. Deterministic.
    Exact,
    /// Randomized sketch-and-project SVD (Halko, Martinsson, Tropp, 2011)
    /// with power iterations. Deterministic given a seed.
    Randomized,
}

/// A rank-k truncated singular value decomposition, `X ≈ U·diag(s)·Vᵀ`.
///
/// `u` is `(n_rows, k)`, `s` is `k` descending non-negative values, `vt` is
/// `(k, n_cols)`. The sign of each singular vector pair is whatever the
/// backend produced; derived quantities that square coordinates are
/// sign-invariant by construction.
#[derive(Debug, Clone)]
pub struct Svd {
    pub u: Array2<f64>,
    pub s: Array1<f64>,
    pub vt: Array2<f64>,
}

impl Svd {
    /// Number of retained components.
    pub fn n_components(&self) -> usize {
        self.s.len()
    }
}

/// Oversampling amount for the randomized sketch: ~10% of the requested
/// rank, clamped to a robust range.
fn sketch_oversampling(n_components: usize) -> usize {
    const LOWER: usize = 5;
    const UPPER: usize = 20;
    ((n_components as f64 * 0.1).ceil() as usize).clamp(LOWER, UPPER)
}

/// Computes the top `n_components` singular triplets of `x`.
///
/// `n_iter` and `random_state` only affect the randomized engine: `n_iter`
/// is the number of power iterations refining the sketch basis, and two
/// calls with the same seed return bit-identical results.
///
/// Fails with a configuration error when `n_components` is zero or exceeds
/// `min(n_rows, n_cols)`.
pub fn compute_svd(
    x: ArrayView2<'_, f64>,
    n_components: usize,
    n_iter: usize,
    random_state: Option<u64>,
    engine: SvdEngine,
) -> Result<Svd> {
    let (n_rows, n_cols) = x.dim();
    let max_rank = n_rows.min(n_cols);

    if n_components == 0 {
        return Err(FactorError::configuration(
            "n_components must be greater than 0",
        ));
    }
    if n_components > max_rank {
        return Err(FactorError::configuration(format!(
            "n_components ({n_components}) exceeds min(n_rows, n_cols) = {max_rank}"
        )));
    }

    debug!(
        "computing rank-{} SVD of a {}x{} matrix with the {:?} engine",
        n_components, n_rows, n_cols, engine
    );

    match engine {
        SvdEngine::Exact => exact_svd(x, n_components),
        SvdEngine::Randomized => randomized_svd(x, n_components, n_iter, random_state),
    }
}

fn exact_svd(x: ArrayView2<'_, f64>, n_components: usize) -> Result<Svd> {
    let (u, s, vt) = x
        .to_owned()
        .svd_into(true, true)
        .map_err(FactorError::backend)?;
    let u = u.ok_or_else(|| FactorError::backend("SVD did not return U"))?;
    let vt = vt.ok_or_else(|| FactorError::backend("SVD did not return Vᵀ"))?;

    Ok(Svd {
        u: u.slice(s![.., ..n_components]).to_owned(),
        s: s.slice(s![..n_components]).to_owned(),
        vt: vt.slice(s![..n_components, ..]).to_owned(),
    })
}

/// Randomized truncated SVD.
///
/// Sketches the range of `x` with a Gaussian test matrix, refines the
/// orthonormal basis with `n_iter` QR-renormalized power iterations, then
/// takes the exact SVD of the small projected matrix.
fn randomized_svd(
    x: ArrayView2<'_, f64>,
    n_components: usize,
    n_iter: usize,
    random_state: Option<u64>,
) -> Result<Svd> {
    let (n_rows, n_cols) = x.dim();
    let max_rank = n_rows.min(n_cols);
    let n_sketch = (n_components + sketch_oversampling(n_components))
        .min(max_rank)
        .max(n_components);

    let mut rng = match random_state {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(rand::thread_rng())
            .map_err(|e| FactorError::backend(format!("failed to initialize RNG: {e}")))?,
    };
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| FactorError::backend(format!("failed to build Gaussian sampler: {e}")))?;

    // Sketch the range of x: Y = X·Ω, Ω Gaussian of shape (n_cols, l).
    let omega = Array2::from_shape_fn((n_cols, n_sketch), |_| rng.sample(normal));
    let y = x.dot(&omega);
    let (mut q, _) = y.qr().map_err(FactorError::backend)?;

    // Power iterations, re-orthonormalizing at every half-step to keep the
    // basis numerically orthonormal.
    for iteration in 0..n_iter {
        let w = x.t().dot(&q);
        let (w_ortho, _) = w.qr().map_err(|e| {
            FactorError::backend(format!("QR failed in power iteration {iteration}: {e}"))
        })?;
        let z = x.dot(&w_ortho);
        let (q_next, _) = z.qr().map_err(|e| {
            FactorError::backend(format!("QR failed in power iteration {iteration}: {e}"))
        })?;
        q = q_next;
    }

    // Project onto the basis and decompose the small matrix exactly.
    let b = q.t().dot(&x);
    let (u_b, s_b, vt_b) = b.svd_into(true, true).map_err(FactorError::backend)?;
    let u_b = u_b.ok_or_else(|| FactorError::backend("sketch SVD did not return U"))?;
    let vt_b = vt_b.ok_or_else(|| FactorError::backend("sketch SVD did not return Vᵀ"))?;

    let u = q.dot(&u_b);

    Ok(Svd {
        u: u.slice(s![.., ..n_components]).to_owned(),
        s: s_b.slice(s![..n_components]).to_owned(),
        vt: vt_b.slice(s![..n_components, ..]).to_owned(),
    })
}
