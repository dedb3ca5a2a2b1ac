//! # Baseline Estimation Module
//!
//! Asymmetric least squares (ALS) smoothing for separating slowly varying
//! background (fluorescence, instrument drift) from sharp spectral peaks.
//!
//! ## Algorithm
//!
//! Iteratively reweighted least squares: minimize
//! `Σ wᵢ (yᵢ - zᵢ)² + λ ‖Δ²z‖²` where `Δ²` is the second-difference
//! operator. Each iteration solves the normal equations
//! `(W + λ D Dᵀ) z = W y` and then reassigns weights asymmetrically:
//! points above the estimate get weight `p`, points below get `1 - p`.
//! With small `p` the estimate hugs the lower envelope of the data, which
//! is the correct physical model for positive peaks on a smooth background.
//!
//! The system matrix is symmetric positive-definite and pentadiagonal, so
//! each iteration is a bandwidth-2 Cholesky factorization and two
//! triangular solves, O(L) per iteration. No dense matrix is formed at any
//! length.
//!
//! ## Example
//!
//! ```rust
//! use specmatch::baseline::estimate_baseline;
//!
//! let y: Vec<f64> = (0..64).map(|i| 0.5 + 0.01 * i as f64).collect();
//! let z = estimate_baseline(&y, 1e5, 0.001, 10)?;
//! assert_eq!(z.len(), y.len());
//! # Ok::<(), specmatch::baseline::BaselineError>(())
//! ```

/// Number of reweighting iterations used when callers have no opinion.
pub const DEFAULT_ITERATIONS: usize = 10;

/// Errors from baseline estimation.
#[derive(Debug, thiserror::Error)]
pub enum BaselineError {
    /// The smoothness penalty must be positive and finite.
    #[error("lambda must be positive and finite, got {0}")]
    BadLambda(f64),

    /// The asymmetry weight must lie strictly between 0 and 1.
    #[error("p must lie in (0, 1), got {0}")]
    BadAsymmetry(f64),

    /// The second-difference penalty needs at least three samples.
    #[error("baseline estimation needs at least 3 samples, got {0}")]
    TooFewSamples(usize),

    /// A NaN or infinite intensity in the input.
    #[error("non-finite intensity at index {0}")]
    NonFinite(usize),

    /// The weighted system lost positive-definiteness.
    ///
    /// With positive weights the system is provably positive-definite;
    /// this guards the solver against rounding collapse on extreme
    /// parameter choices.
    #[error("weighted system is singular at row {0}")]
    Singular(usize),
}

/// How a baseline estimate is applied during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaselineMode {
    /// No baseline handling.
    #[default]
    None,
    /// Compute the curve for display; leave the data untouched.
    Keep,
    /// Subtract the curve and re-normalize.
    Remove,
}

/// Baseline estimation parameters plus the application mode.
#[derive(Debug, Clone, Copy)]
pub struct BaselineConfig {
    /// Smoothness penalty λ; larger values give stiffer baselines.
    pub lambda: f64,
    /// Asymmetry weight p in (0, 1); smaller values hug the lower envelope
    /// harder.
    pub p: f64,
    /// Reweighting iterations.
    pub iterations: usize,
    /// What to do with the estimate.
    pub mode: BaselineMode,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            lambda: 1e3,
            p: 1e-3,
            iterations: DEFAULT_ITERATIONS,
            mode: BaselineMode::None,
        }
    }
}

impl BaselineConfig {
    /// Config that overlays the estimate without altering data.
    pub fn keep(lambda: f64, p: f64) -> Self {
        Self {
            lambda,
            p,
            mode: BaselineMode::Keep,
            ..Self::default()
        }
    }

    /// Config that subtracts the estimate and re-normalizes.
    pub fn remove(lambda: f64, p: f64) -> Self {
        Self {
            lambda,
            p,
            mode: BaselineMode::Remove,
            ..Self::default()
        }
    }

    /// Build from decade exponents, the way instrument operators enter
    /// them: `lambda = 10^smoothness`, `p = 10^-asymmetry`.
    pub fn from_decades(smoothness: f64, asymmetry: f64, mode: BaselineMode) -> Self {
        Self {
            lambda: 10f64.powf(smoothness),
            p: 10f64.powf(-asymmetry),
            mode,
            ..Self::default()
        }
    }
}

/// Estimate the baseline of `y` by asymmetric least squares.
///
/// Returns a curve of the same length as `y`. See the module docs for the
/// algorithm; `iterations` is typically [`DEFAULT_ITERATIONS`].
pub fn estimate_baseline(
    y: &[f64],
    lambda: f64,
    p: f64,
    iterations: usize,
) -> Result<Vec<f64>, BaselineError> {
    if !(lambda.is_finite() && lambda > 0.0) {
        return Err(BaselineError::BadLambda(lambda));
    }
    if !(p.is_finite() && p > 0.0 && p < 1.0) {
        return Err(BaselineError::BadAsymmetry(p));
    }
    let n = y.len();
    if n < 3 {
        return Err(BaselineError::TooFewSamples(n));
    }
    if let Some(i) = y.iter().position(|v| !v.is_finite()) {
        return Err(BaselineError::NonFinite(i));
    }

    // λ D Dᵀ bands; constant across iterations.
    let (m0, m1, m2) = second_difference_penalty(n);
    let pen0: Vec<f64> = m0.iter().map(|v| lambda * v).collect();
    let pen1: Vec<f64> = m1.iter().map(|v| lambda * v).collect();
    let pen2: Vec<f64> = m2.iter().map(|v| lambda * v).collect();

    let mut w = vec![1.0; n];
    let mut z = vec![0.0; n];
    let mut diag = vec![0.0; n];
    let mut rhs = vec![0.0; n];

    for _ in 0..iterations {
        for i in 0..n {
            diag[i] = w[i] + pen0[i];
            rhs[i] = w[i] * y[i];
        }
        z = solve_pentadiagonal(&diag, &pen1, &pen2, &rhs)?;
        for i in 0..n {
            w[i] = if y[i] > z[i] { p } else { 1.0 - p };
        }
    }

    Ok(z)
}

/// Bands of `D Dᵀ` for the (L, L-2) second-difference operator `D`.
///
/// Returns (main diagonal, first off-diagonal, second off-diagonal); the
/// matrix is symmetric so one triangle suffices.
fn second_difference_penalty(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let cols = n as isize - 2;
    // D[r, c] for the column stencil (1, -2, 1).
    let d = |r: isize, c: isize| -> f64 {
        if c < 0 || c >= cols {
            return 0.0;
        }
        match r - c {
            0 => 1.0,
            1 => -2.0,
            2 => 1.0,
            _ => 0.0,
        }
    };
    let band = |offset: isize| -> Vec<f64> {
        (0..n as isize - offset)
            .map(|i| (i - 2..=i + 2).map(|c| d(i, c) * d(i + offset, c)).sum())
            .collect()
    };
    (band(0), band(1), band(2))
}

/// Solve `A x = b` for symmetric positive-definite pentadiagonal `A` given
/// by its main diagonal and two off-diagonals, via banded Cholesky.
fn solve_pentadiagonal(
    diag: &[f64],
    off1: &[f64],
    off2: &[f64],
    rhs: &[f64],
) -> Result<Vec<f64>, BaselineError> {
    let n = diag.len();
    let mut ld = vec![0.0; n]; // L[i][i]
    let mut l1 = vec![0.0; n]; // L[i+1][i]
    let mut l2 = vec![0.0; n]; // L[i+2][i]

    for i in 0..n {
        let mut pivot = diag[i];
        if i >= 1 {
            pivot -= l1[i - 1] * l1[i - 1];
        }
        if i >= 2 {
            pivot -= l2[i - 2] * l2[i - 2];
        }
        if !(pivot.is_finite() && pivot > 0.0) {
            return Err(BaselineError::Singular(i));
        }
        ld[i] = pivot.sqrt();

        if i + 1 < n {
            let mut v = off1[i];
            if i >= 1 {
                v -= l1[i - 1] * l2[i - 1];
            }
            l1[i] = v / ld[i];
        }
        if i + 2 < n {
            l2[i] = off2[i] / ld[i];
        }
    }

    // Forward substitution: L u = b.
    let mut u = vec![0.0; n];
    for i in 0..n {
        let mut v = rhs[i];
        if i >= 1 {
            v -= l1[i - 1] * u[i - 1];
        }
        if i >= 2 {
            v -= l2[i - 2] * u[i - 2];
        }
        u[i] = v / ld[i];
    }

    // Back substitution: Lᵀ x = u.
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut v = u[i];
        if i + 1 < n {
            v -= l1[i] * x[i + 1];
        }
        if i + 2 < n {
            v -= l2[i] * x[i + 2];
        }
        x[i] = v / ld[i];
    }

    Ok(x)
}
