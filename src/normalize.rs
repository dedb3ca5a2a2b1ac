//! Spectrum normalization: windowing, min-max rescaling, and baseline
//! handling.
//!
//! The cleaning pipeline every spectrum passes through before display or
//! matching, in this order:
//!
//! 1. filter samples to the open interval `(xmin, xmax)`;
//! 2. min-max rescale intensity to `[0, 1]`;
//! 3. apply the configured baseline mode: `Keep` attaches the estimated
//!    curve for overlay, `Remove` subtracts it and rescales again.
//!
//! Carried peak annotations follow the same affine maps as the trace; under
//! baseline removal each peak's subtracted value comes from the nearest
//! trace sample, a deliberate nearest-neighbor approximation rather than
//! interpolation.

use crate::baseline::{estimate_baseline, BaselineConfig, BaselineError, BaselineMode};
use crate::spectrum::{PeakSet, Spectrum, SpectrumError};

/// Errors from normalization of a windowed spectrum.
#[derive(Debug, thiserror::Error)]
pub enum DegenerateInputError {
    /// Fewer than two samples survived the window filter.
    #[error("window ({xmin}, {xmax}) holds {points} points; need at least 2")]
    WindowTooNarrow {
        /// Lower window edge (exclusive).
        xmin: f64,
        /// Upper window edge (exclusive).
        xmax: f64,
        /// How many samples survived.
        points: usize,
    },

    /// The windowed intensity has zero variance; min-max rescale would
    /// divide by zero. Also raised when baseline subtraction flattens the
    /// window completely.
    #[error("window intensity is uniformly {0}; cannot rescale")]
    FlatWindow(f64),

    /// Baseline estimation failed inside the pipeline.
    #[error(transparent)]
    Baseline(#[from] BaselineError),

    /// Internal reconstruction violated the spectrum contract.
    #[error(transparent)]
    Spectrum(#[from] SpectrumError),
}

/// An open abscissa interval `(xmin, xmax)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Lower edge, exclusive.
    pub xmin: f64,
    /// Upper edge, exclusive.
    pub xmax: f64,
}

impl Default for Window {
    /// The Raman working range used throughout the instrument tooling.
    fn default() -> Self {
        Self {
            xmin: 200.0,
            xmax: 3000.0,
        }
    }
}

impl Window {
    /// Build a window from explicit edges.
    pub fn new(xmin: f64, xmax: f64) -> Self {
        Self { xmin, xmax }
    }

    /// True when `x` lies strictly inside the window.
    pub fn contains(&self, x: f64) -> bool {
        x > self.xmin && x < self.xmax
    }
}

/// Result of [`normalize`].
#[derive(Debug, Clone)]
pub struct Normalized {
    /// The windowed, rescaled (and possibly baseline-subtracted) trace.
    pub spectrum: Spectrum,
    /// Carried peak annotations, when the caller supplied any.
    pub peaks: Option<PeakSet>,
    /// The estimated baseline curve, present only in `Keep` mode; aligned
    /// with `spectrum` sample for sample.
    pub baseline: Option<Vec<f64>>,
}

/// Normalize a spectrum for display or matching.
///
/// See the module docs for the step order. The input is never mutated;
/// degenerate windows (fewer than 2 samples, zero variance) fail rather
/// than divide by zero.
pub fn normalize(
    spectrum: &Spectrum,
    peaks: Option<&PeakSet>,
    window: &Window,
    config: &BaselineConfig,
) -> Result<Normalized, DegenerateInputError> {
    // Step 1: window filter.
    let mut x = Vec::new();
    let mut y = Vec::new();
    for (&xi, &yi) in spectrum.x().iter().zip(spectrum.y()) {
        if window.contains(xi) {
            x.push(xi);
            y.push(yi);
        }
    }
    if x.len() < 2 {
        return Err(DegenerateInputError::WindowTooNarrow {
            xmin: window.xmin,
            xmax: window.xmax,
            points: x.len(),
        });
    }

    // Step 2: first rescale.
    let scale = AffineRescale::over(&y)?;
    for yi in &mut y {
        *yi = scale.apply(*yi);
    }

    // Carried peaks go through the window filter and the same affine map.
    let mut peak_x = Vec::new();
    let mut peak_y = Vec::new();
    if let Some(p) = peaks {
        for (&pxi, &pyi) in p.x().iter().zip(p.y()) {
            if window.contains(pxi) {
                peak_x.push(pxi);
                peak_y.push(scale.apply(pyi));
            }
        }
    }

    // Step 3: baseline handling.
    let mut baseline = None;
    match config.mode {
        BaselineMode::None => {}
        BaselineMode::Keep => {
            let z = estimate_baseline(&y, config.lambda, config.p, config.iterations)?;
            baseline = Some(z);
        }
        BaselineMode::Remove => {
            let z = estimate_baseline(&y, config.lambda, config.p, config.iterations)?;
            for (yi, zi) in y.iter_mut().zip(&z) {
                *yi -= zi;
            }
            let rescale = AffineRescale::over(&y)?;
            for yi in &mut y {
                *yi = rescale.apply(*yi);
            }
            // Each peak drops by the baseline value at its nearest trace
            // sample; peak lists are short, so a linear scan suffices and
            // works for either axis direction.
            for (pxi, pyi) in peak_x.iter().zip(peak_y.iter_mut()) {
                let zi = z[nearest_index(&x, *pxi)];
                *pyi = rescale.apply(*pyi - zi);
            }
        }
    }

    let peaks = peaks.map(|_| PeakSet::new(peak_x, peak_y)).transpose()?;
    Ok(Normalized {
        spectrum: Spectrum::new(x, y)?,
        peaks,
        baseline,
    })
}

/// The `(y - min) / (max - min)` map for one rescale pass.
struct AffineRescale {
    min: f64,
    range: f64,
}

impl AffineRescale {
    fn over(y: &[f64]) -> Result<Self, DegenerateInputError> {
        let min = y.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        if !(range > 0.0) {
            return Err(DegenerateInputError::FlatWindow(min));
        }
        Ok(Self { min, range })
    }

    fn apply(&self, y: f64) -> f64 {
        (y - self.min) / self.range
    }
}

fn nearest_index(x: &[f64], target: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, &xi) in x.iter().enumerate() {
        let distance = (xi - target).abs();
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}
