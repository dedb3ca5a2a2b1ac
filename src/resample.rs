//! Uniform-grid resampling through natural cubic splines.
//!
//! Two spectra recorded on different axes cannot be compared sample by
//! sample. [`resample`] evaluates a spectrum on a uniform grid spanning the
//! overlap of the data range and a requested window, then rescales the
//! result to unit maximum so downstream similarity metrics see comparable
//! magnitudes.

/// Errors from spline fitting or grid construction.
#[derive(Debug, thiserror::Error)]
pub enum InterpolationError {
    /// Cubic spline fitting needs at least 4 samples.
    #[error("need at least 4 samples for cubic interpolation, got {0}")]
    TooFewPoints(usize),

    /// The requested window and the data range do not overlap.
    #[error("empty resampling window: [{lo}, {hi}]")]
    EmptyOverlap {
        /// Rounded lower grid bound.
        lo: f64,
        /// Rounded upper grid bound.
        hi: f64,
    },

    /// The abscissa repeats or reverses direction at this index.
    #[error("abscissa is not strictly monotonic at index {0}")]
    NonMonotonic(usize),

    /// Grid step must be a positive finite number.
    #[error("invalid grid resolution {0}; must be positive")]
    BadResolution(f64),

    /// The resampled intensity has a non-positive maximum and cannot be
    /// rescaled to unit height.
    #[error("resampled intensity peaks at {0}; cannot rescale")]
    DegenerateIntensity(f64),
}

/// Resample `(x, y)` onto a uniform grid covering the overlap of the data
/// range with `[xmin, xmax]`.
///
/// The grid runs from `round(max(xmin, min(x)))` to
/// `round(min(xmax, max(x)))` in steps of `resolution`, with both endpoints
/// pinned. Intensities are evaluated with a natural cubic spline and then
/// divided by their maximum, so `max(y') == 1`. Descending axes are
/// accepted and flipped before fitting.
pub fn resample(
    x: &[f64],
    y: &[f64],
    xmin: f64,
    xmax: f64,
    resolution: f64,
) -> Result<(Vec<f64>, Vec<f64>), InterpolationError> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(InterpolationError::BadResolution(resolution));
    }
    let spline = CubicSpline::fit(x, y)?;

    let (data_lo, data_hi) = (spline.xs[0], spline.xs[spline.xs.len() - 1]);
    let lo = xmin.max(data_lo).round();
    let hi = xmax.min(data_hi).round();
    if !(hi > lo) {
        return Err(InterpolationError::EmptyOverlap { lo, hi });
    }

    let count = ((hi - lo) / resolution).round() as usize + 1;
    let xnew = linspace(lo, hi, count);
    let mut ynew: Vec<f64> = xnew.iter().map(|&xi| spline.evaluate(xi)).collect();

    let ymax = ynew.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(ymax > 0.0) {
        return Err(InterpolationError::DegenerateIntensity(ymax));
    }
    for yi in &mut ynew {
        *yi /= ymax;
    }
    Ok((xnew, ynew))
}

/// A natural cubic spline over strictly increasing knots.
#[derive(Debug, Clone)]
struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at each knot.
    y2s: Vec<f64>,
}

impl CubicSpline {
    /// Fit a spline, flipping descending input so the knots increase.
    fn fit(x: &[f64], y: &[f64]) -> Result<Self, InterpolationError> {
        debug_assert_eq!(x.len(), y.len());
        if x.len() < 4 {
            return Err(InterpolationError::TooFewPoints(x.len()));
        }
        let descending = x[0] > x[x.len() - 1];
        let (xs, ys): (Vec<f64>, Vec<f64>) = if descending {
            (
                x.iter().rev().cloned().collect(),
                y.iter().rev().cloned().collect(),
            )
        } else {
            (x.to_vec(), y.to_vec())
        };
        for i in 1..xs.len() {
            if xs[i] <= xs[i - 1] {
                let original = if descending { x.len() - 1 - i } else { i };
                return Err(InterpolationError::NonMonotonic(original));
            }
        }

        // Tridiagonal solve for the knot second derivatives; natural
        // boundary conditions leave both ends at zero.
        let n = xs.len();
        let mut y2s = vec![0.0; n];
        let mut u = vec![0.0; n - 1];
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * y2s[i - 1] + 2.0;
            y2s[i] = (sig - 1.0) / p;
            u[i] = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * u[i] / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }
        for k in (0..n - 2).rev() {
            y2s[k + 1] = y2s[k + 1] * y2s[k + 2] + u[k + 1];
        }

        Ok(Self { xs, ys, y2s })
    }

    /// Evaluate at `x`; points beyond the knots use the boundary
    /// polynomial, which covers the slack grid rounding introduces.
    fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;
        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.y2s[lo] + (b * b * b - b) * self.y2s[hi]) * h * h / 6.0
    }
}

fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }
    let step = (stop - start) / (count - 1) as f64;
    (0..count).map(|i| start + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spline_passes_through_knots() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = vec![2.0, 3.0, 5.0, 4.0, 1.0];
        let spline = CubicSpline::fit(&xs, &ys).expect("fit");
        for (x, y) in xs.iter().zip(&ys) {
            assert!((spline.evaluate(*x) - y).abs() < 1e-10);
        }
    }

    #[test]
    fn linear_data_resamples_exactly() {
        let x: Vec<f64> = (0..11).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|&xi| 2.0 * xi + 1.0).collect();
        let (xnew, ynew) = resample(&x, &y, 0.0, 10.0, 1.0).expect("resample");

        assert_eq!(xnew.len(), 11);
        // A natural spline reproduces a straight line, so every resampled
        // value is the line divided by its maximum (21 at x = 10).
        for (xi, yi) in xnew.iter().zip(&ynew) {
            assert!((yi - (2.0 * xi + 1.0) / 21.0).abs() < 1e-9);
        }
    }

    #[test]
    fn grid_matches_requested_resolution() {
        let x: Vec<f64> = (0..201).map(|i| 200.0 + f64::from(i)).collect();
        let y: Vec<f64> = x.iter().map(|&xi| 1.0 + (xi / 50.0).sin()).collect();
        let (xnew, _) = resample(&x, &y, 250.0, 350.0, 0.5).expect("resample");

        assert_eq!(xnew.len(), 201);
        assert_eq!(xnew[0], 250.0);
        assert_eq!(xnew[200], 350.0);
        assert!((xnew[1] - 250.5).abs() < 1e-9);
    }

    #[test]
    fn unit_maximum_after_rescale() {
        let x: Vec<f64> = (0..50).map(|i| 300.0 + 2.0 * f64::from(i)).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&xi| 5.0 * (-((xi - 350.0) / 10.0).powi(2)).exp() + 0.2)
            .collect();
        let (_, ynew) = resample(&x, &y, 300.0, 398.0, 1.0).expect("resample");
        let max = ynew.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn descending_axis_is_flipped() {
        let x: Vec<f64> = (0..20).map(|i| 500.0 - 10.0 * f64::from(i)).collect();
        let y: Vec<f64> = x.iter().map(|&xi| xi / 100.0).collect();
        let (xnew, ynew) = resample(&x, &y, 310.0, 500.0, 10.0).expect("resample");

        assert!(xnew[0] < xnew[xnew.len() - 1]);
        // Linear data again: the top of the grid carries the maximum.
        assert!((ynew[ynew.len() - 1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let err = resample(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 0.0, 10.0, 1.0).unwrap_err();
        assert!(matches!(err, InterpolationError::TooFewPoints(3)));
    }

    #[test]
    fn disjoint_window_is_an_error() {
        let x: Vec<f64> = (0..10).map(|i| 500.0 + f64::from(i)).collect();
        let y = vec![1.0; 10];
        let err = resample(&x, &y, 100.0, 200.0, 1.0).unwrap_err();
        assert!(matches!(err, InterpolationError::EmptyOverlap { .. }));
    }

    #[test]
    fn duplicate_knots_are_rejected() {
        let x = vec![1.0, 2.0, 2.0, 3.0, 4.0];
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let err = resample(&x, &y, 0.0, 10.0, 1.0).unwrap_err();
        assert!(matches!(err, InterpolationError::NonMonotonic(2)));
    }

    #[test]
    fn all_negative_intensity_cannot_rescale() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|&xi| -1.0 - xi).collect();
        let err = resample(&x, &y, 0.0, 9.0, 1.0).unwrap_err();
        assert!(matches!(err, InterpolationError::DegenerateIntensity(_)));
    }
}
