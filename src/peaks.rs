//! Prominence-based peak annotation.
//!
//! Finds local maxima of a trace and keeps those whose topographic
//! prominence clears a threshold expressed as a percentage of the global
//! maximum intensity. Output is annotation only (plot labels, CLI tables);
//! it never feeds back into matching.

/// A detected local maximum that cleared the prominence filter.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedPeak {
    /// Abscissa of the maximum (plateaus report their midpoint).
    pub x: f64,
    /// Intensity at the maximum.
    pub y: f64,
    /// Topographic prominence: height above the highest intervening
    /// valley toward the nearest higher sample (or the trace border).
    pub prominence: f64,
    /// Display label, the x position to one decimal.
    pub label: String,
}

/// Detect and filter peaks.
///
/// `x` and `y` must be the same length. A sample is a peak when it is
/// strictly higher than both neighbors; a flat run strictly higher than
/// its surroundings counts once, at its midpoint. Peaks pass the filter
/// when `100 * prominence / max(y) > prominence_filter_pct`.
pub fn find_peaks(x: &[f64], y: &[f64], prominence_filter_pct: f64) -> Vec<AnnotatedPeak> {
    debug_assert_eq!(x.len(), y.len());

    let ymax = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(ymax > 0.0) {
        return Vec::new();
    }

    let mut peaks = Vec::new();
    for index in local_maxima(y) {
        let prominence = prominence_at(y, index);
        if 100.0 * prominence / ymax > prominence_filter_pct {
            peaks.push(AnnotatedPeak {
                x: x[index],
                y: y[index],
                prominence,
                label: format!("{:.1}", x[index]),
            });
        }
    }
    peaks
}

/// Indices of local maxima, plateaus collapsed to their midpoints.
fn local_maxima(y: &[f64]) -> Vec<usize> {
    let n = y.len();
    let mut maxima = Vec::new();
    let mut i = 1;
    while n >= 2 && i < n - 1 {
        if y[i - 1] < y[i] {
            // Scan across a possible plateau.
            let mut ahead = i + 1;
            while ahead < n - 1 && y[ahead] == y[i] {
                ahead += 1;
            }
            if y[ahead] < y[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    maxima
}

/// Topographic prominence of the sample at `peak`.
fn prominence_at(y: &[f64], peak: usize) -> f64 {
    let yp = y[peak];

    let mut left_min = yp;
    let mut i = peak;
    while i > 0 {
        i -= 1;
        if y[i] > yp {
            break;
        }
        if y[i] < left_min {
            left_min = y[i];
        }
    }

    let mut right_min = yp;
    let mut i = peak;
    while i + 1 < y.len() {
        i += 1;
        if y[i] > yp {
            break;
        }
        if y[i] < right_min {
            right_min = y[i];
        }
    }

    yp - left_min.max(right_min)
}
