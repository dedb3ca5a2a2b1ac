//! Core spectral data model.
//!
//! A [`Spectrum`] is an immutable pair of equal-length `x`/`y` traces
//! (abscissa in wavenumbers or wavelength, ordinate in arbitrary intensity
//! units). A [`PeakSet`] is a parallel list of tagged points of interest
//! that some instrument formats carry alongside the trace.
//!
//! Every transformation in this crate returns a new value; nothing mutates
//! a spectrum in place. The construction contract (equal lengths, at least
//! two samples, finite values) is enforced once, here, so downstream code
//! can rely on it.

use serde::{Deserialize, Serialize};

/// Errors returned when spectral data violates the construction contract.
#[derive(Debug, thiserror::Error)]
pub enum SpectrumError {
    /// x and y arrays have different lengths.
    #[error("axis length mismatch: {x_len} x values vs {y_len} y values")]
    LengthMismatch {
        /// Number of x samples supplied.
        x_len: usize,
        /// Number of y samples supplied.
        y_len: usize,
    },

    /// Fewer than two samples.
    #[error("spectrum needs at least 2 samples, got {0}")]
    TooFewSamples(usize),

    /// A NaN or infinite value in the data.
    #[error("non-finite value at index {index} of the {axis} axis")]
    NonFinite {
        /// Which axis held the offending value (`"x"` or `"y"`).
        axis: &'static str,
        /// Index of the offending sample.
        index: usize,
    },

    /// A calibration parameter that is NaN or infinite.
    #[error("calibration parameter {name} must be finite, got {value}")]
    BadCalibration {
        /// Parameter name (`"slope"` or `"intercept"`).
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}

fn check_finite(axis: &'static str, values: &[f64]) -> Result<(), SpectrumError> {
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(SpectrumError::NonFinite { axis, index });
    }
    Ok(())
}

/// An immutable 1-D spectral trace.
///
/// Invariants, enforced by [`Spectrum::new`]:
/// - `x.len() == y.len() >= 2`
/// - every value is finite
///
/// The abscissa may run in either direction; infrared reference exports
/// commonly arrive with decreasing wavenumbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Spectrum {
    /// Build a spectrum, validating the construction contract.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, SpectrumError> {
        if x.len() != y.len() {
            return Err(SpectrumError::LengthMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(SpectrumError::TooFewSamples(x.len()));
        }
        check_finite("x", &x)?;
        check_finite("y", &y)?;
        Ok(Self { x, y })
    }

    /// Abscissa samples.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Ordinate samples.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Number of samples (always at least 2).
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always false; present for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Smallest and largest abscissa value, independent of direction.
    pub fn x_bounds(&self) -> (f64, f64) {
        min_max(&self.x)
    }

    /// Smallest and largest ordinate value.
    pub fn y_bounds(&self) -> (f64, f64) {
        min_max(&self.y)
    }

    /// Apply a linear wavelength calibration `x' = slope * x + intercept`.
    ///
    /// Returns a new spectrum; the ordinate is untouched. Fails if the
    /// parameters are non-finite or the mapped axis overflows.
    pub fn recalibrate(&self, slope: f64, intercept: f64) -> Result<Self, SpectrumError> {
        validate_calibration(slope, intercept)?;
        let x = self.x.iter().map(|v| slope * v + intercept).collect();
        Self::new(x, self.y.clone())
    }
}

/// Tagged points of interest carried by some instrument formats.
///
/// Parallel `x`/`y` lists, possibly empty. Unlike [`Spectrum`], a peak set
/// with zero entries is valid; instruments routinely export none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakSet {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl PeakSet {
    /// Build a peak set, validating lengths and finiteness.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, SpectrumError> {
        if x.len() != y.len() {
            return Err(SpectrumError::LengthMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }
        check_finite("x", &x)?;
        check_finite("y", &y)?;
        Ok(Self { x, y })
    }

    /// Peak positions.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Peak intensities.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Number of peaks.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// True when the set holds no peaks.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Apply the same linear calibration as [`Spectrum::recalibrate`].
    ///
    /// Peak positions move through the identical map so annotations stay
    /// aligned with a recalibrated trace.
    pub fn recalibrate(&self, slope: f64, intercept: f64) -> Result<Self, SpectrumError> {
        validate_calibration(slope, intercept)?;
        let x = self.x.iter().map(|v| slope * v + intercept).collect();
        Self::new(x, self.y.clone())
    }
}

fn validate_calibration(slope: f64, intercept: f64) -> Result<(), SpectrumError> {
    if !slope.is_finite() {
        return Err(SpectrumError::BadCalibration {
            name: "slope",
            value: slope,
        });
    }
    if !intercept.is_finite() {
        return Err(SpectrumError::BadCalibration {
            name: "intercept",
            value: intercept,
        });
    }
    Ok(())
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        if v < lo {
            lo = v;
        }
        if v > hi {
            hi = v;
        }
    }
    (lo, hi)
}
