//! Guards for physical inputs read from configuration.

use crate::DhError;

pub fn ensure_finite(value: f64, what: &'static str) -> Result<f64, DhError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DhError::NonFinite { what, value })
    }
}

/// Finite and strictly positive (densities, diameters, conductivities).
pub fn ensure_positive(value: f64, what: &'static str) -> Result<f64, DhError> {
    if ensure_finite(value, what)? > 0.0 {
        Ok(value)
    } else {
        Err(DhError::OutOfRange {
            what,
            value,
            expected: "> 0",
        })
    }
}

/// Finite and `>= 0` (roughness, surface resistance).
pub fn ensure_non_negative(value: f64, what: &'static str) -> Result<f64, DhError> {
    if ensure_finite(value, what)? >= 0.0 {
        Ok(value)
    } else {
        Err(DhError::OutOfRange {
            what,
            value,
            expected: ">= 0",
        })
    }
}
