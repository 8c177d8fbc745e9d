//! Construction-time errors shared by snn-core and snn-core-plus.
//!
//! Tick-time operations never fail; every check happens when a population,
//! projection or learning rule is built.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnnError {
    #[error("invalid parameter {name} = {value}: expected {expected}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("invalid weight bounds: w_min ({w_min}) > w_max ({w_max})")]
    InvalidWeightBounds { w_min: f64, w_max: f64 },

    #[error("source of size {size} has no square layout with {channels} channel(s)")]
    NonSquareLayout { size: usize, channels: usize },

    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("kernel {kernel_h}x{kernel_w} does not fit padded field {field_h}x{field_w}")]
    KernelTooLarge {
        kernel_h: usize,
        kernel_w: usize,
        field_h: usize,
        field_w: usize,
    },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),
}

pub type SnnResult<T, E = SnnError> = core::result::Result<T, E>;

/// Rejects non-finite or non-positive values (time constants, step sizes).
pub fn require_positive(name: &'static str, value: f64) -> SnnResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SnnError::InvalidParameter {
            name,
            value,
            expected: "> 0",
        })
    }
}

pub fn require_finite(name: &'static str, value: f64) -> SnnResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SnnError::InvalidParameter {
            name,
            value,
            expected: "a finite value",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = SnnError::InvalidParameter {
            name: "tau",
            value: 0.0,
            expected: "> 0",
        };
        assert_eq!(format!("{}", err), "invalid parameter tau = 0: expected > 0");
        assert_eq!(
            format!("{}", SnnError::InvalidWeightBounds { w_min: 2.0, w_max: 1.0 }),
            "invalid weight bounds: w_min (2) > w_max (1)"
        );
        assert_eq!(
            format!("{}", SnnError::NonSquareLayout { size: 10, channels: 1 }),
            "source of size 10 has no square layout with 1 channel(s)"
        );
        assert_eq!(format!("{}", SnnError::InvalidGeometry("x")), "invalid geometry: x");
    }

    #[test]
    fn positive_checks() {
        assert!(require_positive("dt", 1.0).is_ok());
        assert!(require_positive("dt", 0.0).is_err());
        assert!(require_positive("dt", -1.0).is_err());
        assert!(require_positive("dt", f64::NAN).is_err());
        assert!(require_finite("v_rest", -65.0).is_ok());
        assert!(require_finite("v_rest", f64::INFINITY).is_err());
    }
}
