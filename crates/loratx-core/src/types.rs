//! Core types for LoRa packet encoding and modulation
//!
//! This module defines the fundamental types shared by the encoder and the
//! modulator, particularly the complex I/Q sample representation and the
//! error type returned by every fallible operation.
//!
//! ## Understanding I/Q Samples
//!
//! The modulator produces complex baseband samples where:
//! - **I (In-phase)**: The real component, aligned with the reference carrier
//! - **Q (Quadrature)**: The imaginary component, 90° out of phase
//!
//! A LoRa chirp is a constant-envelope signal, so every sample sits on the
//! unit circle and only its phase carries information:
//!
//! ```text
//!            Q (Imaginary)
//!            ^
//!            |     * (I=0.7, Q=0.7)
//!            |    /
//!            |   / magnitude = 1.0
//!            |  /  phase = 45°
//!            | /
//!   ---------+---------> I (Real)
//!            |
//! ```

use num_complex::Complex64;
use std::f64::consts::PI;

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// A single I/Q sample point
pub type IQSample = Complex64;

/// A buffer of I/Q samples
pub type IQBuffer = Vec<IQSample>;

/// Represents a symbol in the LoRa modulation scheme
///
/// Symbols are integers from 0 to 2^SF - 1, where SF is the spreading factor.
/// Each symbol encodes SF bits of data.
pub type Symbol = u16;

/// Result type for encoder and modulator operations
pub type DspResult<T> = Result<T, DspError>;

/// Errors that can occur while encoding or modulating a packet
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DspError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Frame too large: message of {len} bytes exceeds the limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Symbol out of range: {symbol} exceeds maximum {max}")]
    SymbolOutOfRange { symbol: u32, max: u32 },

    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl DspError {
    /// Shorthand for building an [`DspError::InvalidParameter`]
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Helper functions for working with complex samples
pub mod complex_ops {
    use super::*;

    /// Create a complex number from magnitude and phase
    #[inline]
    pub fn from_polar(magnitude: f64, phase: f64) -> Complex {
        Complex::new(magnitude * phase.cos(), magnitude * phase.sin())
    }

    /// Compute the power (magnitude squared) of a complex number
    #[inline]
    pub fn power(c: Complex) -> f64 {
        c.norm_sqr()
    }

    /// Compute the average power of a signal
    pub fn average_power(samples: &[IQSample]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().map(|s| power(*s)).sum::<f64>() / samples.len() as f64
    }

    /// Average power in dB relative to a unit-magnitude signal
    pub fn average_power_db(samples: &[IQSample]) -> f64 {
        10.0 * average_power(samples).log10()
    }

    /// Generate a complex exponential (cisoid) at given frequency
    ///
    /// Returns e^(j*2*π*f*t) where t = sample_idx / sample_rate
    #[inline]
    pub fn cis(frequency: f64, sample_idx: usize, sample_rate: f64) -> Complex {
        let t = sample_idx as f64 / sample_rate;
        from_polar(1.0, 2.0 * PI * frequency * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_complex_from_polar() {
        let c = complex_ops::from_polar(1.0, PI / 4.0);
        assert_relative_eq!(c.re, 0.7071067811865476, epsilon = 1e-10);
        assert_relative_eq!(c.im, 0.7071067811865476, epsilon = 1e-10);
    }

    #[test]
    fn test_average_power() {
        let samples = vec![
            Complex::new(1.0, 0.0),
            Complex::new(0.0, 1.0),
            Complex::new(-1.0, 0.0),
            Complex::new(0.0, -1.0),
        ];
        assert_relative_eq!(complex_ops::average_power(&samples), 1.0, epsilon = 1e-10);
        assert_relative_eq!(complex_ops::average_power_db(&samples), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_cis_quarter_turn() {
        // 250 Hz at 1 kHz sample rate advances a quarter turn per sample
        let c = complex_ops::cis(250.0, 1, 1000.0);
        assert_relative_eq!(c.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.im, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_error_display() {
        let err = DspError::SymbolOutOfRange { symbol: 200, max: 127 };
        assert_eq!(err.to_string(), "Symbol out of range: 200 exceeds maximum 127");
    }
}
