//! Waveform output.
//!
//! [`IqFormat`] serializes transmit waveforms as interleaved little-endian
//! I/Q pairs, the layout SDR tools and GNU Radio file sources expect.
//!
//! ```rust
//! use loratx_core::io::IqFormat;
//! use loratx_core::types::IQSample;
//!
//! let format: IqFormat = "ci16".parse().unwrap();
//! assert_eq!(format.bytes_per_sample(), 4);
//!
//! let mut buffer = Vec::new();
//! format.write_samples(&mut buffer, &[IQSample::new(0.5, -0.5)]).unwrap();
//! assert_eq!(buffer.len(), 4);
//! ```

mod format;

pub use format::IqFormat;
