//! I/Q sample file formats.
//!
//! | Format | Bytes/Sample | Encoding |
//! |--------|--------------|----------|
//! | Cf64   | 16           | f64 I, f64 Q |
//! | Cf32   | 8            | f32 I, f32 Q |
//! | Ci16   | 4            | i16 I, i16 Q, scaled by 32767 |
//! | Ci8    | 2            | i8 I, i8 Q, scaled by 127 |
//!
//! Integer formats clamp to the type range. A chirp at 0 dB has unit
//! magnitude, so only boosted waveforms reach the clamp.

use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::IQSample;

/// Binary I/Q sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IqFormat {
    /// Complex float64, full precision
    Cf64,
    /// Complex float32, GNU Radio `gr_complex`
    #[default]
    Cf32,
    /// Complex signed int16
    Ci16,
    /// Complex signed int8
    Ci8,
}

impl IqFormat {
    /// Size of one I/Q pair in bytes
    #[inline]
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            IqFormat::Cf64 => 16,
            IqFormat::Cf32 => 8,
            IqFormat::Ci16 => 4,
            IqFormat::Ci8 => 2,
        }
    }

    /// Short name used on the command line
    pub const fn short_name(&self) -> &'static str {
        match self {
            IqFormat::Cf64 => "cf64",
            IqFormat::Cf32 => "cf32",
            IqFormat::Ci16 => "ci16",
            IqFormat::Ci8 => "ci8",
        }
    }

    /// All supported formats
    pub const fn all() -> &'static [IqFormat] {
        &[IqFormat::Cf64, IqFormat::Cf32, IqFormat::Ci16, IqFormat::Ci8]
    }

    /// Look up a format by name or common alias, case-insensitive
    ///
    /// | Format | Aliases |
    /// |--------|---------|
    /// | Cf64   | f64, cf64, cf64_le, complex64 |
    /// | Cf32   | f32, cf32, cf32_le, float, float32 |
    /// | Ci16   | i16, ci16, ci16_le, sc16, int16, short |
    /// | Ci8    | i8, ci8, sc8, int8 |
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "f64" | "cf64" | "cf64_le" | "complex64" => Some(IqFormat::Cf64),
            "f32" | "cf32" | "cf32_le" | "float" | "float32" => Some(IqFormat::Cf32),
            "i16" | "ci16" | "ci16_le" | "sc16" | "int16" | "short" => Some(IqFormat::Ci16),
            "i8" | "ci8" | "sc8" | "int8" => Some(IqFormat::Ci8),
            _ => None,
        }
    }

    /// Append the encoding of one sample to `out`
    fn encode_into(&self, sample: &IQSample, out: &mut Vec<u8>) {
        match self {
            IqFormat::Cf64 => {
                out.extend_from_slice(&sample.re.to_le_bytes());
                out.extend_from_slice(&sample.im.to_le_bytes());
            }
            IqFormat::Cf32 => {
                out.extend_from_slice(&(sample.re as f32).to_le_bytes());
                out.extend_from_slice(&(sample.im as f32).to_le_bytes());
            }
            IqFormat::Ci16 => {
                let re = (sample.re * 32767.0).clamp(-32768.0, 32767.0) as i16;
                let im = (sample.im * 32767.0).clamp(-32768.0, 32767.0) as i16;
                out.extend_from_slice(&re.to_le_bytes());
                out.extend_from_slice(&im.to_le_bytes());
            }
            IqFormat::Ci8 => {
                let re = (sample.re * 127.0).clamp(-128.0, 127.0) as i8;
                let im = (sample.im * 127.0).clamp(-128.0, 127.0) as i8;
                out.extend_from_slice(&re.to_le_bytes());
                out.extend_from_slice(&im.to_le_bytes());
            }
        }
    }

    /// Convert samples to raw bytes
    pub fn to_bytes(&self, samples: &[IQSample]) -> Vec<u8> {
        let mut data = Vec::with_capacity(samples.len() * self.bytes_per_sample());
        for sample in samples {
            self.encode_into(sample, &mut data);
        }
        data
    }

    /// Write samples to `writer`, returning the number of bytes written
    pub fn write_samples<W: Write>(
        &self,
        writer: &mut W,
        samples: &[IQSample],
    ) -> io::Result<usize> {
        let data = self.to_bytes(samples);
        writer.write_all(&data)?;
        Ok(data.len())
    }
}

impl std::fmt::Display for IqFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl FromStr for IqFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IqFormat::from_name(s).ok_or_else(|| {
            format!(
                "unknown I/Q format '{}', expected one of: {}",
                s,
                IqFormat::all()
                    .iter()
                    .map(|f| f.short_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        assert_eq!(IqFormat::from_name("SC16"), Some(IqFormat::Ci16));
        assert_eq!(IqFormat::from_name("float"), Some(IqFormat::Cf32));
        assert_eq!(IqFormat::from_name("complex64"), Some(IqFormat::Cf64));
        assert_eq!(IqFormat::from_name("int8"), Some(IqFormat::Ci8));
        assert_eq!(IqFormat::from_name("cu8"), None);
        assert!("bogus".parse::<IqFormat>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for &format in IqFormat::all() {
            assert_eq!(format.to_string().parse::<IqFormat>(), Ok(format));
        }
    }

    #[test]
    fn test_byte_lengths() {
        let samples = vec![IQSample::new(0.25, -0.75); 10];
        for &format in IqFormat::all() {
            assert_eq!(format.to_bytes(&samples).len(), 10 * format.bytes_per_sample());
        }
    }

    #[test]
    fn test_little_endian_layout() {
        let sample = IQSample::new(1.0, -1.0);

        assert_eq!(IqFormat::Ci16.to_bytes(&[sample]), vec![0xFF, 0x7F, 0x01, 0x80]);
        assert_eq!(IqFormat::Ci8.to_bytes(&[sample]), vec![0x7F, 0x81]);

        let cf32 = IqFormat::Cf32.to_bytes(&[sample]);
        assert_eq!(&cf32[..4], &1.0f32.to_le_bytes());
        assert_eq!(&cf32[4..], &(-1.0f32).to_le_bytes());
    }

    #[test]
    fn test_integer_formats_clamp() {
        let loud = IQSample::new(4.0, -4.0);
        assert_eq!(IqFormat::Ci16.to_bytes(&[loud]), vec![0xFF, 0x7F, 0x00, 0x80]);
        assert_eq!(IqFormat::Ci8.to_bytes(&[loud]), vec![0x7F, 0x80]);
    }

    #[test]
    fn test_write_samples() {
        let samples = vec![IQSample::new(0.5, 0.5); 3];
        let mut buffer = Vec::new();
        let written = IqFormat::Cf64.write_samples(&mut buffer, &samples).unwrap();
        assert_eq!(written, 48);
        assert_eq!(buffer, IqFormat::Cf64.to_bytes(&samples));
    }
}
