//! Packet Length Calculation
//!
//! Every LoRa symbol carries a fixed number of bits, so the number of symbols
//! on air is rounded up to whole interleaver blocks. This module derives the
//! packet dimensions from the message length, spreading factor and coding
//! rate.
//!
//! ```text
//! n_packet = 8 + max(0, ceil((8(L+5) - 4SF + 28 + 16) / 4SF) * (CR+4))
//! n_wht    = SF * floor((n_packet - 8) / (4+CR)) + N_pld - 1
//! n_pld    = ceil((n_wht + N_pld - 1) / 2)
//! n_pad    = n_pld - 5 - L - 2
//! ```
//!
//! The CRC flag is always set and the header is always explicit, so the
//! `16·CRC` and `20·IH` terms of the LoRa symbol count formula reduce to
//! constants. Low data rate optimisation is not supported.

use serde::{Deserialize, Serialize};

use crate::params::{CodingRate, SpreadingFactor};
use crate::types::{DspError, DspResult};

/// Bytes preceding the message in the raw frame
pub const FRAME_PREFIX_LEN: usize = 4;
/// Reserved bytes following the message in the raw frame
pub const FRAME_RESERVED_LEN: usize = 1;
/// CRC placeholder bytes
pub const CRC_LEN: usize = 2;
/// Largest message whose length still fits the header length byte (`L + 5`)
pub const MAX_MESSAGE_LEN: usize = 255 - (FRAME_PREFIX_LEN + FRAME_RESERVED_LEN);

/// Packet-length parameters derived for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameParams {
    /// Spreading factor the frame was sized for
    pub sf: SpreadingFactor,
    /// Coding rate the frame was sized for
    pub cr: CodingRate,
    /// Message length in bytes
    pub message_len: usize,
    /// Total packet symbols (8 header symbols + payload symbols)
    pub n_packet: usize,
    /// Number of whitened codewords kept after truncation
    pub n_wht: usize,
    /// Payload length in bytes before the header-borrowed padding
    pub n_pld: usize,
    /// Zero padding bytes appended after the CRC placeholder
    pub n_pad: usize,
}

impl FrameParams {
    /// Compute the frame dimensions for a message of `len` bytes
    ///
    /// Fails with [`DspError::FrameTooLarge`] when the message cannot be
    /// carried with the chosen spreading factor and coding rate.
    pub fn compute(len: usize, sf: SpreadingFactor, cr: CodingRate) -> DspResult<Self> {
        if len > MAX_MESSAGE_LEN {
            return Err(DspError::FrameTooLarge {
                len,
                max: MAX_MESSAGE_LEN,
            });
        }

        let sf_i = sf.value() as i64;
        let cw = cr.output_bits() as i64;
        let n_hdr = sf.header_nibbles() as i64;
        let l = len as i64;

        let num = 8 * (l + 5) - 4 * sf_i + 28 + 16;
        let den = 4 * sf_i;
        let blocks = div_ceil(num, den).max(0);
        let n_packet = 8 + blocks * cw;

        let n_wht = sf_i * ((n_packet - 8) / cw) + n_hdr - 1;
        let n_pld = div_ceil(n_wht + n_hdr - 1, 2);
        let n_pad = n_pld - (FRAME_PREFIX_LEN + FRAME_RESERVED_LEN) as i64 - l - CRC_LEN as i64;

        if n_pad < 0 {
            let max = (n_pld - (FRAME_PREFIX_LEN + FRAME_RESERVED_LEN + CRC_LEN) as i64).max(0);
            return Err(DspError::FrameTooLarge {
                len,
                max: max as usize,
            });
        }

        let frame = Self {
            sf,
            cr,
            message_len: len,
            n_packet: n_packet as usize,
            n_wht: n_wht as usize,
            n_pld: n_pld as usize,
            n_pad: n_pad as usize,
        };

        tracing::debug!(
            len,
            sf = sf.value(),
            cr = cr.value(),
            n_packet = frame.n_packet,
            n_wht = frame.n_wht,
            n_pld = frame.n_pld,
            n_pad = frame.n_pad,
            "frame sized"
        );

        Ok(frame)
    }

    /// Header nibble count N_pld for this frame's spreading factor
    pub fn header_nibbles(&self) -> usize {
        self.sf.header_nibbles()
    }

    /// Number of payload codewords that ride in the header block
    pub fn borrowed_codewords(&self) -> usize {
        self.header_nibbles() - 1
    }

    /// Payload codewords interleaved in SF-high blocks
    pub fn payload_codewords(&self) -> usize {
        self.n_wht - self.borrowed_codewords()
    }

    /// Number of payload symbols following the 8 header symbols
    pub fn payload_symbols(&self) -> usize {
        self.n_packet - 8
    }

    /// Length of the raw frame in bytes, including the trailing padding that
    /// covers the header-borrowed nibbles
    pub fn raw_frame_len(&self) -> usize {
        self.n_pld + self.borrowed_codewords()
    }
}

fn div_ceil(num: i64, den: i64) -> i64 {
    num.div_euclid(den) + i64::from(num.rem_euclid(den) != 0)
}
