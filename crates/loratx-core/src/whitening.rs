//! Data Whitening for LoRa
//!
//! Whitening (also called scrambling) is used to:
//! 1. Eliminate long runs of 0s or 1s in the data
//! 2. Provide DC balance to the transmitted signal
//! 3. Reduce spectral peaks
//!
//! ## How Whitening Works
//!
//! An 8-bit Linear Feedback Shift Register (LFSR) generates a pseudo-random
//! byte sequence. Each payload codeword is XORed with the next byte, masked
//! to the codeword width. The header is not whitened. The seed is the same
//! for every packet.
//!
//! ## LFSR Structure
//!
//! Polynomial x^8 + x^6 + x^5 + x^4 + 1, seed 0xFF. Each step shifts left
//! and feeds back the parity of bits 7, 5, 4 and 3:
//!
//! ```text
//! ┌───┬───┬───┬───┬───┬───┬───┬───┐
//! │ 7 │ 6 │ 5 │ 4 │ 3 │ 2 │ 1 │ 0 │ ◄── feedback
//! └─┬─┴───┴─┬─┴─┬─┴─┬─┴───┴───┴───┘
//!   │       │   │   │
//!   └───────┴───┴───┴──XOR──► feedback
//! ```
//!
//! Sequence: FF FE FC F8 F0 E1 C2 85 0B 17 2F 5E BC 78 F1 E3 ...

use crate::params::CodingRate;

/// LFSR-based whitening for LoRa payload codewords
#[derive(Debug, Clone)]
pub struct Whitening {
    /// Current LFSR state
    state: u8,
}

impl Default for Whitening {
    fn default() -> Self {
        Self::new()
    }
}

impl Whitening {
    /// Initial LFSR state: all 1s
    const INITIAL_STATE: u8 = 0xFF;

    /// Feedback taps at bits 7, 5, 4, 3
    const FEEDBACK_TAPS: u8 = 0xB8;

    /// Create a new whitening instance with default initial state
    pub fn new() -> Self {
        Self {
            state: Self::INITIAL_STATE,
        }
    }

    /// Reset the LFSR to initial state
    pub fn reset(&mut self) {
        self.state = Self::INITIAL_STATE;
    }

    /// Get the current LFSR state
    pub fn state(&self) -> u8 {
        self.state
    }

    /// Return the current whitening byte and advance the LFSR
    fn next_byte(&mut self) -> u8 {
        let out = self.state;
        let feedback = ((self.state & Self::FEEDBACK_TAPS).count_ones() & 1) as u8;
        self.state = (self.state << 1) | feedback;
        out
    }

    /// Whiten codewords of the given coding rate in place
    ///
    /// XOR is its own inverse, so applying this twice from the same state
    /// restores the input.
    pub fn process(&mut self, codewords: &mut [u8], cr: CodingRate) {
        let mask = ((1u16 << cr.output_bits()) - 1) as u8;
        for cw in codewords.iter_mut() {
            *cw ^= self.next_byte() & mask;
        }
    }

    /// Whiten codewords and return a new buffer
    pub fn whiten(&mut self, codewords: &[u8], cr: CodingRate) -> Vec<u8> {
        let mut result = codewords.to_vec();
        self.process(&mut result, cr);
        result
    }

    /// Generate whitening sequence of given length
    pub fn generate_sequence(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.next_byte()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sequence() {
        let mut whitening = Whitening::new();
        assert_eq!(
            whitening.generate_sequence(16),
            vec![
                0xFF, 0xFE, 0xFC, 0xF8, 0xF0, 0xE1, 0xC2, 0x85, 0x0B, 0x17, 0x2F, 0x5E, 0xBC,
                0x78, 0xF1, 0xE3
            ]
        );
    }

    #[test]
    fn test_whitening_reversible() {
        let original: Vec<u8> = (0..40u8).map(|i| i.wrapping_mul(29) & 0x7F).collect();

        let mut whitening = Whitening::new();
        let whitened = whitening.whiten(&original, CodingRate::CR4_7);

        whitening.reset();
        let mut recovered = whitened.clone();
        whitening.process(&mut recovered, CodingRate::CR4_7);

        assert_eq!(original, recovered);
    }

    #[test]
    fn test_whitening_respects_codeword_width() {
        let mut whitening = Whitening::new();
        let whitened = whitening.whiten(&[0u8; 32], CodingRate::CR4_5);

        assert!(whitened.iter().all(|&cw| cw < 1 << 5));
        assert_eq!(&whitened[..4], &[0x1F, 0x1E, 0x1C, 0x18]);
    }

    #[test]
    fn test_lfsr_maximal_period() {
        let mut whitening = Whitening::new();
        let start = whitening.state();

        let mut period = 0;
        for i in 1..=256 {
            whitening.next_byte();
            if whitening.state() == start {
                period = i;
                break;
            }
        }

        assert_eq!(period, 255);
    }
}
