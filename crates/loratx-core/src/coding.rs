//! Coding stages of the LoRa transmit chain
//!
//! This module implements the per-codeword coding primitives:
//!
//! 1. **Hamming FEC**: 4 data bits → 4+CR bit codeword
//! 2. **Shuffle**: fixed bit permutation inside each codeword
//! 3. **Interleaving**: diagonal spreading of codeword bits across symbols
//! 4. **Gray Coding**: maps symbols so that neighbours differ by one bit
//!
//! Whitening lives in [`crate::whitening`].
//!
//! ## Processing Pipeline
//!
//! ```text
//! TX: Nibbles → Hamming → (Whiten) → Shuffle → Interleave → Gray
//! ```
//!
//! ## Gray Coding
//!
//! Gray code ensures that adjacent symbols differ by only one bit. A small
//! frequency estimation error at the receiver lands on a neighbouring chirp
//! offset and costs a single bit instead of many.
//!
//! ```text
//! Binary  Gray
//! 000     000
//! 001     001
//! 010     011  ← Only 1 bit different from neighbors
//! 011     010
//! 100     110
//! ...
//! ```
//!
//! ## Hamming Codes
//!
//! - 4/5: 1 parity bit (simple parity)
//! - 4/6: 2 parity bits
//! - 4/7: Hamming(7,4)
//! - 4/8: extended Hamming(8,4)

use crate::params::CodingRate;
use crate::types::{DspError, DspResult, Symbol};

/// Gray code encoder
#[derive(Debug, Clone)]
pub struct GrayCode {
    /// Lookup table: binary → gray
    encode_lut: Vec<u16>,
}

impl GrayCode {
    /// Create a Gray code converter for the given number of bits
    pub fn new(bits: u8) -> Self {
        let size = 1usize << bits;

        // g = n ^ (n >> 1)
        let encode_lut = (0..size).map(|n| (n ^ (n >> 1)) as u16).collect();

        Self { encode_lut }
    }

    /// Encode a binary value to Gray code
    ///
    /// Fails when `value` does not fit in the configured width.
    #[inline]
    pub fn encode(&self, value: Symbol) -> DspResult<Symbol> {
        self.encode_lut
            .get(value as usize)
            .copied()
            .ok_or(DspError::SymbolOutOfRange {
                symbol: value as u32,
                max: (self.encode_lut.len() - 1) as u32,
            })
    }

    /// Encode multiple symbols
    pub fn encode_all(&self, symbols: &[Symbol]) -> DspResult<Vec<Symbol>> {
        symbols.iter().map(|&s| self.encode(s)).collect()
    }
}

/// Hamming code encoder for LoRa FEC
///
/// Systematic: the data nibble stays in bits 0..3 and the CR parity bits are
/// placed at bits 4..4+CR.
#[derive(Debug, Clone)]
pub struct HammingCode {
    /// Parity rows over (d3, d2, d1, d0)
    parity_matrix: &'static [[u8; 4]],
}

impl HammingCode {
    /// Create a Hamming coder for the given coding rate
    pub fn new(rate: CodingRate) -> Self {
        Self {
            parity_matrix: Self::parity_matrix(rate),
        }
    }

    fn parity_matrix(rate: CodingRate) -> &'static [[u8; 4]] {
        match rate {
            CodingRate::CR4_5 => &[[1, 1, 1, 1]],
            CodingRate::CR4_6 => &[[1, 0, 1, 1], [0, 1, 1, 1]],
            CodingRate::CR4_7 => &[[1, 0, 1, 1], [1, 1, 1, 0], [0, 1, 1, 1]],
            CodingRate::CR4_8 => &[[1, 0, 1, 1], [1, 1, 1, 0], [1, 1, 0, 1], [0, 1, 1, 1]],
        }
    }

    /// Encode the low 4 bits of `data` into a 4+CR bit codeword
    pub fn encode(&self, data: u8) -> u8 {
        let data_bits: [u8; 4] = std::array::from_fn(|i| (data >> (3 - i)) & 1);

        let mut codeword = data & 0x0F;

        for (i, row) in self.parity_matrix.iter().enumerate() {
            let parity = row
                .iter()
                .zip(data_bits.iter())
                .fold(0u8, |acc, (&p, &d)| acc ^ (p & d));

            codeword |= parity << (4 + i);
        }

        codeword
    }

    /// Encode a nibble stream
    pub fn encode_all(&self, nibbles: &[u8]) -> Vec<u8> {
        nibbles.iter().map(|&n| self.encode(n)).collect()
    }
}

/// LoRa bit shuffle pattern for 8-bit codewords
pub const SHUFFLE_PATTERN: [u8; 8] = [5, 0, 1, 2, 4, 3, 6, 7];

/// Intra-codeword bit permutation
///
/// Narrower codewords use [`SHUFFLE_PATTERN`] with the out-of-range entries
/// dropped, which keeps the table a permutation of `0..width`.
#[derive(Debug, Clone)]
pub struct Shuffler {
    pattern: Vec<u8>,
    mask: u8,
}

impl Shuffler {
    /// Create a shuffler for codewords of `width` bits (5..=8)
    pub fn new(width: u8) -> Self {
        debug_assert!((5..=8).contains(&width));
        let pattern = SHUFFLE_PATTERN.iter().copied().filter(|&p| p < width).collect();
        let mask = ((1u16 << width) - 1) as u8;
        Self { pattern, mask }
    }

    /// Create the shuffler for a coding rate's codeword width
    pub fn for_rate(cr: CodingRate) -> Self {
        Self::new(cr.output_bits())
    }

    /// The permutation table in use
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// Move input bit `j` to output bit `pattern[j]`, masked to the width
    pub fn shuffle(&self, codeword: u8) -> u8 {
        let out = self
            .pattern
            .iter()
            .enumerate()
            .fold(0u8, |acc, (j, &p)| acc | (((codeword >> j) & 1) << p));
        out & self.mask
    }

    pub fn shuffle_all(&self, codewords: &[u8]) -> Vec<u8> {
        codewords.iter().map(|&cw| self.shuffle(cw)).collect()
    }
}

/// Diagonal interleaver
///
/// Interleaving spreads the bits of each codeword across several symbols, so
/// a corrupted symbol damages many codewords slightly rather than destroying
/// one completely.
#[derive(Debug, Clone)]
pub struct Interleaver {
    /// Codewords per block (bits per output symbol)
    rows: u8,
    /// Coding rate (determines codeword width and symbols per block)
    cr: CodingRate,
}

impl Interleaver {
    /// Create a new interleaver with blocks of `rows` codewords
    ///
    /// The payload uses `rows = SF`, the header `rows = SF - 2` at CR 4/8.
    pub fn new(rows: u8, cr: CodingRate) -> Self {
        Self { rows, cr }
    }

    /// Number of symbols produced per block
    pub fn symbols_per_block(&self) -> usize {
        self.cr.output_bits() as usize
    }

    /// Interleave one block of `rows` codewords
    ///
    /// Takes `rows` codewords of (4+CR) bits each and produces (4+CR) symbols
    /// of `rows` bits each.
    pub fn interleave_block(&self, codewords: &[u8]) -> DspResult<Vec<Symbol>> {
        let rows = self.rows as usize;
        let n_bits = self.cr.output_bits() as usize;

        if codewords.len() != rows {
            return Err(DspError::InternalInvariant(format!(
                "interleaver block needs {} codewords, got {}",
                rows,
                codewords.len()
            )));
        }

        let mut symbols = vec![0u16; n_bits];

        for (i, &cw) in codewords.iter().enumerate() {
            for j in 0..n_bits {
                let bit = (cw >> j) & 1;
                symbols[(i + j) % n_bits] |= (bit as u16) << i;
            }
        }

        Ok(symbols)
    }

    /// Interleave a codeword stream made of whole blocks
    pub fn interleave(&self, codewords: &[u8]) -> DspResult<Vec<Symbol>> {
        let rows = self.rows as usize;
        if codewords.len() % rows != 0 {
            return Err(DspError::InternalInvariant(format!(
                "{} codewords do not fill blocks of {}",
                codewords.len(),
                rows
            )));
        }

        let mut symbols = Vec::with_capacity(codewords.len() / rows * self.symbols_per_block());
        for block in codewords.chunks(rows) {
            symbols.extend(self.interleave_block(block)?);
        }
        Ok(symbols)
    }
}
