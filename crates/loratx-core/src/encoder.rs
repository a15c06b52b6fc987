//! LoRa Packet Encoder
//!
//! Turns message bytes into the symbol indices of one packet. The header and
//! the payload run through the same coding stages with different parameters:
//!
//! ```text
//!                  header (3 bytes)                 raw frame (nibble-swapped)
//!                        │                                     │
//!                        ▼                                     ▼
//!               ┌─────────────────┐                   ┌─────────────────┐
//!               │ Hamming CR 4/8  │                   │ Hamming CR 4/x  │
//!               └─────────────────┘                   └─────────────────┘
//!                        │                                     │ truncate to n_wht
//!                        │                                     ▼
//!                        │                            ┌─────────────────┐
//!                        │                            │    Whitening    │
//!                        │                            └─────────────────┘
//!                        ▼                                     │
//!          5 header codewords + N_pld-1 payload codewords ◄────┤
//!                        │                                     │
//!                        ▼                                     ▼
//!               ┌─────────────────┐                   ┌─────────────────┐
//!               │ Shuffle (8 bit) │                   │ Shuffle (4+CR)  │
//!               │ Interleave SF-2 │                   │ Interleave SF   │
//!               │ Gray (SF-2 bit) │                   │ Gray (SF bit)   │
//!               └─────────────────┘                   └─────────────────┘
//!                        │                                     │
//!                        ▼                                     ▼
//!                 8 symbols × 4           ‖          n_packet - 8 symbols
//! ```
//!
//! The header block is sent at reduced rate: its symbols carry SF-2 bits and
//! are scaled by 4 so they occupy every fourth chirp offset.

use crate::coding::{GrayCode, HammingCode, Interleaver, Shuffler};
use crate::frame::FrameParams;
use crate::packet::{bytes_to_nibbles, PacketHeader, RawFrame};
use crate::params::{CodingRate, SpreadingFactor};
use crate::types::{DspError, DspResult, Symbol};
use crate::whitening::Whitening;

/// Number of symbols in the explicit header block
pub const HEADER_SYMBOLS: usize = 8;

/// Codewords contributed by the header bytes to the header block
pub const HEADER_CODEWORDS: usize = 5;

/// Scaling applied to reduced-rate header symbols
pub const HEADER_SYMBOL_SCALE: Symbol = 4;

/// Output of the packet encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    /// Frame dimensions used for this packet
    pub frame: FrameParams,
    /// Explicit header
    pub header: PacketHeader,
    /// Header symbols in [0, 2^(SF-2) - 1], before scaling
    pub header_symbols: Vec<Symbol>,
    /// Payload symbols in [0, 2^SF - 1]
    pub payload_symbols: Vec<Symbol>,
}

impl EncodedPacket {
    /// Transmit-ready packet: scaled header symbols followed by payload
    pub fn symbols(&self) -> Vec<Symbol> {
        self.header_symbols
            .iter()
            .map(|&s| s * HEADER_SYMBOL_SCALE)
            .chain(self.payload_symbols.iter().copied())
            .collect()
    }

    /// Total number of packet symbols
    pub fn len(&self) -> usize {
        self.header_symbols.len() + self.payload_symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// LoRa packet encoder for one spreading factor / coding rate pair
#[derive(Debug, Clone)]
pub struct PacketEncoder {
    sf: SpreadingFactor,
    cr: CodingRate,
    payload_fec: HammingCode,
    header_fec: HammingCode,
    payload_shuffle: Shuffler,
    header_shuffle: Shuffler,
    payload_interleaver: Interleaver,
    header_interleaver: Interleaver,
    payload_gray: GrayCode,
    header_gray: GrayCode,
}

impl PacketEncoder {
    /// Create a new encoder
    pub fn new(sf: SpreadingFactor, cr: CodingRate) -> Self {
        let bits = sf.value();
        Self {
            sf,
            cr,
            payload_fec: HammingCode::new(cr),
            header_fec: HammingCode::new(CodingRate::CR4_8),
            payload_shuffle: Shuffler::for_rate(cr),
            header_shuffle: Shuffler::for_rate(CodingRate::CR4_8),
            payload_interleaver: Interleaver::new(bits, cr),
            header_interleaver: Interleaver::new(bits - 2, CodingRate::CR4_8),
            payload_gray: GrayCode::new(bits),
            header_gray: GrayCode::new(bits - 2),
        }
    }

    /// Encode a message into header and payload symbols
    pub fn encode(&self, message: &[u8]) -> DspResult<EncodedPacket> {
        let frame = FrameParams::compute(message.len(), self.sf, self.cr)?;
        let header = PacketHeader::new(message.len(), self.cr, true)?;
        let raw = RawFrame::build(message, &frame)?;

        // Payload FEC, truncated to the on-air codeword budget
        let mut codewords = self.payload_fec.encode_all(&raw.nibbles());
        if codewords.len() < frame.n_wht {
            return Err(DspError::InternalInvariant(format!(
                "{} payload codewords cannot cover n_wht = {}",
                codewords.len(),
                frame.n_wht
            )));
        }
        codewords.truncate(frame.n_wht);

        Whitening::new().process(&mut codewords, self.cr);
        tracing::trace!(codewords = ?codewords, "payload whitened");

        let (borrowed, payload) = codewords.split_at(frame.borrowed_codewords());

        // Header block: five header codewords topped up with payload codewords
        let mut header_block: Vec<u8> = self
            .header_fec
            .encode_all(&bytes_to_nibbles(&header.encode()))
            .into_iter()
            .take(HEADER_CODEWORDS)
            .collect();
        header_block.extend_from_slice(borrowed);

        let header_symbols = self.header_gray.encode_all(
            &self
                .header_interleaver
                .interleave(&self.header_shuffle.shuffle_all(&header_block))?,
        )?;

        let payload_symbols = self.payload_gray.encode_all(
            &self
                .payload_interleaver
                .interleave(&self.payload_shuffle.shuffle_all(payload))?,
        )?;

        if header_symbols.len() != HEADER_SYMBOLS
            || payload_symbols.len() != frame.payload_symbols()
        {
            return Err(DspError::InternalInvariant(format!(
                "encoded {} header + {} payload symbols, expected {} + {}",
                header_symbols.len(),
                payload_symbols.len(),
                HEADER_SYMBOLS,
                frame.payload_symbols()
            )));
        }

        tracing::debug!(
            sf = self.sf.value(),
            cr = self.cr.value(),
            header = header_symbols.len(),
            payload = payload_symbols.len(),
            "packet encoded"
        );

        Ok(EncodedPacket {
            frame,
            header,
            header_symbols,
            payload_symbols,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_configs() -> impl Iterator<Item = (SpreadingFactor, CodingRate)> {
        [7u8, 8, 9, 10, 11, 12].into_iter().flat_map(|sf| {
            (1u8..=4).map(move |cr| {
                (
                    SpreadingFactor::from_u8(sf).unwrap(),
                    CodingRate::from_u8(cr).unwrap(),
                )
            })
        })
    }

    #[test]
    fn test_single_byte_packet() {
        let encoder = PacketEncoder::new(SpreadingFactor::SF7, CodingRate::CR4_5);
        let packet = encoder.encode(b"A").unwrap();

        assert_eq!(packet.header_symbols.len(), 8);
        assert_eq!(packet.payload_symbols.len(), 15);
        assert_eq!(packet.len(), packet.frame.n_packet);
        assert_eq!(packet.header.encode(), [6, 0x30, 0xE0]);
        assert!(packet.symbols().iter().all(|&s| s < 128));
    }

    #[test]
    fn test_single_byte_known_symbols() {
        let encoder = PacketEncoder::new(SpreadingFactor::SF7, CodingRate::CR4_5);
        let packet = encoder.encode(b"A").unwrap();

        assert_eq!(packet.header_symbols, vec![6, 3, 5, 0, 24, 29, 24, 29]);
        assert_eq!(
            packet.payload_symbols,
            vec![58, 15, 126, 11, 15, 70, 24, 32, 18, 95, 116, 3, 39, 34, 6]
        );
    }

    fn gray_decode(g: Symbol) -> Symbol {
        let mut value = g;
        let mut shift = g >> 1;
        while shift != 0 {
            value ^= shift;
            shift >>= 1;
        }
        value
    }

    /// Undo Gray coding and the diagonal interleave of the 8-symbol header block
    fn header_codewords(header_symbols: &[Symbol], rows: usize) -> Vec<u8> {
        let symbols: Vec<Symbol> = header_symbols.iter().map(|&s| gray_decode(s)).collect();
        (0..rows)
            .map(|i| {
                (0..HEADER_SYMBOLS).fold(0u8, |cw, j| {
                    let bit = (symbols[(i + j) % HEADER_SYMBOLS] >> i) & 1;
                    cw | ((bit as u8) << j)
                })
            })
            .collect()
    }

    #[test]
    fn test_header_block_carries_whitened_payload() {
        let message = b"borrowed codewords";
        let shuffle = Shuffler::new(8);
        let configs = [
            (SpreadingFactor::SF8, CodingRate::CR4_5),
            (SpreadingFactor::SF9, CodingRate::CR4_6),
            (SpreadingFactor::SF12, CodingRate::CR4_8),
        ];

        for (sf, cr) in configs {
            let packet = PacketEncoder::new(sf, cr).encode(message).unwrap();
            let rows = sf.value() as usize - 2;
            let borrowed = sf.value() as usize - 7;
            let codewords = header_codewords(&packet.header_symbols, rows);

            // Header codewords go out at CR 4/8 without whitening
            let header_fec = HammingCode::new(CodingRate::CR4_8);
            let expected_header: Vec<u8> = bytes_to_nibbles(&packet.header.encode())
                [..HEADER_CODEWORDS]
                .iter()
                .map(|&n| shuffle.shuffle(header_fec.encode(n)))
                .collect();
            assert_eq!(&codewords[..HEADER_CODEWORDS], expected_header.as_slice(), "{}", sf);

            // The rest of the block is the start of the whitened payload
            let frame = FrameParams::compute(message.len(), sf, cr).unwrap();
            let raw = RawFrame::build(message, &frame).unwrap();
            let mut payload = HammingCode::new(cr).encode_all(&raw.nibbles());
            payload.truncate(frame.n_wht);
            Whitening::new().process(&mut payload, cr);
            let expected_borrowed: Vec<u8> =
                payload[..borrowed].iter().map(|&cw| shuffle.shuffle(cw)).collect();

            assert_eq!(borrowed, frame.borrowed_codewords());
            assert_eq!(&codewords[HEADER_CODEWORDS..], expected_borrowed.as_slice(), "{}", sf);
        }
    }

    #[test]
    fn test_symbol_ranges_all_configs() {
        let messages: [&[u8]; 4] = [b"", b"A", b"Hello World!", &[0xA5; 64]];
        for (sf, cr) in all_configs() {
            let encoder = PacketEncoder::new(sf, cr);
            let m = sf.chips_per_symbol() as u16;
            for message in messages {
                let packet = encoder.encode(message).unwrap();
                assert!(packet.header_symbols.iter().all(|&s| s < m / 4), "{} CR{}", sf, cr);
                assert!(packet.payload_symbols.iter().all(|&s| s < m), "{} CR{}", sf, cr);
                assert!(packet.symbols().iter().all(|&s| s < m));
                assert_eq!(packet.len(), packet.frame.n_packet);
            }
        }
    }

    #[test]
    fn test_header_symbols_scaled() {
        let encoder = PacketEncoder::new(SpreadingFactor::SF9, CodingRate::CR4_6);
        let packet = encoder.encode(b"scale").unwrap();
        let symbols = packet.symbols();

        for (scaled, &raw) in symbols.iter().zip(packet.header_symbols.iter()) {
            assert_eq!(*scaled, raw * 4);
            assert_eq!(scaled % 4, 0);
        }
        assert_eq!(&symbols[8..], packet.payload_symbols.as_slice());
    }

    #[test]
    fn test_deterministic() {
        let encoder = PacketEncoder::new(SpreadingFactor::SF8, CodingRate::CR4_8);
        assert_eq!(encoder.encode(b"repeat").unwrap(), encoder.encode(b"repeat").unwrap());
    }

    #[test]
    fn test_message_changes_payload_only() {
        let encoder = PacketEncoder::new(SpreadingFactor::SF7, CodingRate::CR4_5);
        let a = encoder.encode(b"AAAA").unwrap();
        let b = encoder.encode(b"AAAB").unwrap();

        assert_eq!(a.header_symbols, b.header_symbols);
        assert_ne!(a.payload_symbols, b.payload_symbols);
    }

    #[test]
    fn test_header_depends_on_length() {
        let encoder = PacketEncoder::new(SpreadingFactor::SF7, CodingRate::CR4_5);
        let short = encoder.encode(b"ab").unwrap();
        let long = encoder.encode(b"abc").unwrap();
        assert_ne!(short.header_symbols, long.header_symbols);
    }

    #[test]
    fn test_zero_padding_boundary_encodes() {
        let encoder = PacketEncoder::new(SpreadingFactor::SF7, CodingRate::CR4_5);
        let packet = encoder.encode(b"seven!!").unwrap();
        assert_eq!(packet.frame.n_pad, 0);
        assert_eq!(packet.len(), 28);
    }

    #[test]
    fn test_message_too_long() {
        let encoder = PacketEncoder::new(SpreadingFactor::SF12, CodingRate::CR4_8);
        assert!(matches!(
            encoder.encode(&[0u8; 300]),
            Err(DspError::FrameTooLarge { len: 300, .. })
        ));
    }
}
