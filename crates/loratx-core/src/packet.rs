//! LoRa Packet Structure
//!
//! This module builds the byte-level content of a packet before any coding
//! is applied: the explicit header and the raw payload frame.
//!
//! ## Packet Structure
//!
//! ```text
//! ┌──────────┬───────────┬──────────────┬─────────────────────────────┐
//! │ Preamble │ Sync Word │    Header    │           Payload           │
//! │ (N sym)  │ (4.25 sym)│   (8 sym)    │     (n_packet - 8 sym)      │
//! └──────────┴───────────┴──────────────┴─────────────────────────────┘
//! ```
//!
//! ## Raw Payload Frame
//!
//! ```text
//! ┌─────────────┬─────────┬──────┬─────────┬──────────────┐
//! │ FF FF 00 00 │ message │  00  │ CRC CRC │ 00 .. padding│
//! └─────────────┴─────────┴──────┴─────────┴──────────────┘
//! ```
//!
//! The frame is nibble-swapped before FEC so that the low nibble of each byte
//! is transmitted first.
//!
//! ## Header Format
//!
//! | Byte | Content                          |
//! |------|----------------------------------|
//! | 0    | Payload length (message + 5)     |
//! | 1    | `CR << 5 | CRC << 4`             |
//! | 2    | Sentinel `0xE0`                  |

use crate::frame::{FrameParams, CRC_LEN, FRAME_PREFIX_LEN, FRAME_RESERVED_LEN};
use crate::params::CodingRate;
use crate::types::{DspError, DspResult};
use serde::{Deserialize, Serialize};

/// Marker bytes at the start of every raw frame
pub const FRAME_PREFIX: [u8; FRAME_PREFIX_LEN] = [0xFF, 0xFF, 0x00, 0x00];

/// Fixed third header byte
pub const HEADER_SENTINEL: u8 = 0xE0;

/// Exchange the high and low nibble of a byte
#[inline]
pub fn swap_nibbles(byte: u8) -> u8 {
    ((byte & 0x0F) << 4) | ((byte & 0xF0) >> 4)
}

/// Split bytes into nibbles, high nibble first
pub fn bytes_to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        nibbles.push((byte >> 4) & 0x0F); // High nibble
        nibbles.push(byte & 0x0F); // Low nibble
    }
    nibbles
}

/// LoRa explicit packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketHeader {
    /// Payload length field (message length + 5)
    pub length: u8,
    /// Coding rate for payload
    pub coding_rate: CodingRate,
    /// Whether CRC is enabled
    pub crc_enabled: bool,
}

impl PacketHeader {
    /// Create the header for a message of `message_len` bytes
    pub fn new(message_len: usize, coding_rate: CodingRate, crc_enabled: bool) -> DspResult<Self> {
        let overhead = FRAME_PREFIX_LEN + FRAME_RESERVED_LEN;
        let length = u8::try_from(message_len + overhead).map_err(|_| DspError::FrameTooLarge {
            len: message_len,
            max: u8::MAX as usize - overhead,
        })?;

        Ok(Self {
            length,
            coding_rate,
            crc_enabled,
        })
    }

    /// Encode header to its 3 bytes
    pub fn encode(&self) -> [u8; 3] {
        let flags = (u8::from(self.crc_enabled) << 4) | (self.coding_rate.value() << 5);
        [self.length, flags, HEADER_SENTINEL]
    }
}

/// Raw payload frame, before FEC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Vec<u8>,
}

impl RawFrame {
    /// Assemble the raw frame for `message` sized by `frame`
    ///
    /// The CRC placeholder bytes carry the CRC flag itself. The trailing
    /// padding is `n_pad` bytes plus one byte per header-borrowed codeword.
    pub fn build(message: &[u8], frame: &FrameParams) -> DspResult<Self> {
        if message.len() != frame.message_len {
            return Err(DspError::InternalInvariant(format!(
                "frame sized for {} bytes, got {}",
                frame.message_len,
                message.len()
            )));
        }

        let mut bytes = Vec::with_capacity(frame.raw_frame_len());
        bytes.extend_from_slice(&FRAME_PREFIX);
        bytes.extend_from_slice(message);
        bytes.extend(std::iter::repeat(0u8).take(FRAME_RESERVED_LEN));
        bytes.extend(std::iter::repeat(1u8).take(CRC_LEN));
        bytes.resize(frame.raw_frame_len(), 0);

        Ok(Self { bytes })
    }

    /// The unswapped frame bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame bytes with nibbles exchanged
    pub fn swapped(&self) -> Vec<u8> {
        self.bytes.iter().map(|&b| swap_nibbles(b)).collect()
    }

    /// Nibble stream fed to the payload FEC
    pub fn nibbles(&self) -> Vec<u8> {
        bytes_to_nibbles(&self.swapped())
    }
}
