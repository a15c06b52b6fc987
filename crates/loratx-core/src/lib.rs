//! # LoRa Transmit Library
//!
//! This crate turns message bytes into a complex-baseband LoRa waveform:
//! packet framing, forward error correction, whitening, interleaving, Gray
//! mapping and Chirp Spread Spectrum (CSS) modulation.
//!
//! ## Signal Flow
//!
//! ```text
//! Message → Frame → Hamming FEC → Whitening → Shuffle → Interleave → Gray
//!         → Sync key bias → Preamble + sync + chirps → Power / CFO → I/Q
//! ```
//!
//! ## Example
//!
//! ```rust
//! use loratx_core::{LoRaParams, Modulator};
//!
//! let params = LoRaParams::builder()
//!     .spreading_factor(7)
//!     .bandwidth(125_000.0)
//!     .coding_rate(1)
//!     .build()
//!     .unwrap();
//!
//! let modulator = Modulator::new(params).unwrap();
//! let output = modulator.transmit(b"Hello LoRa!").unwrap();
//! assert_eq!(output.packet_symbols.len(), output.frame.n_packet);
//! ```

pub mod chirp;
pub mod coding;
pub mod encoder;
pub mod frame;
pub mod io;
pub mod modulation;
pub mod observe;
pub mod packet;
pub mod params;
pub mod types;
pub mod whitening;

// Parallel processing (requires `parallel` feature)
#[cfg(feature = "parallel")]
pub mod parallel;

// Re-export main types
pub use chirp::{loramod, ChirpGenerator, ChirpType};
pub use coding::{GrayCode, HammingCode, Interleaver, Shuffler};
pub use encoder::{EncodedPacket, PacketEncoder};
pub use frame::FrameParams;
pub use io::IqFormat;
pub use modulation::{encode_and_modulate, Modulator, TxOptions, TxOutput};
pub use packet::{PacketHeader, RawFrame};
pub use params::{CodingRate, LoRaParams, SpreadingFactor};
pub use types::{Complex, DspError, DspResult, IQSample, Symbol};
pub use whitening::Whitening;

#[cfg(feature = "parallel")]
pub use parallel::ParallelTransmitter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::chirp::{ChirpGenerator, ChirpType};
    pub use crate::encoder::PacketEncoder;
    pub use crate::frame::FrameParams;
    pub use crate::modulation::{encode_and_modulate, Modulator, TxOptions, TxOutput};
    pub use crate::params::{CodingRate, LoRaParams, SpreadingFactor};
    pub use crate::types::{Complex, DspError, DspResult, IQSample, Symbol};
}
