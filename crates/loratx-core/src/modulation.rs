//! LoRa Modulation
//!
//! This module implements the complete LoRa transmit chain:
//!
//! ```text
//! Message bytes
//!    │
//!    ▼
//! ┌──────────────────┐
//! │  PacketEncoder   │  Frame, FEC, whiten, shuffle, interleave, Gray
//! └──────────────────┘
//!    │  packet symbols
//!    ▼
//! ┌──────────────────┐
//! │ Packet assembly  │  Preamble + sync word + sync header + payload chirps
//! └──────────────────┘
//!    │
//!    ▼
//! ┌──────────────────┐
//! │ TX scaling       │  10^(Pt/20) · exp(−j·2π·df·t)
//! └──────────────────┘
//!    │
//!    ▼
//! I/Q Samples (Complex Baseband)
//! ```
//!
//! ## Packet Waveform
//!
//! ```text
//! ┌─────────────────────┬───────────┬────────────────┬───────────────────────┐
//! │ N × up(SyncKey − 1) │ 2 × up(0) │ 2.25 × down(0) │ up((s + SyncKey) % M) │
//! └─────────────────────┴───────────┴────────────────┴───────────────────────┘
//! ```
//!
//! Every packet symbol is biased by the sync key before modulation; a receiver
//! must subtract it again.

use crate::chirp::{ChirpGenerator, ChirpType};
use crate::encoder::PacketEncoder;
use crate::frame::FrameParams;
use crate::params::{LoRaParams, DEFAULT_PREAMBLE_LENGTH, DEFAULT_SYNC_KEY};
use crate::types::{complex_ops, DspError, DspResult, IQBuffer, IQSample, Symbol};

/// Number of sync word upchirps
pub const SYNC_UPCHIRPS: usize = 2;

/// Number of full sync header downchirps (plus one quarter chirp)
pub const SYNC_DOWNCHIRPS: usize = 2;

/// Result of encoding and modulating one message
#[derive(Debug, Clone)]
pub struct TxOutput {
    /// Complex baseband waveform
    pub waveform: IQBuffer,
    /// Packet symbols before the sync key bias
    pub packet_symbols: Vec<Symbol>,
    /// Frame dimensions of the packet
    pub frame: FrameParams,
}

/// LoRa Modulator
///
/// Converts message bytes into I/Q samples using the full LoRa PHY chain.
#[derive(Debug, Clone)]
pub struct Modulator {
    /// LoRa parameters
    params: LoRaParams,
    /// Chirp generator
    chirp_gen: ChirpGenerator,
    /// Packet encoder
    encoder: PacketEncoder,
}

impl Modulator {
    /// Create a new modulator with the given parameters
    pub fn new(params: LoRaParams) -> DspResult<Self> {
        let chirp_gen = ChirpGenerator::new(params.clone())?;
        let encoder = PacketEncoder::new(params.sf, params.cr);

        Ok(Self {
            params,
            chirp_gen,
            encoder,
        })
    }

    /// Get the parameters
    pub fn params(&self) -> &LoRaParams {
        &self.params
    }

    /// Get the chirp generator (for direct chirp access)
    pub fn chirp_generator(&self) -> &ChirpGenerator {
        &self.chirp_gen
    }

    /// Encode, modulate and post-process a message
    pub fn transmit(&self, message: &[u8]) -> DspResult<TxOutput> {
        let packet = self.encoder.encode(message)?;
        let packet_symbols = packet.symbols();

        let mut waveform = self.assemble(&packet_symbols)?;
        apply_tx_scaling(
            &mut waveform,
            self.params.tx_power_db,
            self.params.freq_offset,
            self.params.sample_rate,
        );

        tracing::debug!(
            message_len = message.len(),
            symbols = packet_symbols.len(),
            samples = waveform.len(),
            "packet modulated"
        );

        Ok(TxOutput {
            waveform,
            packet_symbols,
            frame: packet.frame,
        })
    }

    /// Bias packet symbols by the sync key, modulo M
    pub fn apply_sync_key(&self, symbols: &[Symbol]) -> DspResult<Vec<Symbol>> {
        let m = self.params.chips_per_symbol() as u32;
        let key = self.params.sync_key as u32;

        symbols
            .iter()
            .map(|&s| {
                if s as u32 >= m {
                    Err(DspError::SymbolOutOfRange {
                        symbol: s as u32,
                        max: m - 1,
                    })
                } else {
                    Ok(((s as u32 + key) % m) as Symbol)
                }
            })
            .collect()
    }

    /// Generate the preamble, sync word and sync header
    ///
    /// 1. `preamble_length` upchirps at symbol `sync_key - 1`
    /// 2. Two upchirps at symbol 0
    /// 3. Two downchirps plus the first quarter of a third
    pub fn generate_preamble(&self) -> DspResult<Vec<IQSample>> {
        let ns = self.chirp_gen.samples_per_symbol();
        let mut preamble = Vec::with_capacity(self.params.preamble_samples()?);

        let lock_symbol = self.params.sync_key - 1;
        let lock = self.chirp_gen.generate_symbol_chirp(lock_symbol, ChirpType::Up)?;
        for _ in 0..self.params.preamble_length {
            preamble.extend_from_slice(&lock);
        }

        for _ in 0..SYNC_UPCHIRPS {
            preamble.extend_from_slice(self.chirp_gen.base_upchirp());
        }

        let down = self.chirp_gen.base_downchirp();
        for _ in 0..SYNC_DOWNCHIRPS {
            preamble.extend_from_slice(down);
        }
        preamble.extend_from_slice(&down[..ns / 4]);

        Ok(preamble)
    }

    /// Assemble the packet waveform for already encoded packet symbols
    pub fn assemble(&self, packet_symbols: &[Symbol]) -> DspResult<Vec<IQSample>> {
        let biased = self.apply_sync_key(packet_symbols)?;

        let total = self.params.waveform_samples(biased.len())?;
        let mut samples = self.generate_preamble()?;
        samples.reserve(total - samples.len());
        samples.extend(self.chirp_gen.generate_symbols(&biased, ChirpType::Up)?);

        Ok(samples)
    }
}

/// Apply transmit power scaling and carrier frequency offset in place
///
/// `y[n] ← 10^(Pt/20) · y[n] · exp(−j·2π·df·n/Fs)`. With `Pt = 0` and
/// `df = 0` the samples are left untouched.
pub fn apply_tx_scaling(
    samples: &mut [IQSample],
    tx_power_db: f64,
    freq_offset: f64,
    sample_rate: f64,
) {
    if tx_power_db == 0.0 && freq_offset == 0.0 {
        return;
    }

    let gain = 10f64.powf(tx_power_db / 20.0);
    for (n, sample) in samples.iter_mut().enumerate() {
        *sample *= gain * complex_ops::cis(-freq_offset, n, sample_rate);
    }
}

/// Optional transmitter settings with their documented defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    /// Coding rate, 1..=4
    pub code_rate: u8,
    /// Number of preamble upchirps
    pub preamble_symbols: usize,
    /// Sync key, 1..=2^SF
    pub sync_key: u16,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            code_rate: 1,
            preamble_symbols: DEFAULT_PREAMBLE_LENGTH,
            sync_key: DEFAULT_SYNC_KEY,
        }
    }
}

/// Encode a message and synthesize its LoRa waveform
///
/// All parameters are validated before any computation.
///
/// ```rust
/// use loratx_core::modulation::{encode_and_modulate, TxOptions};
///
/// let out = encode_and_modulate(b"A", 125_000.0, 7, 0.0, 1_000_000.0, 0.0, &TxOptions::default())
///     .unwrap();
/// assert_eq!(out.packet_symbols.len(), 23);
/// ```
pub fn encode_and_modulate(
    message: &[u8],
    bandwidth: f64,
    sf: u8,
    tx_power_db: f64,
    sample_rate: f64,
    freq_offset: f64,
    options: &TxOptions,
) -> DspResult<TxOutput> {
    let params = LoRaParams::builder()
        .spreading_factor(sf)
        .coding_rate(options.code_rate)
        .bandwidth(bandwidth)
        .sample_rate(sample_rate)
        .preamble_length(options.preamble_symbols)
        .sync_key(options.sync_key)
        .tx_power_db(tx_power_db)
        .freq_offset(freq_offset)
        .build()?;

    Modulator::new(params)?.transmit(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn modulator(sf: u8, sync_key: u16) -> Modulator {
        let params = LoRaParams::builder()
            .spreading_factor(sf)
            .sync_key(sync_key)
            .build()
            .unwrap();
        Modulator::new(params).unwrap()
    }

    #[test]
    fn test_preamble_structure() {
        let modulator = modulator(7, 5);
        let preamble = modulator.generate_preamble().unwrap();
        let gen = modulator.chirp_generator();
        let ns = 1024;

        // 8 lock chirps + 2 sync upchirps + 2.25 downchirps
        assert_eq!(preamble.len(), 12 * ns + ns / 4);

        let lock = gen.generate_symbol_chirp(4, ChirpType::Up).unwrap();
        assert_eq!(&preamble[..ns], lock.as_slice());
        assert_eq!(&preamble[7 * ns..8 * ns], lock.as_slice());
        assert_eq!(&preamble[8 * ns..9 * ns], gen.base_upchirp());
        assert_eq!(&preamble[10 * ns..11 * ns], gen.base_downchirp());
        assert_eq!(&preamble[12 * ns..], &gen.base_downchirp()[..ns / 4]);
    }

    #[test]
    fn test_sync_key_bias_wraps() {
        let m = modulator(7, 5);
        assert_eq!(
            m.apply_sync_key(&[0, 100, 122, 123, 127]).unwrap(),
            vec![5, 105, 127, 0, 4]
        );

        // Key M biases by zero
        let full_key = modulator(7, 128);
        assert_eq!(full_key.apply_sync_key(&[0, 77, 127]).unwrap(), vec![0, 77, 127]);
    }

    #[test]
    fn test_sync_key_rejects_out_of_range() {
        let modulator = modulator(7, 5);
        assert_eq!(
            modulator.apply_sync_key(&[3, 128]),
            Err(DspError::SymbolOutOfRange { symbol: 128, max: 127 })
        );
        assert!(modulator.assemble(&[200]).is_err());
    }

    #[test]
    fn test_payload_chirps_are_biased() {
        let modulator = modulator(7, 5);
        let waveform = modulator.assemble(&[10, 125]).unwrap();
        let gen = modulator.chirp_generator();
        let start = modulator.params().preamble_samples().unwrap();
        let ns = gen.samples_per_symbol();

        let first = gen.generate_symbol_chirp(15, ChirpType::Up).unwrap();
        let second = gen.generate_symbol_chirp(2, ChirpType::Up).unwrap();
        assert_eq!(&waveform[start..start + ns], first.as_slice());
        assert_eq!(&waveform[start + ns..], second.as_slice());
    }

    #[test]
    fn test_tx_scaling_identity() {
        let gen = modulator(7, 5);
        let mut samples = gen.chirp_generator().base_upchirp().to_vec();
        let original = samples.clone();
        apply_tx_scaling(&mut samples, 0.0, 0.0, 1e6);
        assert_eq!(samples, original);
    }

    #[test]
    fn test_tx_scaling_power_and_offset() {
        let mut samples = vec![IQSample::new(1.0, 0.0); 4];
        apply_tx_scaling(&mut samples, 20.0, 250_000.0, 1_000_000.0);

        for s in &samples {
            assert_relative_eq!(s.norm(), 10.0, epsilon = 1e-9);
        }
        // Quarter turn per sample, clockwise
        assert_relative_eq!(samples[1].re, 0.0, epsilon = 1e-9);
        assert_relative_eq!(samples[1].im, -10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tx_power_sets_average_power() {
        let options = TxOptions::default();
        let out = encode_and_modulate(b"pwr", 125_000.0, 7, 20.0, 1e6, 0.0, &options).unwrap();
        assert_relative_eq!(complex_ops::average_power_db(&out.waveform), 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_encode_and_modulate_defaults() {
        let options = TxOptions::default();
        let out = encode_and_modulate(b"A", 125_000.0, 7, 0.0, 1e6, 0.0, &options).unwrap();

        let ns = 1024;
        assert_eq!(out.packet_symbols.len(), 23);
        assert_eq!(out.waveform.len(), 8 * ns + 2 * ns + 2 * ns + ns / 4 + 23 * ns);
        assert_eq!(out.waveform.len(), modulator(7, 5).params().waveform_samples(23).unwrap());
        assert!(out.packet_symbols.iter().all(|&s| s < 128));
    }

    #[test]
    fn test_encode_and_modulate_validates_first() {
        let bad_sf = encode_and_modulate(b"A", 125_000.0, 6, 0.0, 1e6, 0.0, &TxOptions::default());
        assert!(matches!(bad_sf, Err(DspError::InvalidParameter(_))));

        let options = TxOptions {
            code_rate: 5,
            ..TxOptions::default()
        };
        let bad_cr = encode_and_modulate(b"A", 125_000.0, 7, 0.0, 1e6, 0.0, &options);
        assert!(matches!(bad_cr, Err(DspError::InvalidParameter(_))));

        let options = TxOptions {
            sync_key: 0,
            ..TxOptions::default()
        };
        let bad_key = encode_and_modulate(b"A", 125_000.0, 7, 0.0, 1e6, 0.0, &options);
        assert!(matches!(bad_key, Err(DspError::InvalidParameter(_))));
    }

    #[test]
    fn test_oversized_waveform_is_an_error() {
        let long_preamble = LoRaParams {
            preamble_length: usize::MAX,
            ..LoRaParams::default()
        };
        assert!(Modulator::new(long_preamble).is_err());

        let fast_adc = LoRaParams {
            sample_rate: 1e300,
            ..LoRaParams::default()
        };
        assert!(Modulator::new(fast_adc).is_err());

        let options = TxOptions {
            preamble_symbols: usize::MAX,
            ..TxOptions::default()
        };
        let result = encode_and_modulate(b"A", 125_000.0, 7, 0.0, 1e6, 0.0, &options);
        assert!(matches!(result, Err(DspError::InvalidParameter(_))));
        let defaults = TxOptions::default();
        let result = encode_and_modulate(b"A", 125_000.0, 7, 0.0, 1e300, 0.0, &defaults);
        assert!(matches!(result, Err(DspError::InvalidParameter(_))));
    }
}
