//! LoRa Parameters and Configuration
//!
//! This module defines the configurable parameters for LoRa packet encoding
//! and modulation: spreading factor, coding rate, bandwidth, sampling rate,
//! preamble length, sync key and the transmit post-processing settings.
//!
//! ## Understanding LoRa Parameters
//!
//! ### Spreading Factor (SF)
//!
//! The spreading factor sets the symbol alphabet size M = 2^SF. Each symbol
//! carries SF bits and lasts M chips.
//!
//! | SF | Chips/Symbol | Header nibbles |
//! |----|--------------|----------------|
//! | 7  | 128          | 1              |
//! | 8  | 256          | 2              |
//! | 9  | 512          | 3              |
//! | 10 | 1024         | 4              |
//! | 11 | 2048         | 5              |
//! | 12 | 4096         | 6              |
//!
//! ### Coding Rate (CR)
//!
//! Forward Error Correction adds CR parity bits to each 4-bit nibble:
//! - CR 4/5: single parity bit
//! - CR 4/6: two parity bits
//! - CR 4/7: Hamming(7,4)
//! - CR 4/8: extended Hamming(8,4)
//!
//! ### Sync Key
//!
//! The preamble upchirps are emitted at symbol `sync_key - 1`, and every packet
//! symbol is biased by `+sync_key (mod M)` before modulation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::frame::{FrameParams, MAX_MESSAGE_LEN};
use crate::types::{DspError, DspResult, IQSample};

/// Spreading Factor for LoRa modulation
///
/// The spreading factor determines the number of chips per symbol (2^SF)
/// and the number of bits encoded per symbol (SF bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SpreadingFactor {
    SF7 = 7,
    SF8 = 8,
    SF9 = 9,
    SF10 = 10,
    SF11 = 11,
    SF12 = 12,
}

impl SpreadingFactor {
    /// Create a spreading factor from a raw value
    pub fn from_u8(value: u8) -> DspResult<Self> {
        match value {
            7 => Ok(Self::SF7),
            8 => Ok(Self::SF8),
            9 => Ok(Self::SF9),
            10 => Ok(Self::SF10),
            11 => Ok(Self::SF11),
            12 => Ok(Self::SF12),
            _ => Err(DspError::invalid(format!(
                "spreading factor {} outside [7, 12]",
                value
            ))),
        }
    }

    /// Get the raw value
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Number of chips per symbol (the symbol alphabet size M = 2^SF)
    pub fn chips_per_symbol(&self) -> usize {
        1 << self.value()
    }

    /// Header nibble count N_pld (SF 7 → 1 … SF 12 → 6)
    ///
    /// The header block is SF-2 codewords high: five header codewords
    /// followed by the first `N_pld - 1` payload codewords.
    pub fn header_nibbles(&self) -> usize {
        self.value() as usize - 6
    }
}

impl TryFrom<u8> for SpreadingFactor {
    type Error = DspError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value)
    }
}

impl From<SpreadingFactor> for u8 {
    fn from(sf: SpreadingFactor) -> Self {
        sf.value()
    }
}

impl fmt::Display for SpreadingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SF{}", self.value())
    }
}

impl Default for SpreadingFactor {
    fn default() -> Self {
        Self::SF7
    }
}

/// Coding Rate for Forward Error Correction
///
/// The coding rate 4/(4+CR) determines the ratio of data bits to total bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CodingRate {
    /// 4/5 - 1 redundant bit per 4 data bits
    CR4_5 = 1,
    /// 4/6 - 2 redundant bits per 4 data bits
    CR4_6 = 2,
    /// 4/7 - 3 redundant bits per 4 data bits
    CR4_7 = 3,
    /// 4/8 - 4 redundant bits per 4 data bits
    CR4_8 = 4,
}

impl CodingRate {
    pub fn from_u8(value: u8) -> DspResult<Self> {
        match value {
            1 => Ok(Self::CR4_5),
            2 => Ok(Self::CR4_6),
            3 => Ok(Self::CR4_7),
            4 => Ok(Self::CR4_8),
            _ => Err(DspError::invalid(format!(
                "coding rate {} outside [1, 4]",
                value
            ))),
        }
    }

    /// Get the raw value (number of redundant bits)
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Get the coding rate as a fraction
    pub fn rate(&self) -> f64 {
        4.0 / (4.0 + self.value() as f64)
    }

    /// Number of output bits per 4 input bits (the codeword width)
    pub fn output_bits(&self) -> u8 {
        4 + self.value()
    }
}

impl TryFrom<u8> for CodingRate {
    type Error = DspError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value)
    }
}

impl From<CodingRate> for u8 {
    fn from(cr: CodingRate) -> Self {
        cr.value()
    }
}

impl fmt::Display for CodingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "4/{}", 4 + self.value())
    }
}

impl Default for CodingRate {
    fn default() -> Self {
        Self::CR4_5
    }
}

/// Default channel bandwidth in Hz
pub const DEFAULT_BANDWIDTH: f64 = 125_000.0;
/// Default sampling rate in Hz (8x oversampling of the default bandwidth)
pub const DEFAULT_SAMPLE_RATE: f64 = 1_000_000.0;
/// Default number of preamble upchirps
pub const DEFAULT_PREAMBLE_LENGTH: usize = 8;
/// Default sync key
pub const DEFAULT_SYNC_KEY: u16 = 5;

/// Largest waveform, in samples, that a single allocation can hold
pub const MAX_WAVEFORM_SAMPLES: usize = isize::MAX as usize / std::mem::size_of::<IQSample>();

/// Number of samples per symbol, `round(Fs * 2^SF / BW)`
///
/// Saturates for absurd rates; callers check the result against
/// [`MAX_WAVEFORM_SAMPLES`].
pub fn samples_per_symbol(sf: SpreadingFactor, bandwidth: f64, sample_rate: f64) -> usize {
    (sample_rate * sf.chips_per_symbol() as f64 / bandwidth).round() as usize
}

/// Reject bandwidths and sample rates that are not positive and finite
pub(crate) fn check_rates(bandwidth: f64, sample_rate: f64) -> DspResult<()> {
    if !bandwidth.is_finite() || bandwidth <= 0.0 {
        return Err(DspError::invalid(format!(
            "bandwidth {} Hz must be positive",
            bandwidth
        )));
    }
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(DspError::invalid(format!(
            "sample rate {} Hz must be positive",
            sample_rate
        )));
    }
    Ok(())
}

/// Complete transmitter parameter configuration
///
/// Deserializing does not validate; call [`LoRaParams::validate`] (the
/// builder does this in `build()`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoRaParams {
    /// Spreading Factor (7-12)
    pub sf: SpreadingFactor,
    /// Coding Rate (1-4)
    pub cr: CodingRate,
    /// Bandwidth in Hz
    pub bandwidth: f64,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Preamble length in upchirps
    pub preamble_length: usize,
    /// Sync key (1..=2^SF)
    pub sync_key: u16,
    /// Transmit power scaling in dB
    pub tx_power_db: f64,
    /// Carrier frequency offset in Hz
    pub freq_offset: f64,
}

impl Default for LoRaParams {
    fn default() -> Self {
        Self {
            sf: SpreadingFactor::default(),
            cr: CodingRate::default(),
            bandwidth: DEFAULT_BANDWIDTH,
            sample_rate: DEFAULT_SAMPLE_RATE,
            preamble_length: DEFAULT_PREAMBLE_LENGTH,
            sync_key: DEFAULT_SYNC_KEY,
            tx_power_db: 0.0,
            freq_offset: 0.0,
        }
    }
}

impl LoRaParams {
    /// Create a new builder for LoRa parameters
    pub fn builder() -> LoRaParamsBuilder {
        LoRaParamsBuilder::default()
    }

    /// Check every parameter against its legal range
    pub fn validate(&self) -> DspResult<()> {
        check_rates(self.bandwidth, self.sample_rate)?;
        // The sync header needs at least one sample in its quarter downchirp
        if self.samples_per_symbol() < 4 {
            return Err(DspError::invalid(format!(
                "sample rate {} Hz yields fewer than 4 samples per symbol",
                self.sample_rate
            )));
        }
        let m = self.chips_per_symbol();
        if self.sync_key == 0 || self.sync_key as usize > m {
            return Err(DspError::invalid(format!(
                "sync key {} outside [1, {}]",
                self.sync_key, m
            )));
        }
        if !self.tx_power_db.is_finite() || !self.freq_offset.is_finite() {
            return Err(DspError::invalid("transmit power and frequency offset must be finite"));
        }
        // The longest packet must still fit in one buffer
        let longest = FrameParams::compute(MAX_MESSAGE_LEN, self.sf, self.cr)?;
        self.waveform_samples(longest.n_packet)?;
        Ok(())
    }

    /// Number of chips per symbol (M)
    pub fn chips_per_symbol(&self) -> usize {
        self.sf.chips_per_symbol()
    }

    /// Number of samples per symbol, `round(Fs * M / BW)`
    pub fn samples_per_symbol(&self) -> usize {
        samples_per_symbol(self.sf, self.bandwidth, self.sample_rate)
    }

    /// Symbol duration in seconds
    pub fn symbol_duration(&self) -> f64 {
        self.chips_per_symbol() as f64 / self.bandwidth
    }

    /// Calculate the raw bit rate in bits per second
    pub fn bit_rate(&self) -> f64 {
        let sf = self.sf.value() as f64;
        sf * self.bandwidth * self.cr.rate() / self.chips_per_symbol() as f64
    }

    /// Number of samples in a waveform carrying `n_symbols` packet symbols
    ///
    /// `(preamble_length + 4 + n_symbols) * Ns + Ns / 4`, or
    /// [`DspError::InvalidParameter`] when that exceeds [`MAX_WAVEFORM_SAMPLES`].
    pub fn waveform_samples(&self, n_symbols: usize) -> DspResult<usize> {
        let ns = self.samples_per_symbol();
        self.preamble_length
            .checked_add(4)
            .and_then(|n| n.checked_add(n_symbols))
            .and_then(|n| n.checked_mul(ns))
            .and_then(|n| n.checked_add(ns / 4))
            .filter(|&n| n <= MAX_WAVEFORM_SAMPLES)
            .ok_or_else(|| {
                DspError::invalid(format!(
                    "{} preamble + {} packet symbols of {} samples exceed the size limit",
                    self.preamble_length, n_symbols, ns
                ))
            })
    }

    /// Number of samples in the preamble and sync furniture
    pub fn preamble_samples(&self) -> DspResult<usize> {
        self.waveform_samples(0)
    }

    /// Calculate time on air for a given payload size (in seconds)
    pub fn time_on_air(&self, payload_bytes: usize) -> DspResult<f64> {
        let frame = FrameParams::compute(payload_bytes, self.sf, self.cr)?;
        let symbols = self.preamble_length as f64 + 4.25 + frame.n_packet as f64;
        Ok(symbols * self.symbol_duration())
    }
}

/// Builder for LoRaParams
///
/// Values are stored raw and checked in [`LoRaParamsBuilder::build`].
#[derive(Debug, Clone)]
pub struct LoRaParamsBuilder {
    sf: u8,
    cr: u8,
    bandwidth: f64,
    sample_rate: f64,
    preamble_length: usize,
    sync_key: u16,
    tx_power_db: f64,
    freq_offset: f64,
}

impl Default for LoRaParamsBuilder {
    fn default() -> Self {
        let params = LoRaParams::default();
        Self {
            sf: params.sf.value(),
            cr: params.cr.value(),
            bandwidth: params.bandwidth,
            sample_rate: params.sample_rate,
            preamble_length: params.preamble_length,
            sync_key: params.sync_key,
            tx_power_db: params.tx_power_db,
            freq_offset: params.freq_offset,
        }
    }
}

impl LoRaParamsBuilder {
    pub fn spreading_factor(mut self, sf: u8) -> Self {
        self.sf = sf;
        self
    }

    pub fn coding_rate(mut self, cr: u8) -> Self {
        self.cr = cr;
        self
    }

    pub fn bandwidth(mut self, bw_hz: f64) -> Self {
        self.bandwidth = bw_hz;
        self
    }

    pub fn sample_rate(mut self, fs_hz: f64) -> Self {
        self.sample_rate = fs_hz;
        self
    }

    pub fn preamble_length(mut self, len: usize) -> Self {
        self.preamble_length = len;
        self
    }

    pub fn sync_key(mut self, key: u16) -> Self {
        self.sync_key = key;
        self
    }

    pub fn tx_power_db(mut self, db: f64) -> Self {
        self.tx_power_db = db;
        self
    }

    pub fn freq_offset(mut self, hz: f64) -> Self {
        self.freq_offset = hz;
        self
    }

    pub fn build(self) -> DspResult<LoRaParams> {
        let params = LoRaParams {
            sf: SpreadingFactor::from_u8(self.sf)?,
            cr: CodingRate::from_u8(self.cr)?,
            bandwidth: self.bandwidth,
            sample_rate: self.sample_rate,
            preamble_length: self.preamble_length,
            sync_key: self.sync_key,
            tx_power_db: self.tx_power_db,
            freq_offset: self.freq_offset,
        };
        params.validate()?;
        Ok(params)
    }
}
