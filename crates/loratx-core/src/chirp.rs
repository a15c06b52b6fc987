//! Chirp Signal Generation
//!
//! This module implements the chirp modulator for LoRa's Chirp Spread
//! Spectrum (CSS) modulation.
//!
//! ## What is a Chirp?
//!
//! A chirp is a signal whose frequency changes linearly over time. LoRa folds
//! the sweep back into the channel: the frequency wraps modulo the bandwidth,
//! and the symbol value sets where in the sweep the chirp starts.
//!
//! ```text
//! Frequency
//!     ^
//! +BW/2|        /       /|
//!      |      _/      _/ |  /
//!      |    _/      _/   | /
//! -BW/2|  _/      _/     |/
//!      +----------> Time
//!       Symbol 0     Symbol s (wraps)
//! ```
//!
//! ## Mathematical Foundation
//!
//! With `Ts = M / BW` the symbol duration, `γ = s / Ts` and `β = BW / Ts`:
//!
//! ```text
//! f[n] = ((γ + dir·β·n/Fs) mod BW) − BW/2
//! Θ[n] = 2π/Fs · Σ_{k=0..n} f[k]
//! y[n] = exp(j·Θ[n])
//! ```
//!
//! The phase is a running sum of the instantaneous frequency, restarted for
//! every symbol, so the wrap discontinuity is integrated sample by sample
//! rather than through a closed form.

use std::f64::consts::PI;

use crate::params::{
    check_rates, samples_per_symbol, LoRaParams, SpreadingFactor, MAX_WAVEFORM_SAMPLES,
};
use crate::types::{complex_ops, DspError, DspResult, IQSample, Symbol};

/// Type of chirp (up or down)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChirpType {
    /// Frequency increases (preamble, sync word and data)
    Up,
    /// Frequency decreases (sync header)
    Down,
}

impl ChirpType {
    /// Sweep direction, +1 for up and −1 for down
    pub fn direction(&self) -> f64 {
        match self {
            ChirpType::Up => 1.0,
            ChirpType::Down => -1.0,
        }
    }
}

/// Folded chirp frequency at sample `n`
#[inline]
fn folded_frequency(
    gamma: f64,
    beta: f64,
    dir: f64,
    n: usize,
    sample_rate: f64,
    bandwidth: f64,
) -> f64 {
    let t = n as f64 / sample_rate;
    (gamma + dir * beta * t).rem_euclid(bandwidth) - bandwidth / 2.0
}

/// Modulate a vector of symbols into consecutive chirps
///
/// Every symbol must lie in `[0, 2^SF - 1]` and the rates must be positive;
/// the whole call fails otherwise and no samples are returned.
pub fn loramod(
    symbols: &[Symbol],
    sf: SpreadingFactor,
    bandwidth: f64,
    sample_rate: f64,
    chirp_type: ChirpType,
) -> DspResult<Vec<IQSample>> {
    check_rates(bandwidth, sample_rate)?;

    let m = sf.chips_per_symbol();
    if let Some(&bad) = symbols.iter().find(|&&s| s as usize >= m) {
        return Err(DspError::SymbolOutOfRange {
            symbol: bad as u32,
            max: (m - 1) as u32,
        });
    }

    let ns = samples_per_symbol(sf, bandwidth, sample_rate);
    let ts = m as f64 / bandwidth;
    let beta = bandwidth / ts;
    let dir = chirp_type.direction();
    let scale = (1.0 / sample_rate) * 2.0 * PI;

    let total = symbols
        .len()
        .checked_mul(ns)
        .filter(|&n| n <= MAX_WAVEFORM_SAMPLES)
        .ok_or_else(|| {
            DspError::invalid(format!(
                "{} symbols of {} samples exceed the size limit",
                symbols.len(),
                ns
            ))
        })?;
    let mut samples = Vec::with_capacity(total);

    for &symbol in symbols {
        let gamma = symbol as f64 / ts;
        let mut freq_sum = 0.0;

        for n in 0..ns {
            freq_sum += folded_frequency(gamma, beta, dir, n, sample_rate, bandwidth);
            samples.push(complex_ops::from_polar(1.0, freq_sum * scale));
        }
    }

    Ok(samples)
}

/// Generator for LoRa chirp signals
#[derive(Debug, Clone)]
pub struct ChirpGenerator {
    /// LoRa parameters
    params: LoRaParams,
    /// Pre-computed upchirp at symbol 0
    base_upchirp: Vec<IQSample>,
    /// Pre-computed downchirp at symbol 0
    base_downchirp: Vec<IQSample>,
}

impl ChirpGenerator {
    /// Create a new chirp generator with the given parameters
    pub fn new(params: LoRaParams) -> DspResult<Self> {
        params.validate()?;

        let (sf, bw, fs) = (params.sf, params.bandwidth, params.sample_rate);
        let base_upchirp = loramod(&[0], sf, bw, fs, ChirpType::Up)?;
        let base_downchirp = loramod(&[0], sf, bw, fs, ChirpType::Down)?;

        Ok(Self {
            params,
            base_upchirp,
            base_downchirp,
        })
    }

    /// Get the LoRa parameters
    pub fn params(&self) -> &LoRaParams {
        &self.params
    }

    /// Samples per chirp
    pub fn samples_per_symbol(&self) -> usize {
        self.base_upchirp.len()
    }

    /// Get the pre-computed upchirp at symbol 0
    pub fn base_upchirp(&self) -> &[IQSample] {
        &self.base_upchirp
    }

    /// Get the pre-computed downchirp at symbol 0 (the sync header chirp)
    pub fn base_downchirp(&self) -> &[IQSample] {
        &self.base_downchirp
    }

    /// Generate one chirp for `symbol`
    pub fn generate_symbol_chirp(
        &self,
        symbol: Symbol,
        chirp_type: ChirpType,
    ) -> DspResult<Vec<IQSample>> {
        match (symbol, chirp_type) {
            (0, ChirpType::Up) => Ok(self.base_upchirp.clone()),
            (0, ChirpType::Down) => Ok(self.base_downchirp.clone()),
            _ => self.generate_symbols(&[symbol], chirp_type),
        }
    }

    /// Generate consecutive chirps for a vector of symbols
    pub fn generate_symbols(
        &self,
        symbols: &[Symbol],
        chirp_type: ChirpType,
    ) -> DspResult<Vec<IQSample>> {
        loramod(
            symbols,
            self.params.sf,
            self.params.bandwidth,
            self.params.sample_rate,
            chirp_type,
        )
    }

    /// Instantaneous frequency of `symbol` at sample `n` of its chirp
    pub fn instantaneous_frequency(&self, symbol: Symbol, chirp_type: ChirpType, n: usize) -> f64 {
        let bw = self.params.bandwidth;
        let ts = self.params.chips_per_symbol() as f64 / bw;
        folded_frequency(
            symbol as f64 / ts,
            bw / ts,
            chirp_type.direction(),
            n,
            self.params.sample_rate,
            bw,
        )
    }

    /// Compute the instantaneous frequency at each sample point
    ///
    /// Estimated from the phase step between consecutive samples, so the
    /// result has one entry fewer than the input.
    pub fn compute_instantaneous_frequency(&self, samples: &[IQSample]) -> Vec<f64> {
        if samples.len() < 2 {
            return vec![];
        }

        let sample_rate = self.params.sample_rate;
        samples
            .windows(2)
            .map(|w| (w[1] * w[0].conj()).arg() * sample_rate / (2.0 * PI))
            .collect()
    }
}
