//! Parallel Batch Transmission
//!
//! Encodes and modulates independent messages on the rayon thread pool.
//! Enable with the `parallel` feature flag.
//!
//! ```toml
//! [dependencies]
//! loratx-core = { version = "0.1", features = ["parallel"] }
//! ```
//!
//! A single packet is modulated sequentially; the gain comes from batches.

use rayon::prelude::*;

use crate::chirp::ChirpType;
use crate::modulation::{Modulator, TxOutput};
use crate::params::LoRaParams;
use crate::types::{DspResult, IQSample, Symbol};

/// Parallel batch transmitter sharing one modulator across threads
#[derive(Debug, Clone)]
pub struct ParallelTransmitter {
    modulator: Modulator,
}

impl ParallelTransmitter {
    /// Create a new parallel transmitter
    pub fn new(params: LoRaParams) -> DspResult<Self> {
        Ok(Self {
            modulator: Modulator::new(params)?,
        })
    }

    /// Get the underlying modulator
    pub fn modulator(&self) -> &Modulator {
        &self.modulator
    }

    /// Transmit every message, preserving input order
    ///
    /// Each message yields its own result, so one oversized message does not
    /// discard the rest of the batch.
    pub fn transmit_batch(&self, messages: &[&[u8]]) -> Vec<DspResult<TxOutput>> {
        messages
            .par_iter()
            .map(|message| self.modulator.transmit(message))
            .collect()
    }

    /// Modulate a symbol vector with one chirp per task
    pub fn modulate_symbols_parallel(&self, symbols: &[Symbol]) -> DspResult<Vec<IQSample>> {
        let chirp_gen = self.modulator.chirp_generator();
        let chirps = symbols
            .par_iter()
            .map(|&symbol| chirp_gen.generate_symbol_chirp(symbol, ChirpType::Up))
            .collect::<DspResult<Vec<_>>>()?;

        Ok(chirps.concat())
    }
}
