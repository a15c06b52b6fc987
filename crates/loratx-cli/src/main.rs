//! LoRa Transmitter Command-Line Interface
//!
//! This CLI provides tools for:
//! - Encoding a message into a LoRa I/Q sample file
//! - Printing frame sizing and timing for a payload length
//! - Generating single chirps for analysis
//!
//! Radio parameters come from an optional JSON file (`--config`) and are
//! overridden by individual flags.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use loratx_core::chirp::{ChirpGenerator, ChirpType};
use loratx_core::frame::FrameParams;
use loratx_core::io::IqFormat;
use loratx_core::modulation::Modulator;
use loratx_core::observe::{init_logging, LogConfig, LogFormat, LogLevel};
use loratx_core::params::LoRaParams;
use loratx_core::types::{complex_ops, IQSample, Symbol};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "loratx")]
#[command(author, version, about = "LoRa packet transmitter", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format (json, pretty, compact)
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Radio parameters shared by every subcommand
#[derive(Args, Debug, Default)]
struct RadioArgs {
    /// JSON file with LoRa parameters; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Spreading factor (7-12)
    #[arg(long)]
    sf: Option<u8>,

    /// Coding rate (1-4 for 4/5 to 4/8)
    #[arg(long)]
    cr: Option<u8>,

    /// Bandwidth in Hz
    #[arg(long)]
    bw: Option<f64>,

    /// Sample rate in Hz
    #[arg(long)]
    fs: Option<f64>,

    /// Number of preamble upchirps
    #[arg(long)]
    preamble: Option<usize>,

    /// Sync key (1 to 2^SF)
    #[arg(long)]
    sync_key: Option<u16>,

    /// Transmit power in dB
    #[arg(long, allow_hyphen_values = true)]
    power: Option<f64>,

    /// Carrier frequency offset in Hz
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode and modulate a message to I/Q samples
    Tx {
        /// Message to transmit
        #[arg(short, long)]
        message: String,

        /// Output file for I/Q samples (or - for stdout)
        #[arg(short, long, default_value = "tx_samples.iq")]
        output: PathBuf,

        /// Sample format (cf64, cf32, ci16, ci8)
        #[arg(long, default_value = "cf32")]
        format: IqFormat,

        /// Also write the packet symbols as JSON
        #[arg(long)]
        symbols_json: Option<PathBuf>,

        #[command(flatten)]
        radio: RadioArgs,
    },

    /// Show frame sizing and timing for a payload length
    Info {
        /// Message length in bytes
        #[arg(short, long)]
        length: usize,

        /// Print the frame parameters as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        radio: RadioArgs,
    },

    /// Generate a single chirp
    Chirp {
        /// Symbol value (0 to 2^SF - 1)
        #[arg(short, long, default_value = "0")]
        symbol: Symbol,

        /// Generate a downchirp instead of an upchirp
        #[arg(long)]
        down: bool,

        /// Output file (or - for stdout)
        #[arg(short, long, default_value = "chirp.iq")]
        output: PathBuf,

        /// Sample format (cf64, cf32, ci16, ci8)
        #[arg(long, default_value = "cf32")]
        format: IqFormat,

        #[command(flatten)]
        radio: RadioArgs,
    },
}

/// Symbols file written by `tx --symbols-json`
#[derive(Serialize)]
struct SymbolDump<'a> {
    message: &'a str,
    sync_key: u16,
    frame: FrameParams,
    symbols: &'a [Symbol],
}

impl RadioArgs {
    /// Resolve parameters: defaults, then the config file, then flags
    fn resolve(&self) -> Result<LoRaParams> {
        let base = match self.config {
            Some(ref path) => load_config(path)?,
            None => LoRaParams::default(),
        };

        LoRaParams::builder()
            .spreading_factor(self.sf.unwrap_or(base.sf.value()))
            .coding_rate(self.cr.unwrap_or(base.cr.value()))
            .bandwidth(self.bw.unwrap_or(base.bandwidth))
            .sample_rate(self.fs.unwrap_or(base.sample_rate))
            .preamble_length(self.preamble.unwrap_or(base.preamble_length))
            .sync_key(self.sync_key.unwrap_or(base.sync_key))
            .tx_power_db(self.power.unwrap_or(base.tx_power_db))
            .freq_offset(self.offset.unwrap_or(base.freq_offset))
            .build()
            .context("Invalid LoRa parameters")
    }
}

fn load_config(path: &Path) -> Result<LoRaParams> {
    let file = File::open(path).with_context(|| format!("Failed to open config {:?}", path))?;
    let params: LoRaParams = serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse config {:?}", path))?;
    debug!(?params, "loaded config");
    Ok(params)
}

fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        Ok(Box::new(BufWriter::new(std::io::stdout().lock())))
    } else {
        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

fn write_iq(samples: &[IQSample], path: &Path, format: IqFormat) -> Result<usize> {
    let mut writer = open_output(path)?;
    let written = format
        .write_samples(&mut writer, samples)
        .with_context(|| format!("Failed to write samples to {:?}", path))?;
    writer.flush()?;
    Ok(written)
}

fn cmd_tx(
    message: String,
    output: PathBuf,
    format: IqFormat,
    symbols_json: Option<PathBuf>,
    radio: RadioArgs,
) -> Result<()> {
    let params = radio.resolve()?;

    info!("Transmitting message: '{}'", message);
    info!(
        "Parameters: {}, BW {} Hz, CR 4/{}, Fs {} Hz",
        params.sf,
        params.bandwidth,
        params.cr.output_bits(),
        params.sample_rate
    );

    let modulator = Modulator::new(params.clone())?;
    let tx = modulator
        .transmit(message.as_bytes())
        .context("Failed to encode message")?;

    info!(
        symbols = tx.packet_symbols.len(),
        samples = tx.waveform.len(),
        "Duration: {:.3} ms",
        tx.waveform.len() as f64 / params.sample_rate * 1000.0
    );

    let (min_amp, max_amp) = amplitude_range(&tx.waveform);
    info!(
        "Signal: RMS power {:.2} dB, amplitude {:.4} to {:.4}",
        complex_ops::average_power_db(&tx.waveform),
        min_amp,
        max_amp
    );

    let bytes = write_iq(&tx.waveform, &output, format)?;
    info!("Wrote {} bytes ({}) to {:?}", bytes, format, output);

    if let Some(path) = symbols_json {
        let dump = SymbolDump {
            message: &message,
            sync_key: params.sync_key,
            frame: tx.frame,
            symbols: &tx.packet_symbols,
        };
        let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &dump)
            .with_context(|| format!("Failed to write symbols to {:?}", path))?;
        info!("Wrote {} symbols to {:?}", tx.packet_symbols.len(), path);
    }

    Ok(())
}

/// Smallest and largest sample magnitude
fn amplitude_range(samples: &[IQSample]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    samples.iter().fold((f64::INFINITY, 0.0), |(lo, hi), s| {
        let a = s.norm();
        (lo.min(a), hi.max(a))
    })
}

fn cmd_info(length: usize, json: bool, radio: RadioArgs) -> Result<()> {
    let params = radio.resolve()?;
    let frame = FrameParams::compute(length, params.sf, params.cr)?;
    let waveform_samples = params.waveform_samples(frame.n_packet)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&frame)?);
        return Ok(());
    }

    let ns = params.samples_per_symbol();

    println!("=== LoRa Frame Calculator ===");
    println!();
    println!("Configuration:");
    println!("  Spreading Factor:  {}", params.sf);
    println!("  Bandwidth:         {} Hz", params.bandwidth);
    println!("  Coding Rate:       4/{}", params.cr.output_bits());
    println!("  Message Length:    {} bytes", length);
    println!();
    println!("Frame:");
    println!("  Packet symbols:    {}", frame.n_packet);
    println!("  Whitened CWs:      {}", frame.n_wht);
    println!("  Payload bytes:     {}", frame.n_pld);
    println!("  Padding bytes:     {}", frame.n_pad);
    println!();
    println!("Timing:");
    println!("  Samples/symbol:    {}", ns);
    println!("  Symbol duration:   {:.3} ms", params.symbol_duration() * 1000.0);
    println!("  Bit rate:          {:.2} bits/s", params.bit_rate());
    println!("  Time on air:       {:.2} ms", params.time_on_air(length)? * 1000.0);
    println!("  Waveform samples:  {}", waveform_samples);
    println!();
    println!("Preamble:");
    println!("  Upchirps:          {} (symbol {})", params.preamble_length, params.sync_key - 1);
    println!("  Sync words:        2");
    println!("  Downchirps:        2.25");

    Ok(())
}

fn cmd_chirp(
    symbol: Symbol,
    down: bool,
    output: PathBuf,
    format: IqFormat,
    radio: RadioArgs,
) -> Result<()> {
    let params = radio.resolve()?;
    let chirp_gen = ChirpGenerator::new(params.clone())?;
    let chirp_type = if down { ChirpType::Down } else { ChirpType::Up };

    let samples = chirp_gen
        .generate_symbol_chirp(symbol, chirp_type)
        .with_context(|| format!("Cannot generate symbol {} at {}", symbol, params.sf))?;

    write_iq(&samples, &output, format)?;

    info!(
        "Generated {:?} chirp (symbol {}), {} samples written to {:?}",
        chirp_type,
        symbol,
        samples.len(),
        output
    );

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogConfig {
        level: LogLevel::from_verbosity(cli.verbose),
        format: cli.log_format,
        ..LogConfig::default()
    });

    match cli.command {
        Commands::Tx {
            message,
            output,
            format,
            symbols_json,
            radio,
        } => cmd_tx(message, output, format, symbols_json, radio),

        Commands::Info { length, json, radio } => cmd_info(length, json, radio),

        Commands::Chirp {
            symbol,
            down,
            output,
            format,
            radio,
        } => cmd_chirp(symbol, down, output, format, radio),
    }
}
