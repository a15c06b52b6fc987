//! # Observability
//!
//! The library only emits `tracing` events: `debug!` for frame sizing and
//! symbol counts, `trace!` for per-stage codeword dumps. Binaries decide
//! where those events go by calling [`init_logging`] once at startup.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
