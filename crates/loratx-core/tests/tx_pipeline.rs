use approx::assert_relative_eq;
use loratx_core::chirp::{loramod, ChirpType};
use loratx_core::modulation::{encode_and_modulate, TxOptions};
use loratx_core::params::SpreadingFactor;
use loratx_core::types::{DspError, IQSample, Symbol};

const BW: f64 = 125_000.0;
const FS: f64 = 1_000_000.0;

fn expected_len(ns: usize, preamble: usize, n_packet: usize) -> usize {
    (preamble + 4) * ns + ns / 4 + n_packet * ns
}

#[test]
fn single_byte_reference_packet() {
    let out = encode_and_modulate(b"A", BW, 7, 0.0, FS, 0.0, &TxOptions::default()).unwrap();

    assert_eq!(out.frame.n_packet, 23);
    assert_eq!(out.frame.n_wht, 21);
    assert_eq!(out.frame.n_pld, 11);
    assert_eq!(out.frame.n_pad, 3);
    assert_eq!(out.packet_symbols.len(), 23);
    assert!(out.packet_symbols.iter().all(|&s| s <= 127));
    assert_eq!(out.waveform.len(), expected_len(1024, 8, 23));

    for sample in &out.waveform {
        assert_relative_eq!(sample.norm(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn payload_is_sync_key_biased_chirps() {
    let options = TxOptions {
        sync_key: 100,
        ..TxOptions::default()
    };
    let out = encode_and_modulate(b"bias", BW, 7, 0.0, FS, 0.0, &options).unwrap();

    let biased: Vec<Symbol> = out.packet_symbols.iter().map(|&s| (s + 100) % 128).collect();
    let payload = loramod(&biased, SpreadingFactor::SF7, BW, FS, ChirpType::Up).unwrap();

    let start = out.waveform.len() - payload.len();
    assert_eq!(start, 12 * 1024 + 256);
    assert_eq!(&out.waveform[start..], payload.as_slice());

    let lock = loramod(&[99], SpreadingFactor::SF7, BW, FS, ChirpType::Up).unwrap();
    assert_eq!(&out.waveform[..1024], lock.as_slice());
}

#[test]
fn zero_padding_boundary() {
    let out = encode_and_modulate(b"1234567", BW, 7, 0.0, FS, 0.0, &TxOptions::default()).unwrap();
    assert_eq!(out.frame.n_pad, 0);
    assert_eq!(out.packet_symbols.len(), 28);
    assert_eq!(out.waveform.len(), expected_len(1024, 8, 28));
}

#[test]
fn power_and_offset_post_processing() {
    let options = TxOptions::default();
    let clean = encode_and_modulate(b"cfo", BW, 8, 0.0, FS, 0.0, &options).unwrap();
    let shifted = encode_and_modulate(b"cfo", BW, 8, 6.0, FS, 1_500.0, &options).unwrap();

    assert_eq!(clean.packet_symbols, shifted.packet_symbols);
    assert_eq!(clean.waveform.len(), shifted.waveform.len());

    let gain = 10f64.powf(6.0 / 20.0);
    for n in (0..clean.waveform.len()).step_by(997) {
        let phase = -2.0 * std::f64::consts::PI * 1_500.0 * n as f64 / FS;
        let rotation = IQSample::from_polar(gain, phase);
        let expected = clean.waveform[n] * rotation;
        assert_relative_eq!(shifted.waveform[n].re, expected.re, epsilon = 1e-9);
        assert_relative_eq!(shifted.waveform[n].im, expected.im, epsilon = 1e-9);
    }
}

#[test]
fn waveform_length_all_spreading_factors() {
    for sf in 7u8..=12 {
        for cr in 1u8..=4 {
            let options = TxOptions {
                code_rate: cr,
                preamble_symbols: 6,
                ..TxOptions::default()
            };
            // Fs = BW gives one sample per chip
            let out = encode_and_modulate(b"Hello", BW, sf, 0.0, BW, 0.0, &options).unwrap();
            let m = 1usize << sf;

            assert_eq!(out.packet_symbols.len(), out.frame.n_packet, "SF{} CR{}", sf, cr);
            assert!(out.packet_symbols.iter().all(|&s| (s as usize) < m));
            assert_eq!(out.waveform.len(), expected_len(m, 6, out.frame.n_packet));
        }
    }
}

#[test]
fn oversized_message_produces_no_waveform() {
    let result = encode_and_modulate(&[0x55; 251], BW, 7, 0.0, FS, 0.0, &TxOptions::default());
    assert!(matches!(result, Err(DspError::FrameTooLarge { len: 251, .. })));
}

#[test]
fn invalid_parameters_fail_fast() {
    let options = TxOptions::default();
    for (bw, sf, fs) in [(0.0, 7, FS), (BW, 13, FS), (BW, 7, -1.0), (BW, 7, 1_000.0)] {
        let result = encode_and_modulate(b"x", bw, sf, 0.0, fs, 0.0, &options);
        assert!(matches!(result, Err(DspError::InvalidParameter(_))), "{} {} {}", bw, sf, fs);
    }
}
