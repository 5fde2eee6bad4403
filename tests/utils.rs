#![allow(dead_code)]

use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn enable_logging() {
    LOGGER.call_once(logger_init)
}

fn logger_init() {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Warn)
        .init();
}

/// Scenario S1 (§8): format 1, one track, PPQ 96, NoteOn ch0 key60 v64 at delta 0, NoteOff at
/// delta 96, EndOfTrack at delta 0. The pack ships no binary `.mid` fixtures, so tests build SMF
/// byte sequences inline instead of loading `tests/data/*.mid`.
pub const SCENARIO_S1: [u8; 34] = [
    0x4d, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x01, 0x00, 0x60, 0x4d, 0x54,
    0x72, 0x6b, 0x00, 0x00, 0x00, 0x0c, 0x00, 0x90, 0x3c, 0x40, 0x60, 0x80, 0x3c, 0x40, 0x00, 0xff,
    0x2f, 0x00,
];

/// Builds a minimal well-formed one-track SMF: `header` (format/ppq) followed by a single MTrk
/// chunk wrapping `track_body` (delta/event bytes only — no MTrk tag/length/EndOfTrack required).
pub fn build_smf(format: u16, ppq: u16, track_body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&format.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&ppq.to_be_bytes());
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(track_body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(track_body);
    bytes
}
