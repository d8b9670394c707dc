//! Sample duration and sequencer ticks.
//!
//! The sound player runs at 96 ticks per second; a sound's layer note lasts
//! as many ticks as its sample plays.

use std::fmt;
use std::path::Path;

use crate::error::{Result, SfxError};
use crate::text::{MAX_SAMPLE_BYTES, read_file_with_limit};

/// Sequencer ticks per second
pub const TICKS_PER_SECOND: f64 = 96.0;

/// Longest duration a layer note can encode
pub const MAX_NOTE_TICKS: u32 = 0x7FFF;

/// A duration in sequencer ticks, printed as a hex literal (`0xc0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticks(pub u32);

impl Ticks {
    pub fn as_seconds(self) -> f64 {
        f64::from(self.0) / TICKS_PER_SECOND
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// `round(seconds * 96)`; negative or NaN durations give zero ticks.
pub fn duration_to_ticks(seconds: f64) -> Ticks {
    let ticks = (seconds * TICKS_PER_SECOND).round();
    if ticks.is_nan() || ticks <= 0.0 {
        return Ticks(0);
    }
    Ticks(ticks.min(f64::from(u32::MAX)) as u32)
}

/// Reports how long a sample plays.
pub trait DurationProbe {
    fn probe(&self, sample: &Path) -> Result<f64>;
}

/// Reads the duration from an AIFF/AIFC `COMM` chunk.
#[derive(Debug, Default, Clone, Copy)]
pub struct AiffProbe;

impl DurationProbe for AiffProbe {
    fn probe(&self, sample: &Path) -> Result<f64> {
        let data = read_file_with_limit(sample, MAX_SAMPLE_BYTES)?;
        let info = parse_aiff(&data).map_err(|reason| SfxError::InvalidSampleFile {
            path: sample.to_path_buf(),
            reason,
        })?;
        Ok(info.duration_seconds())
    }
}

/// Fields of the AIFF `COMM` chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiffInfo {
    pub channels: u16,
    pub frames: u32,
    pub bits_per_sample: u16,
    pub sample_rate: f64,
}

impl AiffInfo {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        f64::from(self.frames) / self.sample_rate
    }
}

fn be_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decode an 80-bit IEEE 754 extended float (big endian).
pub fn extended_to_f64(bytes: &[u8; 10]) -> f64 {
    let sign = if bytes[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    let exponent = i32::from(be_u16(&bytes[0..2]) & 0x7FFF);
    let mantissa = u64::from_be_bytes([
        bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7], bytes[8], bytes[9],
    ]);

    if exponent == 0 && mantissa == 0 {
        return 0.0;
    }
    if exponent == 0x7FFF {
        return f64::NAN;
    }
    // Explicit integer bit: value = mantissa * 2^(exponent - bias - 63)
    sign * mantissa as f64 * 2f64.powi(exponent - 16383 - 63)
}

/// Walk the FORM chunks and decode `COMM`.
pub fn parse_aiff(data: &[u8]) -> std::result::Result<AiffInfo, String> {
    if data.len() < 12 || &data[0..4] != b"FORM" {
        return Err("not an AIFF file (missing FORM header)".to_string());
    }
    let form_type = &data[8..12];
    if form_type != b"AIFF" && form_type != b"AIFC" {
        return Err("not an AIFF file (FORM type is not AIFF/AIFC)".to_string());
    }

    let mut offset = 12;
    while offset + 8 <= data.len() {
        let chunk_id = &data[offset..offset + 4];
        let chunk_size = be_u32(&data[offset + 4..offset + 8]) as usize;
        let body = offset + 8;

        if chunk_id == b"COMM" {
            if chunk_size < 18 || body + 18 > data.len() {
                return Err("truncated COMM chunk".to_string());
            }
            let comm = &data[body..body + 18];
            let mut rate = [0u8; 10];
            rate.copy_from_slice(&comm[8..18]);
            return Ok(AiffInfo {
                channels: be_u16(&comm[0..2]),
                frames: be_u32(&comm[2..6]),
                bits_per_sample: be_u16(&comm[6..8]),
                sample_rate: extended_to_f64(&rate),
            });
        }

        offset = body.saturating_add(chunk_size);
        if chunk_size % 2 == 1 {
            offset += 1; // Padding byte
        }
    }

    Err("no COMM chunk found".to_string())
}
