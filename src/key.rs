//! Emitted data types: `DecodedKey` and the raw-signal hash used for the
//! RAW/Unknown fallback and for hash-similarity deduplication.

use serde::{Deserialize, Serialize};

use crate::edge::PulseTrain;

/// A fully processed, emission-ready decode result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedKey {
    pub protocol: String,
    pub code: u64,
    pub bit_string: String,
    pub bit_length: usize,
    pub te_us: f64,
    pub rssi_dbm: i32,
    pub frequency_mhz: f32,
    pub modulation: String,
    pub raw_hash: u32,
    pub timestamp_ms: u64,
}

impl DecodedKey {
    pub fn is_raw(&self) -> bool {
        self.protocol == "RAW/Unknown"
    }

    /// Fraction of `bit_string` characters that are `'1'`.
    pub fn ones_ratio(&self) -> f64 {
        if self.bit_string.is_empty() {
            return 0.0;
        }
        let ones = self.bit_string.chars().filter(|&c| c == '1').count();
        ones as f64 / self.bit_string.len() as f64
    }

    /// True if the first 8 bits repeat identically 3+ times consecutively.
    pub fn has_repeated_prefix(&self) -> bool {
        if self.bit_string.len() < 24 {
            return false;
        }
        let prefix = &self.bit_string[0..8];
        self.bit_string
            .as_bytes()
            .chunks(8)
            .take(3)
            .all(|c| c == prefix.as_bytes())
    }

    pub fn low16(&self) -> u16 {
        (self.code & 0xFFFF) as u16
    }

    pub fn high16(&self) -> u16 {
        ((self.code >> 16) & 0xFFFF) as u16
    }
}

/// FNV-1a over the raw pulse durations, used both as the RAW/Unknown `code`
/// and as a cheap similarity key for hash-based deduplication.
pub fn fnv1a_hash(train: &PulseTrain) -> u32 {
    let mut hash: u32 = 0x811C_9DC5;
    for pulse in &train.pulses {
        for byte in pulse.duration_us.to_le_bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(0x0100_0193);
        }
    }
    hash
}

/// Compact textual encoding of a raw (undecoded) pulse train: comma-joined
/// `duration_us` values, capped to keep the bit_string bounded.
pub fn raw_bit_string(train: &PulseTrain, cap: usize) -> String {
    train
        .pulses
        .iter()
        .take(cap)
        .map(|p| p.duration_us.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(bit_string: &str, code: u64) -> DecodedKey {
        DecodedKey {
            protocol: "CAME".into(),
            code,
            bit_string: bit_string.into(),
            bit_length: bit_string.len(),
            te_us: 320.0,
            rssi_dbm: -60,
            frequency_mhz: 433.92,
            modulation: "OOK".into(),
            raw_hash: 0,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn ones_ratio_counts_correctly() {
        let k = key("1100", 0xC);
        assert_eq!(k.ones_ratio(), 0.5);
    }

    #[test]
    fn high_low_16_split() {
        let k = key("111111111111111111111111", 0x00AB_CDEF);
        assert_eq!(k.low16(), 0xCDEF);
        assert_eq!(k.high16(), 0x00AB);
    }
}
