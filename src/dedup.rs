//! C5 (part 1): duplicate suppression.
//!
//! Two independent state sets, as described in the emission design: a
//! short-window dedup that absorbs the repeated transmissions of a single
//! button press, and a longer-lived, bounded display-history dedup for
//! user-facing duplicate suppression.

use crate::key::DecodedKey;

const RAW_EXACT_WINDOW_MS: u64 = 3_000;
const DECODED_WINDOW_MS: u64 = 5_000;
const RAW_APPROX_WINDOW_MS: u64 = 3_000;
const HISTORY_TTL_MS: u64 = 60_000;
const HISTORY_CAP: usize = 120;

/// Expected bit length per protocol, used only to decide whether a decode
/// counts as "full" for partial-vs-full suppression purposes.
fn expected_bits(protocol: &str) -> usize {
    match protocol {
        "CAME" => 24,
        "Princeton" => 24,
        "Gate TX" => 24,
        "EV1527" => 28,
        "Roger" => 28,
        _ => 24,
    }
}

struct RawSighting {
    hash: u32,
    ts_ms: u64,
}

struct DecodedSighting {
    protocol: String,
    code: u64,
    bit_length: usize,
    low16: u16,
    high16: u16,
    is_full: bool,
    ts_ms: u64,
}

/// Absorbs repeated transmissions of the same physical button press.
#[derive(Default)]
pub struct ShortWindowDedup {
    raw: Vec<RawSighting>,
    decoded: Vec<DecodedSighting>,
}

impl ShortWindowDedup {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(&mut self, now_ms: u64) {
        self.raw
            .retain(|s| now_ms.saturating_sub(s.ts_ms) <= RAW_APPROX_WINDOW_MS.max(RAW_EXACT_WINDOW_MS));
        self.decoded
            .retain(|s| now_ms.saturating_sub(s.ts_ms) <= DECODED_WINDOW_MS);
    }

    /// Returns `true` if `key` matches an already-*recorded* sighting (i.e.
    /// a previously emitted key), without recording `key` itself. Callers
    /// must still call [`record`](Self::record) once `key` is actually
    /// confirmed/emitted -- peeking here must not itself count as a
    /// sighting, or a key awaiting verification repeats would mark itself a
    /// duplicate of its own first (unconfirmed) occurrence and never
    /// accumulate the repeats needed to emit.
    pub fn is_duplicate(&mut self, key: &DecodedKey, now_ms: u64) -> bool {
        self.prune(now_ms);

        if key.is_raw() {
            let tolerance = (key.raw_hash / 100).max(1000);
            return self.raw.iter().any(|s| {
                let age = now_ms.saturating_sub(s.ts_ms);
                if s.hash == key.raw_hash && age <= RAW_EXACT_WINDOW_MS {
                    return true;
                }
                let diff = s.hash.abs_diff(key.raw_hash);
                diff <= tolerance && age <= RAW_APPROX_WINDOW_MS
            });
        }

        let is_exact_dup = self.decoded.iter().any(|s| {
            s.protocol == key.protocol
                && s.code == key.code
                && now_ms.saturating_sub(s.ts_ms) <= DECODED_WINDOW_MS
        });
        if is_exact_dup {
            return true;
        }

        let expected = expected_bits(&key.protocol);
        let is_full = key.bit_length >= expected;
        if !is_full {
            return self.decoded.iter().any(|s| {
                s.is_full
                    && now_ms.saturating_sub(s.ts_ms) <= DECODED_WINDOW_MS
                    && (s.low16 == key.low16() || s.high16 == key.high16())
            });
        }
        false
    }

    /// Records `key` as a sighting for future `is_duplicate` checks. Call
    /// only once the frame has cleared verification and is about to be
    /// emitted (RAW frames, which skip the verification FSM, record on
    /// their own first sighting).
    pub fn record(&mut self, key: &DecodedKey, now_ms: u64) {
        self.prune(now_ms);

        if key.is_raw() {
            self.raw.push(RawSighting {
                hash: key.raw_hash,
                ts_ms: now_ms,
            });
            return;
        }

        let expected = expected_bits(&key.protocol);
        let is_full = key.bit_length >= expected;
        self.decoded.push(DecodedSighting {
            protocol: key.protocol.clone(),
            code: key.code,
            bit_length: key.bit_length,
            low16: key.low16(),
            high16: key.high16(),
            is_full,
            ts_ms: now_ms,
        });
    }
}

struct HistoryEntry {
    protocol: String,
    code: u64,
    bit_string: String,
    raw_hash: u32,
    ts_ms: u64,
}

/// Bounded, TTL'd history used for user-visible duplicate suppression.
#[derive(Default)]
pub struct DisplayHistory {
    entries: Vec<HistoryEntry>,
}

impl DisplayHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(&mut self, now_ms: u64) {
        self.entries
            .retain(|e| now_ms.saturating_sub(e.ts_ms) <= HISTORY_TTL_MS);
        if self.entries.len() > HISTORY_CAP {
            let overflow = self.entries.len() - HISTORY_CAP;
            self.entries.drain(0..overflow);
        }
    }

    /// Returns `true` if `key` is already present (a duplicate); otherwise
    /// records it and returns `false`.
    pub fn insert_if_new(&mut self, key: &DecodedKey, now_ms: u64) -> bool {
        self.prune(now_ms);
        let is_dup = self.entries.iter().any(|e| {
            if key.is_raw() {
                e.protocol == key.protocol && e.raw_hash == key.raw_hash
            } else if !key.bit_string.is_empty() && !e.bit_string.is_empty() {
                e.protocol == key.protocol && e.bit_string == key.bit_string
            } else {
                e.protocol == key.protocol && e.code == key.code
            }
        });
        if is_dup {
            return true;
        }
        self.entries.push(HistoryEntry {
            protocol: key.protocol.clone(),
            code: key.code,
            bit_string: key.bit_string.clone(),
            raw_hash: key.raw_hash,
            ts_ms: now_ms,
        });
        if self.entries.len() > HISTORY_CAP {
            self.entries.remove(0);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn came_key(code: u64, bit_length: usize, ts: u64) -> DecodedKey {
        DecodedKey {
            protocol: "CAME".into(),
            code,
            bit_string: format!("{:024b}", code)[24 - bit_length..].to_string(),
            bit_length,
            te_us: 320.0,
            rssi_dbm: -60,
            frequency_mhz: 433.92,
            modulation: "OOK".into(),
            raw_hash: 0,
            timestamp_ms: ts,
        }
    }

    #[test]
    fn exact_decoded_duplicate_within_window_is_suppressed() {
        let mut dedup = ShortWindowDedup::new();
        let k = came_key(0xABCDEF, 24, 0);
        assert!(!dedup.is_duplicate(&k, 0));
        dedup.record(&k, 0);
        assert!(dedup.is_duplicate(&k, 2000));
    }

    #[test]
    fn partial_overlapping_full_decode_is_suppressed() {
        let mut dedup = ShortWindowDedup::new();
        let full = came_key(0xABCDEF, 24, 0);
        assert!(!dedup.is_duplicate(&full, 0));
        dedup.record(&full, 0);

        let mut partial = came_key(0xABCDEF, 20, 1000);
        partial.code = 0xCDEF; // low-16 overlap with the full decode
        assert!(dedup.is_duplicate(&partial, 1000));
    }

    #[test]
    fn display_history_matches_on_protocol_and_bit_string() {
        let mut history = DisplayHistory::new();
        let k = came_key(0xABCDEF, 24, 0);
        assert!(!history.insert_if_new(&k, 0));
        assert!(history.insert_if_new(&k, 500));
    }
}
