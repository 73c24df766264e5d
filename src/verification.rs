//! Learning / operational verification state machine (§4.5, §4.6).
//!
//! A freshly decoded frame is not emitted until it has repeated enough times
//! within a bounded window to rule out a glitch-decoded one-off — except in
//! learning mode, where the very first sane frame is trusted immediately so
//! a new remote can be enrolled in one press.

const FIRST_SEEN_WINDOW_MS: u64 = 1_500;
const INTER_SIGHTING_RESET_MS: u64 = 2_500;
const EXPIRY_MS: u64 = 5_000;
const SWEEP_INTERVAL_MS: u64 = 1_500;
const BIT_STRING_SIMILARITY_MIN: f64 = 0.95;

/// Adaptive repeat requirement, §4.5.
pub fn required_repeats(full_decode: bool, rssi_dbm: i32, bit_length: usize) -> u32 {
    let mut required: i32 = 2;
    if full_decode && rssi_dbm > -68 && bit_length < 56 {
        required = 1;
    }
    if !full_decode || rssi_dbm < -85 {
        required = required.max(3);
    }
    if bit_length >= 56 && rssi_dbm < -80 {
        required = required.max(3);
    }
    if bit_length >= 80 {
        required = required.max(3);
    }
    required.clamp(1, 5) as u32
}

fn bit_string_similar(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return a == b;
    }
    let n = a.len().min(b.len());
    let matches = a.bytes().zip(b.bytes()).take(n).filter(|(x, y)| x == y).count();
    let similarity = matches as f64 / a.len().max(b.len()) as f64;
    similarity >= BIT_STRING_SIMILARITY_MIN
}

struct Pending {
    protocol: String,
    code: u64,
    bit_string: String,
    first_seen_ms: u64,
    last_seen_ms: u64,
    repeat_count: u32,
    required_repeats: u32,
}

/// Tracks repeat-sightings of not-yet-confirmed `(protocol, code, bit_string)`
/// triples, per the `New -> Accumulating -> Confirmed|Expired` FSM of §4.6.
pub struct PendingRecognition {
    pending: Vec<Pending>,
    last_sweep_ms: u64,
}

impl Default for PendingRecognition {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            last_sweep_ms: 0,
        }
    }
}

impl PendingRecognition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evicts series that have seen total silence for `EXPIRY_MS`. Rate
    /// limited internally; safe to call on every tick.
    pub fn sweep(&mut self, now_ms: u64) {
        if now_ms.saturating_sub(self.last_sweep_ms) < SWEEP_INTERVAL_MS {
            return;
        }
        self.last_sweep_ms = now_ms;
        self.pending
            .retain(|p| now_ms.saturating_sub(p.last_seen_ms) <= EXPIRY_MS);
    }

    /// Records a sighting. `learning_mode` bypasses repeat verification
    /// entirely: the caller should emit and clear learning mode on `true`.
    /// Otherwise returns `true` once `required_repeats` sightings of the
    /// same key have landed within the window, at which point the series is
    /// removed and the caller should emit.
    pub fn observe(
        &mut self,
        protocol: &str,
        code: u64,
        bit_string: &str,
        rssi_dbm: i32,
        full_decode: bool,
        bit_length: usize,
        learning_mode: bool,
        now_ms: u64,
    ) -> bool {
        if learning_mode {
            self.pending
                .retain(|p| !(p.protocol == protocol && p.code == code));
            return true;
        }

        self.sweep(now_ms);

        if let Some(entry) = self.pending.iter_mut().find(|p| {
            p.protocol == protocol && p.code == code && bit_string_similar(&p.bit_string, bit_string)
        }) {
            let since_first = now_ms.saturating_sub(entry.first_seen_ms);
            let since_last = now_ms.saturating_sub(entry.last_seen_ms);
            if since_last > INTER_SIGHTING_RESET_MS || since_first > FIRST_SEEN_WINDOW_MS {
                entry.first_seen_ms = now_ms;
                entry.repeat_count = 1;
            } else {
                entry.repeat_count += 1;
            }
            entry.last_seen_ms = now_ms;
            entry.required_repeats = required_repeats(full_decode, rssi_dbm, bit_length);
            if entry.repeat_count >= entry.required_repeats {
                self.pending
                    .retain(|p| !(p.protocol == protocol && p.code == code));
                return true;
            }
            return false;
        }

        let required = required_repeats(full_decode, rssi_dbm, bit_length);
        if required <= 1 {
            return true;
        }
        self.pending.push(Pending {
            protocol: protocol.to_string(),
            code,
            bit_string: bit_string.to_string(),
            first_seen_ms: now_ms,
            last_seen_ms: now_ms,
            repeat_count: 1,
            required_repeats: required,
        });
        false
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learning_mode_confirms_immediately() {
        let mut pr = PendingRecognition::new();
        assert!(pr.observe("CAME", 1, "101010", -55, true, 24, true, 0));
    }

    #[test]
    fn weak_remote_needs_three_repeats_within_first_seen_window() {
        let mut pr = PendingRecognition::new();
        assert_eq!(required_repeats(true, -86, 24), 3);
        assert!(!pr.observe("CAME", 2, "101010", -86, true, 24, false, 0));
        assert!(!pr.observe("CAME", 2, "101010", -86, true, 24, false, 500));
        assert!(pr.observe("CAME", 2, "101010", -86, true, 24, false, 1000));
    }

    #[test]
    fn baseline_conditions_confirm_on_second_sighting_within_1500ms() {
        let mut pr = PendingRecognition::new();
        assert_eq!(required_repeats(true, -75, 24), 2);
        assert!(!pr.observe("CAME", 3, "101010", -75, true, 24, false, 0));
        assert!(pr.observe("CAME", 3, "101010", -75, true, 24, false, 1200));
    }

    #[test]
    fn second_sighting_past_first_seen_window_resets_series() {
        let mut pr = PendingRecognition::new();
        assert!(!pr.observe("CAME", 4, "101010", -75, true, 24, false, 0));
        assert!(!pr.observe("CAME", 4, "101010", -75, true, 24, false, 1600));
        assert_eq!(pr.pending_count(), 1);
    }

    #[test]
    fn strong_full_decode_short_frame_needs_only_one_sighting() {
        let mut pr = PendingRecognition::new();
        assert_eq!(required_repeats(true, -60, 24), 1);
        assert!(pr.observe("CAME", 5, "101010", -60, true, 24, false, 0));
    }
}
