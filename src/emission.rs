//! C5: Emission & Deduplication.
//!
//! Owns everything between "C4 returned a decode attempt, or none" and the
//! single externally observable success, `on_key(DecodedKey)`: sanity
//! filtering, RAW fallback construction, duplicate suppression, startup
//! quiescence, and learning/operational verification.

use crate::dedup::{DisplayHistory, ShortWindowDedup};
use crate::error::{DecodeError, SanityFailReason};
use crate::key::{fnv1a_hash, raw_bit_string, DecodedKey};
use crate::protocols::DecodeAttempt;
use crate::te_estimator::estimate_te;
use crate::verification::PendingRecognition;

const STARTUP_QUIESCENCE_MS: u64 = 3_000;
const NOISE_FLOOR_DBM: i32 = -100;
const RAW_STABILITY_RATIO: f64 = 0.40;
const RAW_BIT_STRING_CAP: usize = 256;

/// Sink for decoded keys. A plain callback rather than a channel, matching
/// the push-callback boundary described for collaborators.
pub trait KeySink {
    fn on_key(&mut self, key: DecodedKey);
}

impl<F: FnMut(DecodedKey)> KeySink for F {
    fn on_key(&mut self, key: DecodedKey) {
        self(key)
    }
}

/// Frame-level metadata gathered alongside the pulse train, supplied by the
/// collaborator driving the pipeline (radio RSSI, configured frequency).
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub rssi_dbm: i32,
    pub frequency_mhz: f32,
    pub modulation: &'static str,
}

/// Runs the sanity filters against a full `DecodeAttempt`, §4.5.
fn sanity_check(attempt: &DecodeAttempt, te_used: f64, rssi_dbm: i32) -> Result<(), DecodeError> {
    use crate::edge::MIN_VALID_BITS;

    if attempt.bits_recovered < MIN_VALID_BITS {
        return Err(DecodeError::SanityFailure(SanityFailReason::AllZeros));
    }
    let all_ones = attempt.code == (1u64 << attempt.bits_recovered) - 1 && attempt.bits_recovered < 64;
    if all_ones {
        return Err(DecodeError::SanityFailure(SanityFailReason::AllOnes));
    }
    let ones = attempt.bit_string.chars().filter(|&c| c == '1').count();
    let ratio = ones as f64 / attempt.bit_string.len().max(1) as f64;
    if ratio > 0.90 || ratio < 0.10 {
        return Err(DecodeError::SanityFailure(SanityFailReason::AllZeros));
    }
    if attempt.bit_string.len() >= 24 {
        let prefix = &attempt.bit_string[0..8];
        let repeats = attempt
            .bit_string
            .as_bytes()
            .chunks(8)
            .take(3)
            .all(|c| c == prefix.as_bytes());
        if repeats {
            return Err(DecodeError::SanityFailure(SanityFailReason::RepeatedPattern));
        }
    }
    if attempt.protocol_name == "CAME" {
        let came_ok = (attempt.bits_recovered as f64) >= 0.95 * 24.0
            && (240.0..=420.0).contains(&te_used)
            && (0.15..=0.85).contains(&ratio);
        if !came_ok {
            return Err(DecodeError::SanityFailure(SanityFailReason::CameViolations));
        }
    }
    if rssi_dbm < NOISE_FLOOR_DBM {
        return Err(DecodeError::SanityFailure(SanityFailReason::LowRssi));
    }
    Ok(())
}

/// The full C5 orchestration: owns dedup and verification state across
/// frames, and decides whether/when to call into the configured `KeySink`.
pub struct Emitter {
    short_window: ShortWindowDedup,
    history: DisplayHistory,
    pending: PendingRecognition,
    learning_mode: bool,
    started_at_ms: Option<u64>,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            short_window: ShortWindowDedup::new(),
            history: DisplayHistory::new(),
            pending: PendingRecognition::new(),
            learning_mode: false,
            started_at_ms: None,
        }
    }
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_learning_mode(&mut self, enabled: bool) {
        self.learning_mode = enabled;
    }

    pub fn is_learning_mode(&self) -> bool {
        self.learning_mode
    }

    /// Clears dedup/verification state and restarts the startup quiescence
    /// window, per the control surface's `reset_state()`.
    pub fn reset_state(&mut self, now_ms: u64) {
        *self = Self::default();
        self.started_at_ms = Some(now_ms);
    }

    fn in_startup_quiescence(&self, now_ms: u64) -> bool {
        match self.started_at_ms {
            None => false,
            Some(start) => now_ms.saturating_sub(start) < STARTUP_QUIESCENCE_MS,
        }
    }

    /// Processes one captured, validated pulse train's decode outcome.
    /// `attempt` is C4's result (`None` means no protocol matched);
    /// `train_len`/`te_for_raw` support the RAW fallback path.
    pub fn process(
        &mut self,
        attempt: Option<DecodeAttempt>,
        train: &crate::edge::PulseTrain,
        ctx: FrameContext,
        now_ms: u64,
        sink: &mut impl KeySink,
    ) -> Result<(), DecodeError> {
        if self.started_at_ms.is_none() {
            self.started_at_ms = Some(now_ms);
        }
        if self.in_startup_quiescence(now_ms) {
            return Ok(());
        }

        let key = match attempt {
            Some(ref a) => {
                sanity_check(a, a.te_used, ctx.rssi_dbm)?;
                DecodedKey {
                    protocol: a.protocol_name.to_string(),
                    code: a.code,
                    bit_string: a.bit_string.clone(),
                    bit_length: a.bits_recovered,
                    te_us: a.te_used,
                    rssi_dbm: ctx.rssi_dbm,
                    frequency_mhz: ctx.frequency_mhz,
                    modulation: ctx.modulation.to_string(),
                    raw_hash: fnv1a_hash(train),
                    timestamp_ms: now_ms,
                }
            }
            None => {
                if train.len() < crate::edge::MIN_RAW_SIGNAL_LENGTH {
                    return Err(DecodeError::NoProtocolMatch);
                }
                let stability = estimate_te(train, RAW_STABILITY_RATIO);
                let te_us = match stability {
                    Some(est) => est.te_us,
                    None => return Err(DecodeError::NoProtocolMatch),
                };
                DecodedKey {
                    protocol: "RAW/Unknown".to_string(),
                    code: fnv1a_hash(train) as u64,
                    bit_string: raw_bit_string(train, RAW_BIT_STRING_CAP),
                    bit_length: train.len(),
                    te_us,
                    rssi_dbm: ctx.rssi_dbm,
                    frequency_mhz: ctx.frequency_mhz,
                    modulation: ctx.modulation.to_string(),
                    raw_hash: fnv1a_hash(train),
                    timestamp_ms: now_ms,
                }
            }
        };

        // Peek, don't record: a frame still accumulating repeat sightings
        // toward `required_repeats` must not be marked a duplicate of
        // itself before it has ever been emitted. Only a sighting of an
        // *already emitted* key is a duplicate at this point.
        if self.short_window.is_duplicate(&key, now_ms) {
            return Err(DecodeError::Duplicate);
        }

        let full_decode = attempt.as_ref().map(|a| a.full_decode).unwrap_or(false);
        let confirmed = self.pending.observe(
            &key.protocol,
            key.code,
            &key.bit_string,
            ctx.rssi_dbm,
            full_decode,
            key.bit_length,
            self.learning_mode,
            now_ms,
        );
        if !confirmed {
            return Err(DecodeError::PendingVerification);
        }
        if self.learning_mode {
            self.learning_mode = false;
        }

        // Only now, with the frame actually about to be emitted, does it
        // become a sighting later frames can be deduplicated against.
        self.short_window.record(&key, now_ms);

        if self.history.insert_if_new(&key, now_ms) {
            return Err(DecodeError::Duplicate);
        }
        sink.on_key(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::PulseTrain;

    fn ctx(rssi: i32) -> FrameContext {
        FrameContext {
            rssi_dbm: rssi,
            frequency_mhz: 433.92,
            modulation: "OOK",
        }
    }

    fn came_attempt(code: u64, te: f64) -> DecodeAttempt {
        DecodeAttempt {
            protocol_name: "CAME",
            skip_offset: 0,
            te_used: te,
            bits_recovered: 24,
            bit_count: 24,
            code,
            bit_string: format!("{:024b}", code),
            full_decode: true,
        }
    }

    #[test]
    fn startup_quiescence_drops_sane_frames() {
        let mut emitter = Emitter::new();
        let mut out = Vec::new();
        let train = PulseTrain::new();
        let res = emitter.process(Some(came_attempt(0xFD852B, 320.0)), &train, ctx(-55), 1000, &mut |k| out.push(k));
        assert!(res.is_ok());
        assert!(out.is_empty());
    }

    #[test]
    fn learning_mode_emits_on_first_sane_frame_and_clears() {
        let mut emitter = Emitter::new();
        emitter.reset_state(0);
        emitter.set_learning_mode(true);
        let mut out = Vec::new();
        let train = PulseTrain::new();
        emitter
            .process(Some(came_attempt(0xFD852B, 320.0)), &train, ctx(-55), 4000, &mut |k| out.push(k))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].protocol, "CAME");
        assert!(!emitter.is_learning_mode());
    }

    #[test]
    fn operational_mode_requires_repeats_for_weak_signal() {
        let mut emitter = Emitter::new();
        emitter.reset_state(0);
        let mut out = Vec::new();
        let train = PulseTrain::new();
        let attempt = came_attempt(0xABCDEF, 320.0);

        let r1 = emitter.process(Some(attempt.clone()), &train, ctx(-86), 4000, &mut |k| out.push(k));
        assert_eq!(r1, Err(DecodeError::PendingVerification));
        let r2 = emitter.process(Some(attempt.clone()), &train, ctx(-86), 4500, &mut |k| out.push(k));
        assert_eq!(r2, Err(DecodeError::PendingVerification));
        let r3 = emitter.process(Some(attempt), &train, ctx(-86), 5000, &mut |k| out.push(k));
        assert!(r3.is_ok());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn fourth_sighting_after_confirmation_is_a_suppressed_duplicate() {
        let mut emitter = Emitter::new();
        emitter.reset_state(0);
        let mut out = Vec::new();
        let train = PulseTrain::new();
        let attempt = came_attempt(0xABCDEF, 320.0);

        assert_eq!(
            emitter.process(Some(attempt.clone()), &train, ctx(-86), 4000, &mut |k| out.push(k)),
            Err(DecodeError::PendingVerification)
        );
        assert_eq!(
            emitter.process(Some(attempt.clone()), &train, ctx(-86), 4500, &mut |k| out.push(k)),
            Err(DecodeError::PendingVerification)
        );
        assert!(emitter
            .process(Some(attempt.clone()), &train, ctx(-86), 5000, &mut |k| out.push(k))
            .is_ok());
        assert_eq!(out.len(), 1);

        // A 4th sighting of the same key shortly after confirmation is a
        // duplicate of the already-emitted key, not a fresh pending series.
        assert_eq!(
            emitter.process(Some(attempt), &train, ctx(-86), 5200, &mut |k| out.push(k)),
            Err(DecodeError::Duplicate)
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn all_ones_code_fails_sanity() {
        let mut emitter = Emitter::new();
        emitter.reset_state(0);
        let mut out = Vec::new();
        let train = PulseTrain::new();
        let attempt = came_attempt(0x00FF_FFFF, 320.0);
        let res = emitter.process(Some(attempt), &train, ctx(-55), 4000, &mut |k| out.push(k));
        assert!(matches!(res, Err(DecodeError::SanityFailure(_))));
    }
}
