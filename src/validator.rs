//! C2: Frame Validator.
//!
//! Cheap statistical gatekeeping before the more expensive TE estimation and
//! protocol decoding passes run: rejects anything too short, too noisy, or
//! too uniform to plausibly be a packet. Rationale is returned only for
//! diagnostics; emission decisions never depend on *which* check failed.

use crate::edge::{PulseTrain, MAX_PULSE_US, MIN_PULSE_US, MIN_SIGNAL_LENGTH};
use crate::error::{DecodeError, FrameRejectReason};

const VALID_RATIO_MIN: f64 = 0.75;
const SPREAD_RATIO_MAX: f64 = 3.5;
const CLUSTER_BINS: usize = 5;
const CLUSTER_MIN_FRACTION: f64 = 0.30;

/// Run the four validator checks against a captured pulse train.
pub fn validate(train: &PulseTrain) -> Result<(), DecodeError> {
    let n = train.len();
    if n < MIN_SIGNAL_LENGTH {
        return Err(DecodeError::FrameRejected(FrameRejectReason::TooShort));
    }

    let valid: Vec<u32> = train
        .pulses
        .iter()
        .map(|p| p.duration_us)
        .filter(|&d| (MIN_PULSE_US..=MAX_PULSE_US).contains(&d))
        .collect();
    let v = valid.len();
    if (v as f64) < VALID_RATIO_MIN * (n as f64) {
        return Err(DecodeError::FrameRejected(FrameRejectReason::LowValidRatio));
    }

    let sum: u64 = valid.iter().map(|&d| d as u64).sum();
    let avg = sum as f64 / v as f64;
    let min = *valid.iter().min().unwrap() as f64;
    let max = *valid.iter().max().unwrap() as f64;

    if max > SPREAD_RATIO_MAX * avg || min < avg / SPREAD_RATIO_MAX {
        return Err(DecodeError::FrameRejected(FrameRejectReason::BadSpread));
    }

    if !clusters(&valid, min, max) {
        return Err(DecodeError::FrameRejected(FrameRejectReason::BadClustering));
    }

    Ok(())
}

fn clusters(valid: &[u32], min: f64, max: f64) -> bool {
    let span = (max - min).max(1.0);
    let mut bins = [0usize; CLUSTER_BINS];
    for &d in valid {
        let frac = (d as f64 - min) / span;
        let idx = ((frac * CLUSTER_BINS as f64) as usize).min(CLUSTER_BINS - 1);
        bins[idx] += 1;
    }
    let largest = *bins.iter().max().unwrap();
    (largest as f64) >= CLUSTER_MIN_FRACTION * valid.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Pulse;

    fn train_of(durations: &[u32]) -> PulseTrain {
        let mut level = true;
        let pulses = durations
            .iter()
            .map(|&d| {
                let p = Pulse {
                    duration_us: d,
                    level_before: level,
                };
                level = !level;
                p
            })
            .collect();
        PulseTrain {
            pulses,
            overflowed: false,
        }
    }

    #[test]
    fn too_short_is_rejected() {
        let t = train_of(&vec![400; MIN_SIGNAL_LENGTH - 1]);
        assert_eq!(
            validate(&t),
            Err(DecodeError::FrameRejected(FrameRejectReason::TooShort))
        );
    }

    #[test]
    fn clean_clustered_train_passes() {
        // Alternating 320/960us pulses, strongly clustered near 320.
        let mut durations = Vec::new();
        for i in 0..40 {
            durations.push(if i % 4 == 0 { 960 } else { 320 });
        }
        let t = train_of(&durations);
        assert!(validate(&t).is_ok());
    }

    #[test]
    fn uniform_noise_fails_clustering() {
        // Spread evenly across a moderate band (so the spread check still
        // passes) with no dominant bin -> clustering check must catch it.
        let mut durations = Vec::new();
        for i in 0..50u32 {
            durations.push(1000 + i * 50); // 1000..=3450, evenly spaced
        }
        let t = train_of(&durations);
        assert_eq!(
            validate(&t),
            Err(DecodeError::FrameRejected(FrameRejectReason::BadClustering))
        );
    }
}
