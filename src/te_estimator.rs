//! C3: TE Estimator.
//!
//! Finds the base time element `TE` that best explains a validated pulse
//! train as integer multiples of a single period, using a median-seeded
//! search over the leading pulses followed by grid-fit scoring.

use crate::edge::PulseTrain;

const TE_MIN_US: f64 = 100.0;
const TE_MAX_US: f64 = 2000.0;
const SEED_SAMPLE_CAP: usize = 100;
const GRID_TOLERANCE: f64 = 0.30;
const VALIDATED_COUNT_RATIO: f64 = 0.6;
const MAX_AVG_DEVIATION: f64 = 0.20;

/// Result of a successful TE estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeEstimate {
    pub te_us: f64,
    pub validated_count: usize,
    pub avg_deviation: f64,
}

/// Estimate the TE for a pulse train, or `None` if no coherent grid fits.
///
/// `min_stability_ratio` lets callers (RAW fallback, §4.5) ask the same
/// scoring function for a looser 40% threshold instead of the normal 60%.
pub fn estimate_te(train: &PulseTrain, min_stability_ratio: f64) -> Option<TeEstimate> {
    let n = train.len();
    if n == 0 {
        return None;
    }
    let sample_len = n.min(SEED_SAMPLE_CAP);
    let sample: Vec<f64> = train.pulses[..sample_len]
        .iter()
        .map(|p| p.duration_us as f64)
        .collect();

    let mut best: Option<TeEstimate> = None;
    for &candidate in &sample {
        if !(TE_MIN_US..=TE_MAX_US).contains(&candidate) {
            continue;
        }
        let (count, avg_dev) = score_candidate(&train.pulses, candidate);
        let better = match &best {
            None => true,
            Some(b) => count > b.validated_count,
        };
        if better {
            best = Some(TeEstimate {
                te_us: candidate,
                validated_count: count,
                avg_deviation: avg_dev,
            });
        }
    }

    let best = best?;
    if (best.validated_count as f64) < min_stability_ratio * n as f64
        || best.avg_deviation > MAX_AVG_DEVIATION
    {
        return None;
    }
    Some(best)
}

fn score_candidate(pulses: &[crate::edge::Pulse], te: f64) -> (usize, f64) {
    let mut count = 0usize;
    let mut dev_sum = 0.0f64;
    for p in pulses {
        let ratio = p.duration_us as f64 / te;
        let nearest = ratio.round().max(1.0);
        let deviation = (ratio - nearest).abs() / nearest;
        if deviation <= GRID_TOLERANCE {
            count += 1;
            dev_sum += deviation;
        }
    }
    let avg_dev = if count > 0 {
        dev_sum / count as f64
    } else {
        f64::MAX
    };
    (count, avg_dev)
}

/// Convenience wrapper applying the standard 60% stability threshold used
/// when deciding whether to hand a train to the protocol decoder.
pub fn estimate_te_for_decode(train: &PulseTrain) -> Option<TeEstimate> {
    estimate_te(train, VALIDATED_COUNT_RATIO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Pulse;

    fn synthetic_train(te: u32, bits: &[bool]) -> PulseTrain {
        let mut pulses = Vec::new();
        let mut level = true;
        for &bit in bits {
            let (high_mult, low_mult) = if bit { (3, 1) } else { (1, 3) };
            pulses.push(Pulse {
                duration_us: te * high_mult,
                level_before: level,
            });
            level = !level;
            pulses.push(Pulse {
                duration_us: te * low_mult,
                level_before: level,
            });
            level = !level;
        }
        PulseTrain {
            pulses,
            overflowed: false,
        }
    }

    #[test]
    fn estimates_te_from_clean_grid() {
        let bits: Vec<bool> = (0..24).map(|i| i % 2 == 0).collect();
        let train = synthetic_train(320, &bits);
        let est = estimate_te_for_decode(&train).expect("should find TE");
        assert!((est.te_us - 320.0).abs() < 5.0 || (est.te_us * 3.0 - 320.0 * 3.0).abs() < 5.0);
    }

    #[test]
    fn rejects_when_no_coherent_grid() {
        let pulses: Vec<Pulse> = (0..60)
            .map(|i| Pulse {
                duration_us: 200 + (i * 241) % 14000,
                level_before: i % 2 == 0,
            })
            .collect();
        let train = PulseTrain {
            pulses,
            overflowed: false,
        };
        assert!(estimate_te_for_decode(&train).is_none());
    }
}
