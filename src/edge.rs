//! Core pulse-train data types shared by C1-C4.

/// Timing/validity constants shared across the pipeline. Values are lifted
/// verbatim from the reference firmware this decoder replaces.
pub const MIN_PULSE_US: u32 = 200;
pub const MAX_PULSE_US: u32 = 15_000;
pub const GLUE_THRESHOLD_US: u32 = 40;
pub const END_GAP_US: u32 = 5_000;
pub const MIN_PULSES_TO_ACCEPT: usize = 40;
pub const MIN_SIGNAL_LENGTH: usize = 30;
pub const MIN_RAW_SIGNAL_LENGTH: usize = 40;
pub const MIN_VALID_BITS: usize = 12;
pub const MAX_LEN: usize = 1024;

/// A level transition reported by the radio's edge-triggered interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub timestamp_us: u64,
    pub level_after: bool,
}

/// One logical pulse: the line held `level_before` for `duration_us`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub duration_us: u32,
    pub level_before: bool,
}

/// An ordered, bounded sequence of pulses captured between a first edge and
/// an end-of-frame gap (or buffer-full overrun).
#[derive(Debug, Clone, Default)]
pub struct PulseTrain {
    pub pulses: Vec<Pulse>,
    /// Set when the buffer filled before an end-of-frame gap was observed.
    pub overflowed: bool,
}

impl PulseTrain {
    pub fn new() -> Self {
        Self {
            pulses: Vec::new(),
            overflowed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// True iff every pulse duration is in range and adjacent levels alternate.
    /// A structural invariant checked in tests, not re-verified at runtime
    /// (C1 guarantees it by construction).
    pub fn invariants_hold(&self) -> bool {
        if self
            .pulses
            .iter()
            .any(|p| p.duration_us < MIN_PULSE_US || p.duration_us > MAX_PULSE_US)
        {
            return false;
        }
        self.pulses
            .windows(2)
            .all(|w| w[0].level_before != w[1].level_before)
    }
}
