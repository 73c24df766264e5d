//! Error taxonomy for the decode pipeline.
//!
//! Every failure mode a frame can take on its way from the edge buffer to
//! `on_key` is a variant here. None of these propagate as panics or as
//! `Result::Err` out of the pipeline itself — they are returned internally
//! between C2–C5 and either logged at `trace`/`debug` level or folded into
//! counters. The only externally observable success is `on_key(DecodedKey)`.

use thiserror::Error;

/// Why a captured pulse train was rejected before a TE could even be estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameRejectReason {
    #[error("pulse train shorter than the minimum signal length")]
    TooShort,
    #[error("pulse duration spread outside tolerance")]
    BadSpread,
    #[error("pulse durations do not cluster around a dominant bin")]
    BadClustering,
    #[error("too few pulses fall within the valid duration range")]
    LowValidRatio,
}

/// Why a successfully decoded frame was dropped before emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SanityFailReason {
    #[error("decoded code is all-ones for its bit width")]
    AllOnes,
    #[error("decoded bit string is >90% ones or >90% zeros")]
    AllZeros,
    #[error("first 8 bits repeat identically 3+ times consecutively")]
    RepeatedPattern,
    #[error("RSSI below the noise floor")]
    LowRssi,
    #[error("CAME-specific bit count / TE / ones-ratio violation")]
    CameViolations,
}

/// The outcome of running one pulse train through the full pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer filled before an end-of-frame gap was seen; the frame was
    /// still handed off, just truncated.
    #[error("capture buffer overflowed before end-of-frame")]
    CaptureOverflow,
    #[error("frame rejected by the validator: {0}")]
    FrameRejected(FrameRejectReason),
    #[error("no coherent TE could be estimated for this pulse train")]
    NoCoherentTe,
    #[error("no catalog protocol matched this pulse train")]
    NoProtocolMatch,
    #[error("decoded frame failed a sanity filter: {0}")]
    SanityFailure(SanityFailReason),
    #[error("frame suppressed as a duplicate of a recently emitted key")]
    Duplicate,
    #[error("frame accepted into a pending verification series, not yet confirmed")]
    PendingVerification,
}
