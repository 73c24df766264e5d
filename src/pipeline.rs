//! Glue module: wires C1 (`EdgeCapture`) through C2-C5 into a single
//! `Decoder` that a host loop can drive by polling once per tick.

use crate::clock::Clock;
use crate::edge::PulseTrain;
use crate::emission::{Emitter, FrameContext, KeySink};
use crate::error::DecodeError;
use crate::protocols::{decode_over, ProtocolSpec, CATALOG};
use crate::te_estimator::estimate_te_for_decode;
use crate::validator::validate;

/// Per-tick outcome, surfaced mainly for logging/metrics; the only
/// consumer-visible success remains the `KeySink` callback.
#[derive(Debug)]
pub enum TickOutcome {
    /// The frame was silently dropped without a tagged error (startup
    /// quiescence is the only case today).
    Suppressed,
    Rejected(DecodeError),
    Emitted,
}

/// Runs C2-C5 over frames pulled from an `EdgeCapture`. Does not own the
/// capture or the radio driver — those are supplied by the host loop, which
/// also supplies per-frame RSSI/frequency context.
pub struct Decoder<C: Clock> {
    clock: C,
    emitter: Emitter,
    /// `None` means "use the compiled `CATALOG`"; `Some` holds an owned
    /// effective catalog built from a §10.1 TOML override file.
    catalog: Option<Vec<ProtocolSpec>>,
}

impl<C: Clock> Decoder<C> {
    pub fn new(clock: C) -> Self {
        let now_ms = clock.now_ms();
        let mut emitter = Emitter::new();
        emitter.reset_state(now_ms);
        Self { clock, emitter, catalog: None }
    }

    /// Same as [`Decoder::new`], but decodes against a caller-supplied
    /// effective catalog instead of the compiled [`CATALOG`] -- see
    /// `protocols::overrides::load_effective_catalog`.
    pub fn with_catalog(clock: C, catalog: Vec<ProtocolSpec>) -> Self {
        let now_ms = clock.now_ms();
        let mut emitter = Emitter::new();
        emitter.reset_state(now_ms);
        Self { clock, emitter, catalog: Some(catalog) }
    }

    fn active_catalog(&self) -> &[ProtocolSpec] {
        self.catalog.as_deref().unwrap_or(CATALOG)
    }

    pub fn set_learning_mode(&mut self, enabled: bool) {
        self.emitter.set_learning_mode(enabled);
    }

    pub fn reset_state(&mut self) {
        self.emitter.reset_state(self.clock.now_ms());
    }

    /// Runs one captured train through C2-C5. Call once per frame the host
    /// loop pulls from `EdgeCapture::poll()`.
    pub fn process_frame(
        &mut self,
        train: PulseTrain,
        ctx: FrameContext,
        sink: &mut impl KeySink,
    ) -> TickOutcome {
        let now_ms = self.clock.now_ms();

        if train.overflowed {
            tracing::debug!("capture buffer overflowed before end-of-frame");
        }

        if let Err(e) = validate(&train) {
            tracing::trace!(?e, "frame rejected by validator");
            return TickOutcome::Rejected(e);
        }

        let attempt = estimate_te_for_decode(&train)
            .and_then(|te| decode_over(&train, te.te_us, self.active_catalog()));

        let mut emitted = false;
        let mut counting_sink = |key: crate::key::DecodedKey| {
            emitted = true;
            sink.on_key(key);
        };
        match self.emitter.process(attempt, &train, ctx, now_ms, &mut counting_sink) {
            Ok(()) if emitted => TickOutcome::Emitted,
            Ok(()) => TickOutcome::Suppressed,
            Err(e) => TickOutcome::Rejected(e),
        }
    }
}
