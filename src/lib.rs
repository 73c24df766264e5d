//! Sub-GHz OOK/ASK remote-control decoder core.
//!
//! Five cooperating components carry a captured edge stream to a
//! deduplicated, verified `DecodedKey`: [`capture`] (C1), [`validator`] (C2),
//! [`te_estimator`] (C3), [`protocols`] (C4), and [`dedup`] /
//! [`verification`] / [`emission`] (C5). [`pipeline`] wires them together;
//! everything else ([`radio`], [`config`], [`keystore`]) is the ambient
//! stack a host binary needs around the core.

pub mod capture;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod edge;
pub mod emission;
pub mod error;
pub mod key;
pub mod keystore;
pub mod pipeline;
pub mod protocols;
pub mod radio;
pub mod te_estimator;
pub mod validator;
pub mod verification;

pub use edge::{Edge, Pulse, PulseTrain};
pub use emission::{Emitter, FrameContext, KeySink};
pub use error::DecodeError;
pub use key::DecodedKey;
pub use pipeline::{Decoder, TickOutcome};
