//! C4: the protocol catalog and the generic tolerance decoder over it.
//!
//! Unlike a per-protocol decoder architecture, nothing here is specific to
//! any named remote-control protocol: `catalog` is data, `decode` is the one
//! algorithm that interprets it. See `DESIGN.md` for why this replaces a
//! one-struct-per-protocol design.

pub mod catalog;
pub mod decode;
pub mod overrides;

pub use catalog::{ProtocolSpec, CATALOG};
pub use decode::{decode, decode_over, DecodeAttempt};
pub use overrides::load_effective_catalog;
