//! The protocol catalog: an immutable, priority-ordered table of
//! `ProtocolSpec` entries. The decoder (`protocols::decode`) is entirely
//! generic over this table — adding a protocol means adding a row here,
//! never touching decode logic.

/// One catalog entry. `nominal_te_us == 0` means "auto-detect from C3's
/// estimate" rather than anchoring to a fixed value.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolSpec {
    pub name: &'static str,
    pub bit_count: usize,
    pub nominal_te_us: u32,
    pub high_ratio: f64,
    pub low_ratio: f64,
    pub inverted: bool,
    pub manchester: bool,
    /// For Manchester entries: true = IEEE 802.3 convention (short-then-long
    /// sub-pulse is `0`), false = G.E. Thomas convention. Ignored otherwise.
    pub manchester_ieee802_3: bool,
    /// Protocol-specific TE search window in microseconds, per §4.4.
    pub te_window: (u32, u32),
    /// PT2262-family entries enumerate their ratio as separate rows, so the
    /// decoder only tries the declared ratio plus its inverted polarity
    /// instead of the usual three variants.
    pub ratio_enumerated_family: bool,
    /// Rolling-code protocols recognized by frame shape only: never
    /// decrypted or counter-derived by the core decoder.
    pub structural_only: bool,
}

const DEFAULT_TE_WINDOW: (u32, u32) = (100, 2000);

macro_rules! spec {
    ($name:expr, $bits:expr, $te:expr, $high:expr, $low:expr) => {
        ProtocolSpec {
            name: $name,
            bit_count: $bits,
            nominal_te_us: $te,
            high_ratio: $high,
            low_ratio: $low,
            inverted: false,
            manchester: false,
            manchester_ieee802_3: false,
            te_window: DEFAULT_TE_WINDOW,
            ratio_enumerated_family: false,
            structural_only: false,
        }
    };
}

/// The full fixed-code catalog, in priority order: gate-opener protocols
/// first, then generic fixed-code remotes, then structural-only rolling-code
/// families.
pub const CATALOG: &[ProtocolSpec] = &[
    // --- Gate-opener protocols first ---
    ProtocolSpec {
        te_window: (250, 400),
        ..spec!("CAME", 24, 320, 1.0, 3.0)
    },
    ProtocolSpec {
        te_window: (250, 400),
        ..spec!("CAME", 12, 320, 1.0, 3.0)
    },
    spec!("Princeton", 24, 400, 1.0, 3.0),
    spec!("Bytec", 24, 0, 1.0, 3.0),
    spec!("Gate TX", 24, 0, 1.0, 3.0),
    ProtocolSpec {
        te_window: (250, 1000),
        ..spec!("Nero Radio", 56, 330, 1.0, 3.0)
    },
    spec!("Nero Sketch", 24, 400, 1.0, 3.0),
    spec!("Nice FLO", 24, 0, 1.0, 3.0),
    spec!("Nice FLO", 12, 0, 1.0, 3.0),
    // --- Popular fixed-code remotes ---
    spec!("EV1527", 28, 400, 1.0, 3.0),
    ProtocolSpec {
        ratio_enumerated_family: true,
        ..spec!("PT2262", 24, 500, 1.0, 3.0)
    },
    ProtocolSpec {
        ratio_enumerated_family: true,
        ..spec!("PT2262_1:2", 24, 500, 1.0, 2.0)
    },
    ProtocolSpec {
        ratio_enumerated_family: true,
        ..spec!("PT2262_1:1", 24, 500, 1.0, 1.0)
    },
    spec!("HX2262", 32, 500, 1.0, 2.0),
    spec!("Roger", 28, 400, 1.0, 3.0),
    spec!("Linear", 10, 400, 1.0, 3.0),
    spec!("BETT", 18, 400, 1.0, 3.0),
    // PT2262-compatible timing, distinct (shorter) preamble in real
    // hardware; the core distinguishes it from PT2262 only by bit count.
    ProtocolSpec {
        ratio_enumerated_family: true,
        ..spec!("Holtek HT12E", 12, 400, 1.0, 3.0)
    },
    // --- Manchester-coded remotes ---
    ProtocolSpec {
        manchester: true,
        manchester_ieee802_3: true,
        structural_only: true,
        te_window: (300, 900),
        ..spec!("Somfy", 56, 0, 1.0, 1.0)
    },
    // --- Structural-only rolling-code families (never decrypted here) ---
    ProtocolSpec {
        structural_only: true,
        te_window: (300, 900),
        ..spec!("Nice FlorS", 52, 0, 1.0, 3.0)
    },
    ProtocolSpec {
        structural_only: true,
        ..spec!("KeeLoq Generic", 64, 400, 1.0, 2.0)
    },
    ProtocolSpec {
        structural_only: true,
        ..spec!("KeeLoq Generic 66", 66, 400, 1.0, 2.0)
    },
    ProtocolSpec {
        structural_only: true,
        ..spec!("Kia", 61, 250, 1.0, 2.0)
    },
    ProtocolSpec {
        structural_only: true,
        ..spec!("Ford", 64, 250, 1.0, 2.0)
    },
    ProtocolSpec {
        structural_only: true,
        ..spec!("VAG", 80, 500, 1.0, 2.0)
    },
    ProtocolSpec {
        structural_only: true,
        ..spec!("Fiat", 64, 200, 1.0, 2.0)
    },
    ProtocolSpec {
        structural_only: true,
        ..spec!("Suzuki", 64, 250, 1.0, 2.0)
    },
    ProtocolSpec {
        structural_only: true,
        te_window: (700, 1200),
        ..spec!("Scher-Khan", 35, 750, 1.0, 1.5)
    },
    ProtocolSpec {
        structural_only: true,
        ..spec!("Star Line", 64, 250, 1.0, 2.0)
    },
    ProtocolSpec {
        structural_only: true,
        ..spec!("PSA", 128, 250, 1.0, 2.0)
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_unique_priority_ordering_and_came_first() {
        assert!(CATALOG.len() >= 25);
        assert_eq!(CATALOG[0].name, "CAME");
        assert_eq!(CATALOG[0].bit_count, 24);
    }

    #[test]
    fn pt2262_family_entries_are_ratio_enumerated() {
        let count = CATALOG
            .iter()
            .filter(|p| p.name.starts_with("PT2262"))
            .count();
        assert_eq!(count, 3);
        for p in CATALOG.iter().filter(|p| p.name.starts_with("PT2262")) {
            assert!(p.ratio_enumerated_family);
        }
    }
}
