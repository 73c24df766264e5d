//! Persisted trusted-key store and the §6 key-match lookup.
//!
//! Structural analog of the source firmware's NVS-backed trusted-key list,
//! translated to a host-filesystem JSON store — there is no NVS outside the
//! embedded target. Load/save follows the same read-or-default sequence as
//! `config::Storage`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::key::DecodedKey;

/// A learned key as persisted by collaborators, read back here only to
/// serve key-match lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedKey {
    pub code: u64,
    pub name: String,
    pub enabled: bool,
    pub protocol: String,
    pub bit_string: String,
    pub bit_length: usize,
    pub te_us: f64,
    pub frequency_mhz: f32,
    pub modulation: String,
    pub raw_data: Option<String>,
    pub rssi: i32,
    pub timestamp: DateTime<Utc>,
}

const FREQUENCY_TOLERANCE_MHZ: f32 = 1.0;
const BIT_STRING_SIMILARITY_MIN: f64 = 0.95;
const TE_RATIO_MIN: f64 = 1.0 / 1.3;
const TE_RATIO_MAX: f64 = 1.3;

fn bit_string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let n = a.len().min(b.len());
    let matches = a.bytes().zip(b.bytes()).take(n).filter(|(x, y)| x == y).count();
    matches as f64 / a.len().max(b.len()) as f64
}

/// True iff `decoded` matches `stored` under the §6 key-match algorithm.
pub fn matches(decoded: &DecodedKey, stored: &PersistedKey) -> bool {
    if decoded.protocol != stored.protocol {
        return false;
    }
    if (decoded.frequency_mhz - stored.frequency_mhz).abs() > FREQUENCY_TOLERANCE_MHZ {
        return false;
    }

    let both_have_bit_strings = !decoded.bit_string.is_empty() && !stored.bit_string.is_empty();
    if both_have_bit_strings {
        let bit_length = decoded.bit_length.max(stored.bit_length);
        if bit_length <= 32 {
            decoded.bit_string == stored.bit_string
        } else {
            bit_string_similarity(&decoded.bit_string, &stored.bit_string) >= BIT_STRING_SIMILARITY_MIN
        }
    } else {
        if decoded.code != stored.code {
            return false;
        }
        let ratio = decoded.te_us / stored.te_us.max(1.0);
        (TE_RATIO_MIN..=TE_RATIO_MAX).contains(&ratio)
    }
}

/// Loaded trusted-key list, consulted read-only by the pipeline's `on_key`
/// handler. Collaborators own writes to the backing file; this type only
/// reloads and answers lookups.
pub struct KeyStore {
    path: PathBuf,
    keys: Vec<PersistedKey>,
}

impl KeyStore {
    /// Load from `path`, or start empty if the file doesn't exist yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let keys = if path.exists() {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("failed to read keystore at {:?}", path))?;
            serde_json::from_str(&data)
                .with_context(|| format!("failed to parse keystore at {:?}", path))?
        } else {
            tracing::info!("no keystore found at {:?}, starting empty", path);
            Vec::new()
        };
        Ok(Self { path, keys })
    }

    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.keys)
            .context("failed to serialize keystore")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create keystore directory {:?}", parent))?;
        }
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write keystore at {:?}", self.path))?;
        Ok(())
    }

    pub fn reload(&mut self) -> Result<()> {
        *self = Self::load(self.path.clone())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> &[PersistedKey] {
        &self.keys
    }

    pub fn add(&mut self, key: PersistedKey) {
        self.keys.push(key);
    }

    /// Returns the first enabled stored key matching `decoded`, per §6.
    pub fn find_match(&self, decoded: &DecodedKey) -> Option<&PersistedKey> {
        self.keys.iter().filter(|k| k.enabled).find(|k| matches(decoded, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(protocol: &str, code: u64, bit_string: &str, freq: f32, te: f64) -> PersistedKey {
        PersistedKey {
            code,
            name: "Gate".into(),
            enabled: true,
            protocol: protocol.into(),
            bit_string: bit_string.into(),
            bit_length: bit_string.len(),
            te_us: te,
            frequency_mhz: freq,
            modulation: "OOK".into(),
            raw_data: None,
            rssi: -60,
            timestamp: Utc::now(),
        }
    }

    fn decoded(protocol: &str, code: u64, bit_string: &str, freq: f32, te: f64) -> DecodedKey {
        DecodedKey {
            protocol: protocol.into(),
            code,
            bit_string: bit_string.into(),
            bit_length: bit_string.len(),
            te_us: te,
            rssi_dbm: -60,
            frequency_mhz: freq,
            modulation: "OOK".into(),
            raw_hash: 0,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn short_bit_strings_require_exact_equality() {
        let a = decoded("CAME", 1, "101010101010101010101010", 433.92, 320.0);
        let b = stored("CAME", 1, "101010101010101010101010", 433.92, 320.0);
        assert!(matches(&a, &b));

        let c = decoded("CAME", 1, "101010101010101010101011", 433.92, 320.0);
        assert!(!matches(&c, &b));
    }

    #[test]
    fn frequency_outside_tolerance_does_not_match() {
        let a = decoded("CAME", 1, "101010101010101010101010", 435.5, 320.0);
        let b = stored("CAME", 1, "101010101010101010101010", 433.92, 320.0);
        assert!(!matches(&a, &b));
    }

    #[test]
    fn fallback_to_code_requires_te_ratio_within_bounds() {
        let a = decoded("Kia", 12345, "", 433.92, 250.0);
        let b = stored("Kia", 12345, "", 433.92, 400.0);
        // ratio 250/400 = 0.625 < 1/1.3 (~0.77), outside bounds
        assert!(!matches(&a, &b));
    }
}
