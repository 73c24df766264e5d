//! Optional load-time overrides for catalog `te_window` bounds, §10.1.
//!
//! The compiled `CATALOG` is the default and the one exercised by tests;
//! this module lets an operator narrow/widen a protocol's TE search window
//! without rebuilding, by naming it in a small TOML file. Unknown fields
//! and unknown protocol names are ignored rather than rejected outright --
//! an operator's override file can lag the catalog without breaking startup.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::catalog::{ProtocolSpec, CATALOG};

#[derive(Debug, Default, Deserialize)]
struct OverrideFile {
    #[serde(default)]
    protocol: Vec<ProtocolOverride>,
}

#[derive(Debug, Deserialize)]
struct ProtocolOverride {
    name: String,
    te_window_min_us: Option<u32>,
    te_window_max_us: Option<u32>,
}

/// Load a TOML overrides file and apply it to a copy of the compiled
/// catalog, returning an owned, effective catalog with the same ordering.
/// Only `te_window` can be overridden; every other field, and priority
/// order, come from the compiled table unchanged.
pub fn load_effective_catalog(path: &Path) -> Result<Vec<ProtocolSpec>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog overrides at {:?}", path))?;
    let parsed: OverrideFile = toml::from_str(&text)
        .with_context(|| format!("failed to parse catalog overrides at {:?}", path))?;

    let mut by_name: HashMap<&str, &ProtocolOverride> = HashMap::new();
    for o in &parsed.protocol {
        by_name.insert(o.name.as_str(), o);
    }

    Ok(CATALOG
        .iter()
        .map(|spec| {
            let mut spec = *spec;
            if let Some(o) = by_name.get(spec.name) {
                if let (Some(min), Some(max)) = (o.te_window_min_us, o.te_window_max_us) {
                    spec.te_window = (min, max);
                }
            }
            spec
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_an_error_not_a_default() {
        assert!(load_effective_catalog(Path::new("/nonexistent/overrides.toml")).is_err());
    }

    #[test]
    fn narrows_te_window_for_named_protocol_only() {
        let mut f = tempfile_with(
            r#"
            [[protocol]]
            name = "CAME"
            te_window_min_us = 280
            te_window_max_us = 360
            "#,
        );
        let effective = load_effective_catalog(f.path_ref()).unwrap();
        let came = effective.iter().find(|p| p.name == "CAME" && p.bit_count == 24).unwrap();
        assert_eq!(came.te_window, (280, 360));

        let princeton = effective.iter().find(|p| p.name == "Princeton").unwrap();
        let compiled_princeton = CATALOG.iter().find(|p| p.name == "Princeton").unwrap();
        assert_eq!(princeton.te_window, compiled_princeton.te_window);
        f.cleanup();
    }

    struct TempToml {
        path: std::path::PathBuf,
    }

    impl TempToml {
        fn path_ref(&self) -> &Path {
            &self.path
        }
        fn cleanup(self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn tempfile_with(contents: &str) -> TempToml {
        let path = std::env::temp_dir().join(format!(
            "rfkey-decoder-overrides-test-{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        TempToml { path }
    }
}
