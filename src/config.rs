//! Configuration and config-directory resolution, §10.3.
//!
//! Mirrors the adjacent project's own `storage.rs`: an INI file under
//! `~/.config/<crate>/`, loaded with fallback-to-default on any missing or
//! unparsable field, with a commented template written on first run.

use anyhow::{Context, Result};
use configparser::ini::Ini;
use std::fs;
use std::path::PathBuf;

/// Decoder configuration loaded from `~/.config/rfkey-decoder/config.ini`.
#[derive(Debug, Clone)]
pub struct Config {
    // [general]
    /// Path the trusted-key store is persisted to.
    pub keystore_path: PathBuf,
    /// Optional TOML file overriding `te_window`/tolerance for catalog entries.
    pub catalog_overrides_path: Option<PathBuf>,

    // [radio]
    /// Default receive frequency in MHz.
    pub default_frequency_mhz: f32,
    /// RSSI noise floor, dBm; frames below this are dropped at emission.
    pub rssi_noise_floor_dbm: i32,

    // [decode]
    /// When true, RAW/Unknown frames that don't match any catalog entry are
    /// still surfaced to the key sink instead of being dropped entirely.
    pub research_mode: bool,
}

impl Config {
    fn default_for(config_dir: &PathBuf) -> Self {
        Self {
            keystore_path: config_dir.join("keys.json"),
            catalog_overrides_path: None,
            default_frequency_mhz: 433.92,
            rssi_noise_floor_dbm: -100,
            research_mode: true,
        }
    }

    fn load_from_ini(path: &std::path::Path, config_dir: &PathBuf) -> Result<Self> {
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

        let defaults = Config::default_for(config_dir);

        let keystore_path = ini
            .get("general", "keystore_path")
            .map(|s| expand_tilde(&s))
            .unwrap_or(defaults.keystore_path);

        let catalog_overrides_path = ini
            .get("general", "catalog_overrides_path")
            .map(|s| expand_tilde(&s));

        let default_frequency_mhz = ini
            .getfloat("radio", "default_frequency_mhz")
            .ok()
            .flatten()
            .map(|v| v as f32)
            .unwrap_or(defaults.default_frequency_mhz);

        let rssi_noise_floor_dbm = ini
            .getint("radio", "rssi_noise_floor_dbm")
            .ok()
            .flatten()
            .map(|v| v as i32)
            .unwrap_or(defaults.rssi_noise_floor_dbm);

        let research_mode = ini
            .getbool("decode", "research_mode")
            .ok()
            .flatten()
            .unwrap_or(defaults.research_mode);

        Ok(Self {
            keystore_path,
            catalog_overrides_path,
            default_frequency_mhz,
            rssi_noise_floor_dbm,
            research_mode,
        })
    }

    fn save_to_ini(&self, path: &std::path::Path) -> Result<()> {
        let content = format!(
            r#"; rfkey-decoder configuration
; Location: {path}
;
; Edit this file to change default settings.
; Lines starting with ; or # are comments.

[general]
; Where decoded, trusted keys are persisted between runs.
keystore_path = {keystore}

[radio]
; Default receive frequency in MHz. Common keyfob frequencies: 315.0, 433.92, 868.35
default_frequency_mhz = {freq}

; RSSI noise floor in dBm; frames at or below this are dropped at emission.
rssi_noise_floor_dbm = {floor}

[decode]
; When true, frames that match no catalog protocol still surface as
; RAW/Unknown instead of being silently dropped.
research_mode = {research}
"#,
            path = path.display(),
            keystore = self.keystore_path.to_string_lossy(),
            freq = self.default_frequency_mhz,
            floor = self.rssi_noise_floor_dbm,
            research = self.research_mode,
        );

        fs::write(path, content)
            .with_context(|| format!("failed to write config to {:?}", path))?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let fallback = resolve_config_dir().unwrap_or_else(|| PathBuf::from(".").join("rfkey-decoder"));
        Config::default_for(&fallback)
    }
}

fn expand_tilde(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}

/// Resolve the config directory to `~/.config/rfkey-decoder/` regardless of OS.
pub fn resolve_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("rfkey-decoder"))
}

/// Owns the resolved config directory and the loaded `Config`, ensuring the
/// directory tree exists and a default `config.ini` is written on first run.
pub struct Storage {
    config_dir: PathBuf,
    pub config: Config,
}

impl Storage {
    pub fn new() -> Result<Self> {
        let config_dir =
            resolve_config_dir().context("could not determine home directory (is $HOME set?)")?;
        let config_path = config_dir.join("config.ini");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("failed to create config dir: {:?}", config_dir))?;
            tracing::info!("created config directory: {:?}", config_dir);
        }

        let config = if config_path.exists() {
            tracing::info!("loading config from {:?}", config_path);
            match Config::load_from_ini(&config_path, &config_dir) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("failed to parse config.ini, using defaults: {}", e);
                    Config::default_for(&config_dir)
                }
            }
        } else {
            tracing::info!("no config.ini found, creating default at {:?}", config_path);
            let config = Config::default_for(&config_dir);
            if let Err(e) = config.save_to_ini(&config_path) {
                tracing::warn!("could not write default config.ini: {}", e);
            }
            config
        };

        Ok(Self { config_dir, config })
    }

    pub fn save_config(&self) -> Result<()> {
        let config_path = self.config_dir.join("config.ini");
        self.config.save_to_ini(&config_path)?;
        tracing::info!("saved config to {:?}", config_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_radio_bounds() {
        let config_dir = PathBuf::from("/tmp/rfkey-decoder-test");
        let cfg = Config::default_for(&config_dir);
        assert!((300.0..=928.0).contains(&cfg.default_frequency_mhz));
        assert_eq!(cfg.rssi_noise_floor_dbm, -100);
    }

    #[test]
    fn expand_tilde_resolves_home_prefix() {
        if dirs::home_dir().is_some() {
            let p = expand_tilde("~/keys.json");
            assert!(p.is_absolute() || p.to_string_lossy().contains("keys.json"));
        }
    }
}
