//! Miner configuration
//!
//! Loaded from a JSON file and overridden from the command line. Validation
//! turns the loose file values into [`EngineSettings`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::algorithm::{has_hardware_aes, Algorithm, BatchProfile, Variant};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `cryptonight` / `cn` or `cryptonight-lite` / `cn-lite`
    pub algo: String,
    /// Engine variant 1..=7, picked from the multiplier when unset
    pub variant: Option<i32>,
    /// Lanes per engine call 1..=5, taken from the variant when unset
    pub multiplier: Option<usize>,
    /// Worker threads, one per logical CPU when unset
    pub threads: Option<usize>,
    /// Seconds between hashrate reports, 0 disables them
    pub print_time: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algo: Algorithm::CryptoNight.name().to_string(),
            variant: None,
            multiplier: None,
            threads: None,
            print_time: 60,
            log_level: "info".to_string(),
        }
    }
}

/// Validated engine and worker settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub algorithm: Algorithm,
    pub variant: i32,
    pub multiplier: usize,
    pub threads: usize,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load `path`, or fall back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(write_err)
    }

    /// Validate against the running CPU
    pub fn settings(&self) -> Result<EngineSettings, ConfigError> {
        self.settings_for(has_hardware_aes())
    }

    /// Validate, choosing automatic variants as if hardware AES were
    /// (or were not) available
    pub fn settings_for(&self, hardware_aes: bool) -> Result<EngineSettings, ConfigError> {
        let algorithm: Algorithm = self.algo.parse()?;

        let threads = self.threads.unwrap_or_else(num_cpus::get);
        if threads == 0 {
            return Err(ConfigError::NoThreads);
        }

        let (variant, multiplier) = match (self.variant, self.multiplier) {
            (None, None) => (auto_variant(1, hardware_aes)?, 1),
            (None, Some(multiplier)) => {
                BatchProfile::for_multiplier(multiplier)?;
                (auto_variant(multiplier, hardware_aes)?, multiplier)
            }
            (Some(variant), None) => (variant, Variant::from_index(variant)?.lanes()),
            (Some(variant), Some(multiplier)) => {
                BatchProfile::for_multiplier(multiplier)?;
                let lanes = Variant::from_index(variant)?.lanes();
                if lanes != multiplier {
                    return Err(ConfigError::LaneMismatch {
                        variant,
                        lanes,
                        multiplier,
                    });
                }
                (variant, multiplier)
            }
        };

        Ok(EngineSettings {
            algorithm,
            variant,
            multiplier,
            threads,
        })
    }
}

/// Variant for a multiplier when none is configured.
///
/// With hardware AES: 1 → 1, 2 → 2, 3 → 5, 5 → 7. Without: 1 → 3, 2 → 4.
pub fn auto_variant(multiplier: usize, hardware_aes: bool) -> Result<i32, ConfigError> {
    let variant = match (hardware_aes, multiplier) {
        (true, 1) => Variant::Single,
        (true, 2) => Variant::Double,
        (true, 3) => Variant::Triple,
        (true, 5) => Variant::Penta,
        (false, 1) => Variant::SoftSingle,
        (false, 2) => Variant::SoftDouble,
        _ => {
            return Err(ConfigError::NoVariant {
                multiplier,
                aes: if hardware_aes { "hardware AES" } else { "software AES" },
            })
        }
    };
    Ok(variant.index())
}

/// Default config file location
#[cfg(feature = "cli")]
pub fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("cnminer").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("cnminer-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_auto_variant_hardware() {
        let picked: Vec<i32> = [1, 2, 3, 5]
            .iter()
            .map(|m| auto_variant(*m, true).unwrap())
            .collect();
        assert_eq!(picked, vec![1, 2, 5, 7]);
        assert!(auto_variant(4, true).is_err());
    }

    #[test]
    fn test_auto_variant_software() {
        assert_eq!(auto_variant(1, false).unwrap(), 3);
        assert_eq!(auto_variant(2, false).unwrap(), 4);
        assert!(matches!(
            auto_variant(3, false),
            Err(ConfigError::NoVariant { multiplier: 3, .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = Config {
            threads: Some(2),
            ..Config::default()
        };
        let settings = config.settings_for(true).unwrap();
        assert_eq!(settings.algorithm, Algorithm::CryptoNight);
        assert_eq!(settings.variant, 1);
        assert_eq!(settings.multiplier, 1);
        assert_eq!(settings.threads, 2);
    }

    #[test]
    fn test_multiplier_from_variant() {
        let config = Config {
            algo: "cn-lite".to_string(),
            variant: Some(7),
            threads: Some(1),
            ..Config::default()
        };
        let settings = config.settings_for(false).unwrap();
        assert_eq!(settings.algorithm, Algorithm::CryptoNightLite);
        assert_eq!(settings.multiplier, 5);
    }

    #[test]
    fn test_lane_mismatch() {
        let config = Config {
            variant: Some(2),
            multiplier: Some(3),
            threads: Some(1),
            ..Config::default()
        };
        assert!(matches!(
            config.settings_for(true),
            Err(ConfigError::LaneMismatch { variant: 2, lanes: 2, multiplier: 3 })
        ));
    }

    #[test]
    fn test_invalid_values() {
        let bad_variant = Config {
            variant: Some(9),
            ..Config::default()
        };
        assert!(matches!(bad_variant.settings_for(true), Err(ConfigError::Engine(_))));

        let bad_algo = Config {
            algo: "scrypt".to_string(),
            ..Config::default()
        };
        assert!(bad_algo.settings_for(true).is_err());

        let no_threads = Config {
            threads: Some(0),
            ..Config::default()
        };
        assert!(matches!(no_threads.settings_for(true), Err(ConfigError::NoThreads)));
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("config.json");
        let config = Config {
            algo: "cryptonight-lite".to_string(),
            variant: Some(2),
            threads: Some(3),
            print_time: 10,
            ..Config::default()
        };

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "algo": "cn", "threads": 4 }"#).unwrap();
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.print_time, 60);
        assert_eq!(config.log_level, "info");
        assert!(config.variant.is_none());
    }

    #[test]
    fn test_missing_file_defaults() {
        let config = Config::load_or_default(&temp_path("missing.json")).unwrap();
        assert_eq!(config, Config::default());
        assert!(matches!(
            Config::load(&temp_path("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
