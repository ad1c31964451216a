//! Reads battle inputs from disk.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use skirmish_core::{BattleConfig, Scenario, UnitCatalog};
use thiserror::Error;

/// Failures while turning an input file into battle contracts.
#[derive(Debug, Error)]
pub(crate) enum LoadError {
    /// The file could not be read.
    #[error("could not read {}", path.display())]
    Read {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file is not valid JSON for the expected contract.
    #[error("could not parse {} as JSON", path.display())]
    Json {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// The file is not a valid TOML battle configuration.
    #[error("could not parse {} as TOML", path.display())]
    Toml {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: toml::de::Error,
    },
}

pub(crate) fn load_scenario(path: &Path) -> Result<Scenario, LoadError> {
    load_json(path)
}

pub(crate) fn load_units(path: &Path) -> Result<UnitCatalog, LoadError> {
    load_json(path)
}

/// Reads the configuration file, or the defaults when none is given.
pub(crate) fn load_config(path: Option<&Path>) -> Result<BattleConfig, LoadError> {
    let Some(path) = path else {
        return Ok(BattleConfig::default());
    };
    let text = read(path)?;
    toml::from_str(&text).map_err(|source| LoadError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let text = read(path)?;
    serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../scenarios")
            .join(name)
    }

    #[test]
    fn sample_inputs_load() {
        let scenario = load_scenario(&sample("crossing.json")).expect("scenario loads");
        let units = load_units(&sample("units.json")).expect("units load");
        assert_eq!(scenario.terrain.width(), 12);
        assert_eq!(scenario.attack_plans.len(), 1);
        assert!(units.get("footman").is_some());
        assert_eq!(units.len(), 8);
    }

    #[test]
    fn config_overrides_only_named_keys() {
        let config = load_config(Some(&sample("battle.toml"))).expect("config loads");
        let defaults = BattleConfig::default();
        assert_eq!(config.time_cap_secs, 120);
        assert_eq!(config.chain_radius, 4.0);
        assert_eq!(config.chain_decay, defaults.chain_decay);
        assert_eq!(load_config(None).expect("defaults"), defaults);
    }

    #[test]
    fn missing_file_names_the_path() {
        let error = load_units(Path::new("does/not/exist.json")).expect_err("missing");
        assert!(matches!(error, LoadError::Read { .. }));
        assert!(error.to_string().contains("does/not/exist.json"));
    }

    #[test]
    fn malformed_json_is_reported_as_such() {
        let error = load_scenario(&sample("battle.toml")).expect_err("not json");
        assert!(matches!(error, LoadError::Json { .. }));
    }
}
