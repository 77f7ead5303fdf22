//! Configuration management
//!
//! One file configures corpus loading, model size, training and inference.

use crate::error::{Error, Result};
use crate::inference::UnknownCharPolicy;
use crate::preprocessing::PadPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Corpus location and size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Tab-separated parallel corpus
    pub corpus_path: String,
    /// Read at most this many pairs
    pub num_samples: Option<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            corpus_path: "data/fra.txt".to_string(),
            num_samples: Some(10_000),
        }
    }
}

/// Model dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Recurrent state width
    pub latent_dim: usize,
    pub pad_policy: PadPolicy,
    /// Weight initialisation and shuffling seed
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            latent_dim: 256,
            pad_policy: PadPolicy::Dedicated,
            seed: 42,
        }
    }
}

/// Readout training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Fraction of pairs held out for validation
    pub validation_split: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 64,
            learning_rate: 0.5,
            validation_split: 0.2,
        }
    }
}

/// Translation-time behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Replace unknown source characters with this one instead of failing
    pub substitute_unknown: Option<char>,
    /// Override the decoding length bound
    pub max_output_len: Option<usize>,
}

impl InferenceConfig {
    pub fn unknown_policy(&self) -> UnknownCharPolicy {
        match self.substitute_unknown {
            Some(c) => UnknownCharPolicy::Substitute(c),
            None => UnknownCharPolicy::Reject,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads TOML or JSON depending on the extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = if is_json(path) {
            Self::from_json(path)?
        } else {
            Self::from_toml(path)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.data.num_samples == Some(0) {
            return Err(Error::Config("num_samples must be > 0".to_string()));
        }
        if self.model.latent_dim == 0 {
            return Err(Error::Config("latent_dim must be > 0".to_string()));
        }
        if self.training.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".to_string()));
        }
        if !(self.training.learning_rate > 0.0) {
            return Err(Error::Config("learning_rate must be > 0".to_string()));
        }
        if !(0.0..1.0).contains(&self.training.validation_split) {
            return Err(Error::Config("validation_split must be in [0, 1)".to_string()));
        }
        if self.inference.max_output_len == Some(0) {
            return Err(Error::Config("max_output_len must be > 0".to_string()));
        }
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Loads the configuration at `path`, writing the defaults there first if
/// the file does not exist
pub fn ensure_config_exists<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if path.exists() {
        return Config::load(path);
    }

    let config = Config::default();
    if is_json(path) {
        config.save_json(path)?;
    } else {
        config.save_toml(path)?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.model.latent_dim, 256);
        assert_eq!(config.training.batch_size, 64);
        assert_eq!(config.data.num_samples, Some(10_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [model]
            latent_dim = 32
            pad_policy = "space"

            [inference]
            substitute_unknown = "?"
            "#,
        )
        .unwrap();

        assert_eq!(config.model.latent_dim, 32);
        assert_eq!(config.model.pad_policy, PadPolicy::Space);
        assert_eq!(config.training.epochs, 100);
        assert_eq!(config.inference.unknown_policy(), UnknownCharPolicy::Substitute('?'));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.training.validation_split = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.latent_dim = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ensure_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["seq2seq.toml", "seq2seq.json"] {
            let path = dir.path().join(name);
            let written = ensure_config_exists(&path).unwrap();
            assert!(path.exists());
            let loaded = ensure_config_exists(&path).unwrap();
            assert_eq!(written, loaded);
        }
    }
}
