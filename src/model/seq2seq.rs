//! Encoder-decoder bundle and its on-disk format

use super::config::Seq2SeqConfig;
use super::decoder::LstmDecoder;
use super::encoder::LstmEncoder;
use super::layers::SoftmaxLayer;
use super::lstm::LstmCell;
use crate::error::{Error, Result};
use crate::preprocessing::{PadPolicy, Vocabulary};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Latent width, both alphabets and all weights, persisted as one unit.
///
/// Alphabets and weights must never be reloaded separately: an alphabet
/// rebuilt from different data silently corrupts the index → char mapping
/// of a trained decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seq2SeqModel {
    pub config: Seq2SeqConfig,
    vocab: Vocabulary,
    encoder: LstmEncoder,
    decoder: LstmDecoder,
}

impl Seq2SeqModel {
    /// Freshly initialised model sized for `vocab`
    pub fn new(vocab: Vocabulary, latent_dim: usize, seed: u64) -> Result<Self> {
        let config = Seq2SeqConfig::new(vocab.source().len(), vocab.target().len(), latent_dim).with_seed(seed);
        Self::from_config(vocab, config)
    }

    pub fn from_config(vocab: Vocabulary, config: Seq2SeqConfig) -> Result<Self> {
        if config.latent_dim == 0 {
            return Err(Error::InvalidParameter("latent_dim must be > 0".to_string()));
        }
        if config.source_size != vocab.source().len() || config.target_size != vocab.target().len() {
            return Err(Error::shape(
                format!("alphabets {}/{}", vocab.source().len(), vocab.target().len()),
                format!("config sizes {}/{}", config.source_size, config.target_size),
            ));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let encoder = LstmEncoder::new(LstmCell::new(
            config.source_size,
            config.latent_dim,
            config.input_scaling,
            config.forget_bias,
            &mut rng,
        ));
        let decoder = LstmDecoder::new(
            LstmCell::new(
                config.target_size,
                config.latent_dim,
                config.input_scaling,
                config.forget_bias,
                &mut rng,
            ),
            SoftmaxLayer::new(config.latent_dim, config.target_size, &mut rng),
        )?;

        Ok(Self {
            config,
            vocab,
            encoder,
            decoder,
        })
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn encoder(&self) -> &LstmEncoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &LstmDecoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut LstmDecoder {
        &mut self.decoder
    }

    /// Checks that weights and alphabets agree after loading
    pub fn validate(&self) -> Result<()> {
        self.vocab.validate()?;
        let checks = [
            ("encoder input", self.encoder.input_size(), self.vocab.source().len()),
            ("decoder input", self.decoder.target_size(), self.vocab.target().len()),
            ("decoder output", self.decoder.readout().output_size(), self.vocab.target().len()),
            ("encoder latent", self.encoder.latent_dim(), self.config.latent_dim),
            ("decoder latent", self.decoder.latent_dim(), self.config.latent_dim),
        ];
        for (what, actual, expected) in checks {
            if actual != expected {
                return Err(Error::shape(format!("{} {}", what, expected), format!("{} {}", what, actual)));
            }
        }
        Ok(())
    }

    /// Writes the model atomically: a temp file in the target directory is
    /// renamed over `path` only after it has been fully written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            bincode::serialize_into(&mut writer, self)?;
            writer.flush()?;
        }
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let model: Self = bincode::deserialize_from(reader)?;
        model.validate()?;
        info!("Model loaded from {}", path.display());
        Ok(model)
    }

    /// Human-readable description of the model
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            latent_dim: self.config.latent_dim,
            source_alphabet: self.vocab.source().to_string(),
            target_alphabet: self.vocab.target().to_string(),
            source_size: self.vocab.source().len(),
            target_size: self.vocab.target().len(),
            max_source_len: self.vocab.max_source_len,
            max_target_len: self.vocab.max_target_len,
            pad_policy: self.vocab.pad_policy,
        }
    }
}

/// Dimensions and alphabets of a model, for display
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub latent_dim: usize,
    pub source_size: usize,
    pub target_size: usize,
    pub max_source_len: usize,
    pub max_target_len: usize,
    pub pad_policy: PadPolicy,
    pub source_alphabet: String,
    pub target_alphabet: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Corpus, SentencePair};

    fn vocab() -> Vocabulary {
        let corpus = Corpus::new(vec![
            SentencePair::new("Go.", "Va !"),
            SentencePair::new("Hi.", "Salut !"),
        ])
        .unwrap();
        Vocabulary::build(&corpus, PadPolicy::Dedicated).unwrap()
    }

    #[test]
    fn test_new_model_is_valid() {
        let model = Seq2SeqModel::new(vocab(), 16, 1).unwrap();
        assert!(model.validate().is_ok());
        assert_eq!(model.summary().latent_dim, 16);
    }

    #[test]
    fn test_zero_latent_rejected() {
        assert!(Seq2SeqModel::new(vocab(), 0, 1).is_err());
    }

    #[test]
    fn test_mismatched_config_rejected() {
        let v = vocab();
        let config = Seq2SeqConfig::new(v.source().len() + 1, v.target().len(), 8);
        assert!(matches!(
            Seq2SeqModel::from_config(v, config),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_save_load_keeps_alphabets_and_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("model.bin");
        let model = Seq2SeqModel::new(vocab(), 8, 3).unwrap();

        model.save(&path).unwrap();
        let loaded = Seq2SeqModel::load(&path).unwrap();

        assert_eq!(loaded.vocab(), model.vocab());
        assert_eq!(loaded.config, model.config);
        assert_eq!(loaded.decoder().readout().weights, model.decoder().readout().weights);
    }
}
