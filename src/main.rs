//! CLI for training and running the character-level translator
//!
//! Usage:
//! ```bash
//! cargo run -- --help
//! cargo run -- train --corpus data/fra.txt --output models/fra.bin
//! cargo run -- translate --model models/fra.bin --text "Go."
//! cargo run -- evaluate --model models/fra.bin --corpus data/fra.txt --limit 20
//! ```

use anyhow::{Context, Result};
use char_seq2seq::{
    config::{ensure_config_exists, Config, InferenceConfig},
    data::Corpus,
    inference::TranslationSession,
    model::Seq2SeqModel,
    preprocessing::Vocabulary,
    training::Trainer,
    utils::{character_error_rate, exact_match},
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "char_seq2seq")]
#[command(author = "ML for Trading")]
#[command(version)]
#[command(about = "Character-level LSTM encoder-decoder translation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level: error, warn, info, debug
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build alphabets from a corpus, train the readout and save the model
    Train {
        /// Tab-separated parallel corpus (defaults to the config's corpus_path)
        #[arg(short, long)]
        corpus: Option<PathBuf>,

        /// Where to write the model
        #[arg(short, long, default_value = "models/seq2seq.bin")]
        output: PathBuf,

        /// TOML or JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the number of epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Override the number of sentence pairs read
        #[arg(short, long)]
        num_samples: Option<usize>,
    },

    /// Translate one sentence
    Translate {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Source sentence
        #[arg(short, long)]
        text: String,

        /// Replace characters missing from the source alphabet with this one
        #[arg(short, long)]
        substitute: Option<char>,

        /// Configuration whose [inference] section applies
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Decode the first pairs of a corpus and compare with the references
    Evaluate {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Tab-separated parallel corpus
        #[arg(short, long)]
        corpus: PathBuf,

        /// Number of pairs to decode
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Configuration whose [inference] section applies
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show model dimensions and alphabets
    Inspect {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination (.toml or .json)
        #[arg(short, long, default_value = "seq2seq.toml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.as_str() {
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train {
            corpus,
            output,
            config,
            epochs,
            num_samples,
        } => run_train(corpus, &output, config, epochs, num_samples),
        Commands::Translate {
            model,
            text,
            substitute,
            config,
        } => run_translate(&model, &text, substitute, config),
        Commands::Evaluate {
            model,
            corpus,
            limit,
            config,
        } => run_evaluate(&model, &corpus, limit, config),
        Commands::Inspect { model } => run_inspect(&model),
        Commands::InitConfig { path } => {
            ensure_config_exists(&path)?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}

fn run_train(
    corpus: Option<PathBuf>,
    output: &Path,
    config_path: Option<PathBuf>,
    epochs: Option<usize>,
    num_samples: Option<usize>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => Config::load(&path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(e) = epochs {
        config.training.epochs = e;
    }
    if num_samples.is_some() {
        config.data.num_samples = num_samples;
    }
    config.validate()?;

    let corpus_path = corpus.unwrap_or_else(|| PathBuf::from(&config.data.corpus_path));
    let corpus = Corpus::load(&corpus_path, config.data.num_samples)
        .with_context(|| format!("reading corpus {}", corpus_path.display()))?;

    let vocab = Vocabulary::build(&corpus, config.model.pad_policy)?;
    let mut model = Seq2SeqModel::new(vocab, config.model.latent_dim, config.model.seed)?;

    let (train, val) = corpus.split(config.training.validation_split);
    let report = Trainer::new(config.training.clone())
        .with_seed(config.model.seed)
        .with_progress(true)
        .fit(&mut model, train, val)?;

    if let Some(last) = report.last() {
        println!("\n=== Training complete ===");
        println!("Epochs:          {}", last.epoch);
        println!("Train loss:      {:.4}", last.train_loss);
        println!("Train accuracy:  {:.2}%", last.train_accuracy * 100.0);
        if let (Some(l), Some(a)) = (last.val_loss, last.val_accuracy) {
            println!("Val loss:        {:.4}", l);
            println!("Val accuracy:    {:.2}%", a * 100.0);
        }
    }

    model.save(output)?;
    println!("Model saved to {}", output.display());
    Ok(())
}

fn load_inference_config(path: Option<PathBuf>) -> Result<InferenceConfig> {
    match path {
        Some(path) => {
            let config = Config::load(&path).with_context(|| format!("loading {}", path.display()))?;
            Ok(config.inference)
        }
        None => Ok(InferenceConfig::default()),
    }
}

fn load_session(path: &Path, inference: &InferenceConfig) -> Result<TranslationSession> {
    let model = Seq2SeqModel::load(path).with_context(|| format!("loading model {}", path.display()))?;
    let mut session = TranslationSession::new(Arc::new(model)).with_unknown_policy(inference.unknown_policy())?;
    if let Some(max) = inference.max_output_len {
        session = session.with_max_output_len(max);
    }
    Ok(session)
}

fn run_translate(model: &Path, text: &str, substitute: Option<char>, config: Option<PathBuf>) -> Result<()> {
    let mut inference = load_inference_config(config)?;
    if substitute.is_some() {
        inference.substitute_unknown = substitute;
    }
    let session = load_session(model, &inference)?;

    let translation = session.translate(text)?;
    println!("Input:   {}", text);
    println!("Output:  {}", translation.text);
    if !translation.is_complete() {
        println!("(decoding hit the length bound before END; output may be truncated)");
    }
    Ok(())
}

fn run_evaluate(model: &Path, corpus: &Path, limit: usize, config: Option<PathBuf>) -> Result<()> {
    let session = load_session(model, &load_inference_config(config)?)?;
    let corpus = Corpus::load(corpus, Some(limit))?;

    let sources: Vec<&str> = corpus.sources().collect();
    let references: Vec<&str> = corpus.targets().collect();
    let results = session.translate_batch(&sources);

    println!("{:<30} {:<30} {:<30}", "Input", "Reference", "Decoded");
    println!("{}", "-".repeat(92));

    let mut hypotheses = Vec::with_capacity(results.len());
    let mut cer_sum = 0.0;
    let mut incomplete = 0;
    for ((source, reference), result) in sources.iter().zip(&references).zip(results) {
        match result {
            Ok(t) => {
                println!("{:<30} {:<30} {:<30}", source, reference, t.text);
                cer_sum += character_error_rate(reference, &t.text);
                if !t.is_complete() {
                    incomplete += 1;
                }
                hypotheses.push(t.text);
            }
            Err(e) if e.is_per_sequence() => {
                warn!("Failed to translate {:?}: {}", source, e);
                cer_sum += 1.0;
                hypotheses.push(String::new());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let n = hypotheses.len().max(1) as f64;
    println!();
    println!("Exact match:          {:.2}%", exact_match(&references, &hypotheses) * 100.0);
    println!("Character error rate: {:.4}", cer_sum / n);
    println!("Hit length bound:     {}", incomplete);
    info!("Evaluated {} pairs", hypotheses.len());
    Ok(())
}

fn run_inspect(model: &Path) -> Result<()> {
    let model = Seq2SeqModel::load(model)?;
    let summary = model.summary();

    println!("=== Model ===");
    println!("Latent dim:       {}", summary.latent_dim);
    println!("Pad policy:       {:?}", summary.pad_policy);
    println!("Source alphabet:  {} chars, max length {}", summary.source_size, summary.max_source_len);
    println!("  {}", summary.source_alphabet);
    println!("Target alphabet:  {} chars, max length {}", summary.target_size, summary.max_target_len);
    println!("  {}", summary.target_alphabet);
    Ok(())
}
