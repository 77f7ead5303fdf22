//! End-to-end tests: corpus parsing through training, persistence and translation

use char_seq2seq::config::TrainingConfig;
use char_seq2seq::data::Corpus;
use char_seq2seq::inference::{DecodeStatus, GreedyDecoder, ModelSnapshot, Termination};
use char_seq2seq::model::{DecoderStep, RecurrentState, Seq2SeqModel};
use char_seq2seq::preprocessing::{
    teacher_forcing, PadPolicy, Role, TensorEncoder, Vocabulary, END_MARKER, START_MARKER,
};
use char_seq2seq::{Error, Result, TranslationSession, UnknownCharPolicy};
use ndarray::{Array1, ArrayView1, Axis};
use std::sync::Arc;

const CORPUS: &str = "Go.\tGeh.\n\
Hi.\tHallo!\n\
Run!\tLauf!\n\
Wow!\tDonnerwetter!\n\
Fire!\tFeuer!\n\
Help!\tHilfe!\n";

fn corpus() -> Corpus {
    Corpus::parse_str(CORPUS, None).unwrap()
}

fn trained_model(pad_policy: PadPolicy) -> Seq2SeqModel {
    let corpus = corpus();
    let vocab = Vocabulary::build(&corpus, pad_policy).unwrap();
    let mut model = Seq2SeqModel::new(vocab, 32, 11).unwrap();
    let config = TrainingConfig {
        epochs: 20,
        batch_size: 8,
        learning_rate: 0.5,
        validation_split: 0.0,
    };
    char_seq2seq::Trainer::new(config)
        .fit(&mut model, corpus.pairs(), &[])
        .unwrap();
    model
}

/// Hot index of a one-hot row
fn hot(row: ArrayView1<f64>) -> usize {
    row.iter().position(|&v| v == 1.0).unwrap()
}

#[test]
fn test_alphabet_round_trip() {
    let vocab = Vocabulary::build(&corpus(), PadPolicy::Dedicated).unwrap();
    for role in [Role::Source, Role::Target] {
        let alphabet = vocab.alphabet(role);
        for &c in alphabet.chars() {
            let index = alphabet.index_of(c).unwrap();
            assert_eq!(alphabet.char_at(index), Some(c));
        }
    }
}

#[test]
fn test_every_row_is_one_hot() {
    let corpus = corpus();
    let vocab = Vocabulary::build(&corpus, PadPolicy::Dedicated).unwrap();
    let tensors = teacher_forcing(&vocab, corpus.pairs()).unwrap();

    for tensor in [&tensors.encoder_input, &tensors.decoder_input, &tensors.decoder_target] {
        for sample in tensor.axis_iter(Axis(0)) {
            for row in sample.axis_iter(Axis(0)) {
                assert!((row.sum() - 1.0).abs() < 1e-12);
            }
        }
    }
}

#[test]
fn test_short_sequence_is_padded() {
    let vocab = Vocabulary::build(&corpus(), PadPolicy::Dedicated).unwrap();
    let pad = vocab.pad_index(Role::Source);
    let encoder = TensorEncoder::new(vocab.source(), 5, pad).unwrap();

    let encoded = encoder.encode_one("Hi.").unwrap();
    let indices: Vec<usize> = encoded.axis_iter(Axis(0)).map(hot).collect();

    let source = vocab.source();
    assert_eq!(
        indices,
        vec![
            source.index_of('H').unwrap(),
            source.index_of('i').unwrap(),
            source.index_of('.').unwrap(),
            pad,
            pad,
        ]
    );
}

#[test]
fn test_decoder_target_is_shifted_input() {
    let corpus = corpus();
    let vocab = Vocabulary::build(&corpus, PadPolicy::Dedicated).unwrap();
    let tensors = teacher_forcing(&vocab, &corpus.pairs()[..1]).unwrap();
    let target = vocab.target();

    let input = tensors.decoder_input.index_axis(Axis(0), 0);
    let shifted = tensors.decoder_target.index_axis(Axis(0), 0);

    assert_eq!(hot(input.row(0)), target.index_of(START_MARKER).unwrap());
    assert_eq!(hot(shifted.row(0)), target.index_of('G').unwrap());
    for t in 0..vocab.max_target_len - 1 {
        assert_eq!(shifted.row(t), input.row(t + 1));
    }
    // "\tGeh.\n" has six characters; the END lands at shifted position 4
    assert_eq!(hot(shifted.row(4)), target.index_of(END_MARKER).unwrap());
    assert_eq!(hot(shifted.row(5)), vocab.pad_index(Role::Target));
}

/// Decoder that always puts all its mass on one index
struct Fixed {
    index: usize,
    width: usize,
}

impl DecoderStep for Fixed {
    fn step(&self, _token: ArrayView1<f64>, state: &RecurrentState) -> Result<(Array1<f64>, RecurrentState)> {
        let mut probs = Array1::zeros(self.width);
        probs[self.index] = 1.0;
        Ok((probs, state.clone()))
    }
}

#[test]
fn test_end_first_stops_immediately() {
    let decoder = Fixed { index: 2, width: 5 };
    let mut session = GreedyDecoder::new(decoder, RecurrentState::zeros(4), 0, 2, 5, 10).unwrap();

    assert_eq!(session.advance().unwrap(), DecodeStatus::Done);
    assert_eq!(session.output(), &[2]);
}

#[test]
fn test_never_ending_decoder_is_bounded() {
    let decoder = Fixed { index: 1, width: 5 };
    let outcome = GreedyDecoder::new(decoder, RecurrentState::zeros(4), 0, 2, 5, 7)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(outcome.tokens.len(), 8);
    assert_eq!(outcome.termination, Termination::LengthBound);
}

#[test]
fn test_translation_is_deterministic() {
    let session = TranslationSession::new(Arc::new(trained_model(PadPolicy::Dedicated)));
    let first = session.translate("Go.").unwrap();
    let second = session.translate("Go.").unwrap();
    assert_eq!(first.text.as_bytes(), second.text.as_bytes());
    assert_eq!(first.termination, second.termination);
}

#[test]
fn test_unknown_character_is_an_error() {
    let vocab = Vocabulary::build(&corpus(), PadPolicy::Dedicated).unwrap();
    let err = TensorEncoder::for_role(&vocab, Role::Source)
        .encode(&["Go?"])
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnknownCharacter {
            character: '?',
            position: 2
        }
    ));
}

#[test]
fn test_substitution_avoids_rejection() {
    let model = Arc::new(trained_model(PadPolicy::Dedicated));
    let strict = TranslationSession::new(Arc::clone(&model));
    assert!(strict.translate("Go?").is_err());

    let lenient = TranslationSession::new(model)
        .with_unknown_policy(UnknownCharPolicy::Substitute('.'))
        .unwrap();
    assert!(lenient.translate("Go?").is_ok());
}

#[test]
fn test_pad_symbol_in_input_is_unknown() {
    let session = TranslationSession::new(Arc::new(trained_model(PadPolicy::Dedicated)));
    assert!(matches!(
        session.translate("Go\0"),
        Err(Error::UnknownCharacter {
            character: '\0',
            position: 2
        })
    ));
}

#[test]
fn test_huge_output_bound_is_safe() {
    let decoder = Fixed { index: 2, width: 5 };
    let outcome = GreedyDecoder::new(decoder, RecurrentState::zeros(4), 0, 2, 5, usize::MAX)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(outcome.tokens, vec![2]);
    assert_eq!(outcome.termination, Termination::EndMarker);
}

#[test]
fn test_save_load_translate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    let model = trained_model(PadPolicy::Space);
    let before = TranslationSession::new(Arc::new(model.clone()))
        .translate_batch(&["Hi.", "Run!"]);
    model.save(&path).unwrap();

    let loaded = Seq2SeqModel::load(&path).unwrap();
    assert_eq!(loaded.vocab().pad_policy, PadPolicy::Space);
    let after = TranslationSession::new(Arc::new(loaded)).translate_batch(&["Hi.", "Run!"]);

    for (b, a) in before.into_iter().zip(after) {
        assert_eq!(b.unwrap(), a.unwrap());
    }
}

#[test]
fn test_output_has_no_markers() {
    let session = TranslationSession::new(Arc::new(trained_model(PadPolicy::Dedicated)));
    for result in session.translate_batch(&["Go.", "Hi.", "Fire!", "Help!"]) {
        let text = result.unwrap().text;
        assert!(!text.contains(START_MARKER));
        assert!(!text.contains(END_MARKER));
    }
}

#[test]
fn test_snapshot_swap_keeps_old_sessions() {
    let snapshot = ModelSnapshot::new(trained_model(PadPolicy::Dedicated));
    let old = snapshot.session();
    let old_output = old.translate("Wow!").unwrap();

    let corpus = corpus();
    let vocab = Vocabulary::build(&corpus, PadPolicy::Dedicated).unwrap();
    snapshot.swap(Seq2SeqModel::new(vocab, 16, 99).unwrap()).unwrap();

    assert_eq!(old.translate("Wow!").unwrap(), old_output);
    assert_eq!(snapshot.current().config.latent_dim, 16);
}
