// Intent Classifier
// Trainable text classifier contract plus a character n-gram naive Bayes model

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::models::{Intent, LabeledExample, Prediction};

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("training failed: {0}")]
    Training(String),
    #[error("prediction failed: {0}")]
    Prediction(String),
    #[error("invalid persisted state: {0}")]
    InvalidState(String),
}

/// Capability the review loop needs from a classifier. Any statistical or
/// rule-based model can be plugged in behind it.
pub trait IntentClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Replace the model with one trained on `examples`.
    fn train(&mut self, examples: &[LabeledExample]) -> Result<(), ClassifierError>;

    fn predict(&self, text: &str) -> Result<Prediction, ClassifierError>;

    /// Opaque state for the model store.
    fn persist(&self) -> Result<serde_json::Value, ClassifierError>;

    fn load(&mut self, state: serde_json::Value) -> Result<(), ClassifierError>;
}

// ============================================================================
// Character n-gram naive Bayes
// ============================================================================

pub const NGRAM_BAYES_NAME: &str = "ngram-bayes";
const MIN_NGRAM: usize = 1;
const MAX_NGRAM: usize = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntentStats {
    documents: u64,
    total_ngrams: u64,
    ngram_counts: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BayesState {
    safe: IntentStats,
    inappropriate: IntentStats,
    vocabulary_size: u64,
}

/// Multinomial naive Bayes over character 1..=3-grams with Laplace smoothing.
///
/// The posterior is pulled toward 0.5 by the share of the text the model has
/// never seen, so confidence never exceeds `0.5 + coverage / 2` and a skewed
/// class prior cannot make unfamiliar text look certain. The model stays
/// silent (confidence 0) until it has seen both intents, and for text sharing
/// no multi-character n-gram with the training set.
#[derive(Debug, Clone, Default)]
pub struct NgramBayesClassifier {
    state: BayesState,
    vocabulary: HashSet<String>,
}

fn char_ngrams(text: &str) -> Vec<String> {
    let padded: Vec<char> = std::iter::once('^')
        .chain(text.chars())
        .chain(std::iter::once('$'))
        .collect();
    let mut grams = Vec::new();
    for n in MIN_NGRAM..=MAX_NGRAM {
        if padded.len() < n {
            break;
        }
        for window in padded.windows(n) {
            grams.push(window.iter().collect());
        }
    }
    grams
}

impl NgramBayesClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_trained(&self) -> bool {
        self.state.safe.documents > 0 && self.state.inappropriate.documents > 0
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn stats(&self, intent: Intent) -> &IntentStats {
        match intent {
            Intent::Safe => &self.state.safe,
            Intent::Inappropriate => &self.state.inappropriate,
        }
    }

    /// Log joint probability over the known n-grams.
    fn log_score(&self, intent: Intent, known: &[&String]) -> f64 {
        let stats = self.stats(intent);
        let all_docs = (self.state.safe.documents + self.state.inappropriate.documents) as f64;
        let prior = (stats.documents as f64 / all_docs).ln();

        let denominator = (stats.total_ngrams + self.state.vocabulary_size) as f64;
        let likelihood: f64 = known
            .iter()
            .map(|g| {
                let count = stats.ngram_counts.get(*g).copied().unwrap_or(0) as f64;
                ((count + 1.0) / denominator).ln()
            })
            .sum();

        prior + likelihood
    }

    /// Share of the text's multi-character n-grams seen in training. Single
    /// characters and the boundary markers occur in nearly every handle, so
    /// they are not counted as evidence.
    fn coverage(&self, grams: &[String]) -> f64 {
        let (seen, total) = grams
            .iter()
            .filter(|g| g.chars().count() >= 2)
            .fold((0usize, 0usize), |(seen, total), g| {
                (seen + usize::from(self.vocabulary.contains(g)), total + 1)
            });
        if total == 0 {
            0.0
        } else {
            seen as f64 / total as f64
        }
    }
}

impl IntentClassifier for NgramBayesClassifier {
    fn name(&self) -> &str {
        NGRAM_BAYES_NAME
    }

    fn train(&mut self, examples: &[LabeledExample]) -> Result<(), ClassifierError> {
        let mut state = BayesState::default();
        let mut vocabulary = HashSet::new();

        for example in examples {
            let stats = match example.intent {
                Intent::Safe => &mut state.safe,
                Intent::Inappropriate => &mut state.inappropriate,
            };
            stats.documents += 1;
            for gram in char_ngrams(&example.text) {
                stats.total_ngrams += 1;
                *stats.ngram_counts.entry(gram.clone()).or_insert(0) += 1;
                vocabulary.insert(gram);
            }
        }

        state.vocabulary_size = vocabulary.len() as u64;
        self.state = state;
        self.vocabulary = vocabulary;
        Ok(())
    }

    fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        if !self.is_trained() {
            return Ok(Prediction::unknown());
        }

        let grams = char_ngrams(text);
        let coverage = self.coverage(&grams);
        if coverage == 0.0 {
            return Ok(Prediction::unknown());
        }

        let known: Vec<&String> = grams.iter().filter(|g| self.vocabulary.contains(*g)).collect();
        let safe = self.log_score(Intent::Safe, &known);
        let inappropriate = self.log_score(Intent::Inappropriate, &known);
        if !safe.is_finite() || !inappropriate.is_finite() {
            return Err(ClassifierError::Prediction(format!(
                "non-finite score for {:?}",
                text
            )));
        }

        // Two-class softmax, shifted for numeric stability.
        let max = safe.max(inappropriate);
        let p_safe = (safe - max).exp();
        let p_inappropriate = (inappropriate - max).exp();
        let p_inappropriate = p_inappropriate / (p_safe + p_inappropriate);
        let p_inappropriate = 0.5 + (p_inappropriate - 0.5) * coverage;

        Ok(if p_inappropriate > 0.5 {
            Prediction {
                intent: Intent::Inappropriate,
                confidence: p_inappropriate,
            }
        } else {
            Prediction {
                intent: Intent::Safe,
                confidence: 1.0 - p_inappropriate,
            }
        })
    }

    fn persist(&self) -> Result<serde_json::Value, ClassifierError> {
        serde_json::to_value(&self.state).map_err(|e| ClassifierError::InvalidState(e.to_string()))
    }

    fn load(&mut self, state: serde_json::Value) -> Result<(), ClassifierError> {
        let state: BayesState =
            serde_json::from_value(state).map_err(|e| ClassifierError::InvalidState(e.to_string()))?;

        let vocabulary: HashSet<String> = state
            .safe
            .ngram_counts
            .keys()
            .chain(state.inappropriate.ngram_counts.keys())
            .cloned()
            .collect();
        if vocabulary.len() as u64 != state.vocabulary_size {
            return Err(ClassifierError::InvalidState(format!(
                "vocabulary size {} does not match {} stored n-grams",
                state.vocabulary_size,
                vocabulary.len()
            )));
        }

        self.state = state;
        self.vocabulary = vocabulary;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_set() -> Vec<LabeledExample> {
        let mut examples = Vec::new();
        for text in ["badword", "badguy", "badas"] {
            examples.push(LabeledExample::new(text, Intent::Inappropriate));
        }
        for text in ["johndoe", "sunflower", "marysmith"] {
            examples.push(LabeledExample::new(text, Intent::Safe));
        }
        examples
    }

    /// One inappropriate label against five safe ones.
    fn imbalanced_set() -> Vec<LabeledExample> {
        let mut examples = vec![LabeledExample::new("sunflower", Intent::Inappropriate)];
        for text in ["johndoe", "marysmith", "alicejones", "peterpan", "tomriley"] {
            examples.push(LabeledExample::new(text, Intent::Safe));
        }
        examples
    }

    #[test]
    fn test_char_ngrams() {
        let grams = char_ngrams("ab");
        // 4 unigrams, 3 bigrams, 2 trigrams over "^ab$"
        assert_eq!(grams.len(), 9);
        assert!(grams.contains(&"^ab".to_string()));
        assert!(grams.contains(&"b$".to_string()));
    }

    #[test]
    fn test_untrained_is_silent() {
        let classifier = NgramBayesClassifier::new();
        assert_eq!(classifier.predict("badword").unwrap(), Prediction::unknown());
    }

    #[test]
    fn test_single_intent_is_silent() {
        let mut classifier = NgramBayesClassifier::new();
        classifier
            .train(&[LabeledExample::new("johndoe", Intent::Safe)])
            .unwrap();
        assert!(!classifier.is_trained());
        assert_eq!(classifier.predict("johndoe").unwrap().confidence, 0.0);
    }

    #[test]
    fn test_predicts_trained_intent() {
        let mut classifier = NgramBayesClassifier::new();
        classifier.train(&training_set()).unwrap();

        let bad = classifier.predict("badman").unwrap();
        assert_eq!(bad.intent, Intent::Inappropriate);
        assert!(bad.confidence > 0.5 && bad.confidence <= 1.0);

        let good = classifier.predict("johnsmith").unwrap();
        assert_eq!(good.intent, Intent::Safe);
        assert!(good.confidence > 0.5 && good.confidence <= 1.0);
    }

    #[test]
    fn test_seen_text_is_confident() {
        let mut classifier = NgramBayesClassifier::new();
        classifier.train(&training_set()).unwrap();
        let prediction = classifier.predict("badword").unwrap();
        assert_eq!(prediction.intent, Intent::Inappropriate);
        assert!(prediction.confidence > 0.8, "{:?}", prediction);
    }

    #[test]
    fn test_imbalanced_corpus_is_silent_on_unseen_text() {
        let mut classifier = NgramBayesClassifier::new();
        classifier.train(&imbalanced_set()).unwrap();

        for text in ["xyzqwv", "badword"] {
            assert_eq!(classifier.predict(text).unwrap(), Prediction::unknown(), "{}", text);
        }
    }

    #[test]
    fn test_imbalanced_corpus_stays_below_hard_gate() {
        let mut classifier = NgramBayesClassifier::new();
        classifier.train(&imbalanced_set()).unwrap();

        // Shares a few bigrams with the training names but is mostly unseen.
        let prediction = classifier.predict("killer").unwrap();
        assert!(prediction.confidence < 0.8, "{:?}", prediction);
    }

    #[test]
    fn test_retrain_replaces_model() {
        let mut classifier = NgramBayesClassifier::new();
        classifier.train(&training_set()).unwrap();
        classifier.train(&[]).unwrap();
        assert!(!classifier.is_trained());
        assert_eq!(classifier.vocabulary_size(), 0);
    }

    #[test]
    fn test_persisted_state_restores_predictions() {
        let mut classifier = NgramBayesClassifier::new();
        classifier.train(&training_set()).unwrap();
        let state = classifier.persist().unwrap();

        let mut restored = NgramBayesClassifier::new();
        restored.load(state).unwrap();
        assert_eq!(restored.vocabulary_size(), classifier.vocabulary_size());
        assert_eq!(
            restored.predict("badman").unwrap(),
            classifier.predict("badman").unwrap()
        );
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut classifier = NgramBayesClassifier::new();
        let err = classifier.load(serde_json::json!({"safe": 3})).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidState(_)));
    }
}
