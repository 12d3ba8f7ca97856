// Training Corpus
// Deduplicated labeled examples, queryable by label

use serde::{Deserialize, Serialize};

use crate::models::{Intent, LabeledExample};

/// Insertion-ordered set of (text, intent) pairs.
///
/// The store only guarantees uniqueness of pairs. Keeping a text under a
/// single label is the caller's job (see `TriageState::record_label`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingCorpus {
    examples: Vec<LabeledExample>,
}

impl TrainingCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted examples, dropping duplicate pairs.
    pub fn from_examples(examples: impl IntoIterator<Item = LabeledExample>) -> Self {
        let mut corpus = Self::new();
        for example in examples {
            corpus.add(example.text, example.intent);
        }
        corpus
    }

    pub fn contains(&self, text: &str, intent: Intent) -> bool {
        self.examples
            .iter()
            .any(|e| e.intent == intent && e.text == text)
    }

    /// Returns false when the pair was already present.
    pub fn add(&mut self, text: impl Into<String>, intent: Intent) -> bool {
        let text = text.into();
        if self.contains(&text, intent) {
            return false;
        }
        self.examples.push(LabeledExample { text, intent });
        true
    }

    pub fn remove(&mut self, text: &str, intent: Intent) -> bool {
        let before = self.examples.len();
        self.examples
            .retain(|e| !(e.intent == intent && e.text == text));
        self.examples.len() != before
    }

    pub fn list_by_intent(&self, intent: Intent) -> Vec<&str> {
        self.examples
            .iter()
            .filter(|e| e.intent == intent)
            .map(|e| e.text.as_str())
            .collect()
    }

    /// First label held by `text`, if any.
    pub fn label_of(&self, text: &str) -> Option<Intent> {
        self.examples.iter().find(|e| e.text == text).map(|e| e.intent)
    }

    pub fn examples(&self) -> &[LabeledExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}
