// Stability Tracker
// Evicts "safe" labels that keep colliding with newly risky candidates

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::models::Intent;
use crate::services::corpus::TrainingCorpus;
use crate::services::text_processor::similarity;

pub const DEFAULT_COLLISION_SIMILARITY: f64 = 0.8;
pub const DEFAULT_EVICTION_FLAGS: u32 = 5;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityConfig {
    /// A safe text collides with a candidate above this similarity.
    pub collision_similarity: f64,
    /// Collisions needed before the safe label is evicted.
    pub eviction_flags: u32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            collision_similarity: DEFAULT_COLLISION_SIMILARITY,
            eviction_flags: DEFAULT_EVICTION_FLAGS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StabilityTracker {
    config: StabilityConfig,
    counters: BTreeMap<String, u32>,
}

impl StabilityTracker {
    pub fn new(config: StabilityConfig) -> Self {
        Self {
            config,
            counters: BTreeMap::new(),
        }
    }

    /// Restore persisted counters, keeping only texts still labeled safe.
    pub fn with_counters(
        config: StabilityConfig,
        counters: BTreeMap<String, u32>,
        corpus: &TrainingCorpus,
    ) -> Self {
        let counters = counters
            .into_iter()
            .filter(|(text, _)| corpus.contains(text, Intent::Safe))
            .collect();
        Self { config, counters }
    }

    pub fn count(&self, text: &str) -> u32 {
        self.counters.get(text).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> &BTreeMap<String, u32> {
        &self.counters
    }

    /// Fresh safe confirmation.
    pub fn reset(&mut self, text: &str) {
        self.counters.insert(text.to_string(), 0);
    }

    /// The text no longer holds a safe label.
    pub fn forget(&mut self, text: &str) {
        self.counters.remove(text);
    }

    /// Flag every safe text similar to a risky candidate and evict the ones
    /// that reached the limit. Returns the evicted texts.
    pub fn sweep(&mut self, normalized: &str, corpus: &mut TrainingCorpus) -> Vec<String> {
        let colliding: Vec<String> = corpus
            .list_by_intent(Intent::Safe)
            .into_iter()
            .filter(|safe| similarity(normalized, safe) > self.config.collision_similarity)
            .map(str::to_string)
            .collect();

        let mut evicted = Vec::new();
        for text in colliding {
            let count = self.counters.entry(text.clone()).or_insert(0);
            *count += 1;
            debug!(safe = %text, candidate = %normalized, flags = *count, "stability.flag");

            if *count >= self.config.eviction_flags {
                corpus.remove(&text, Intent::Safe);
                self.counters.remove(&text);
                info!(evicted = %text, "stability.evict");
                evicted.push(text);
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus_with_safe(text: &str) -> TrainingCorpus {
        let mut corpus = TrainingCorpus::new();
        corpus.add(text, Intent::Safe);
        corpus
    }

    #[test]
    fn test_four_flags_keep_fifth_evicts() {
        let mut corpus = corpus_with_safe("badwords");
        let mut tracker = StabilityTracker::new(StabilityConfig::default());

        let candidates = ["badwordsa", "abadwords", "badwordsx", "xbadwords", "badwordsz"];
        for candidate in &candidates[..4] {
            assert!(tracker.sweep(candidate, &mut corpus).is_empty());
        }
        assert!(corpus.contains("badwords", Intent::Safe));
        assert_eq!(tracker.count("badwords"), 4);

        let evicted = tracker.sweep(candidates[4], &mut corpus);
        assert_eq!(evicted, vec!["badwords".to_string()]);
        assert!(!corpus.contains("badwords", Intent::Safe));
        assert!(tracker.counters().is_empty());
    }

    #[test]
    fn test_dissimilar_candidate_does_not_flag() {
        let mut corpus = corpus_with_safe("sunflower");
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        tracker.sweep("badword", &mut corpus);
        assert_eq!(tracker.count("sunflower"), 0);
    }

    #[test]
    fn test_reset_clears_progress() {
        let mut corpus = corpus_with_safe("badwords");
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        for _ in 0..4 {
            tracker.sweep("badwordsa", &mut corpus);
        }
        tracker.reset("badwords");
        assert_eq!(tracker.count("badwords"), 0);
        assert!(tracker.sweep("badwordsa", &mut corpus).is_empty());
        assert!(corpus.contains("badwords", Intent::Safe));
    }

    #[test]
    fn test_restored_counters_drop_stale_texts() {
        let corpus = corpus_with_safe("kept");
        let mut counters = BTreeMap::new();
        counters.insert("kept".to_string(), 2);
        counters.insert("gone".to_string(), 3);
        let tracker = StabilityTracker::with_counters(StabilityConfig::default(), counters, &corpus);
        assert_eq!(tracker.count("kept"), 2);
        assert_eq!(tracker.count("gone"), 0);
        assert_eq!(tracker.counters().len(), 1);
    }
}
