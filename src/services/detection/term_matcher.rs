// Term Matcher
// Weighted lexical risk of a candidate against the configured term list

use tracing::debug;

use crate::models::{Candidate, Term};
use crate::services::text_processor::{normalize_handle, similarity, tokenize_words};

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone)]
struct PreparedTerm {
    raw: String,
    normalized: String,
    weight: u32,
}

/// Lexical score split into its two independent parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LexicalScore {
    /// Substring or fuzzy match against the normalized term.
    pub term_score: u32,
    /// Whole-token equality with the raw term text.
    pub token_score: u32,
}

impl LexicalScore {
    pub fn total(&self) -> u32 {
        self.term_score.saturating_add(self.token_score)
    }
}

#[derive(Debug, Clone)]
pub struct TermMatcher {
    terms: Vec<PreparedTerm>,
    fuzzy_threshold: f64,
}

impl TermMatcher {
    pub fn new(terms: &[Term], fuzzy_threshold: f64) -> Self {
        let terms = terms
            .iter()
            .map(|t| PreparedTerm {
                raw: t.term.clone(),
                normalized: normalize_handle(&t.term),
                weight: t.weight,
            })
            .collect();
        Self {
            terms,
            fuzzy_threshold,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Score a candidate. A term matching both as a substring and as a whole
    /// token counts twice.
    pub fn score(&self, candidate: &Candidate) -> LexicalScore {
        let normalized = candidate.normalized.as_str();
        let mut score = LexicalScore::default();

        for term in &self.terms {
            if normalized.contains(term.normalized.as_str()) {
                score.term_score = score.term_score.saturating_add(term.weight);
                continue;
            }
            let sim = similarity(normalized, &term.normalized);
            if sim > self.fuzzy_threshold {
                let partial = (sim * term.weight as f64).floor() as u32;
                debug!(term = %term.raw, similarity = sim, partial, "term.fuzzy_match");
                score.term_score = score.term_score.saturating_add(partial);
            }
        }

        for word in tokenize_words(normalized) {
            for term in &self.terms {
                if word == term.raw {
                    score.token_score = score.token_score.saturating_add(term.weight);
                }
            }
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(terms: &[(&str, u32)]) -> TermMatcher {
        let terms: Vec<Term> = terms.iter().map(|(t, w)| Term::new(*t, *w)).collect();
        TermMatcher::new(&terms, DEFAULT_FUZZY_THRESHOLD)
    }

    #[test]
    fn test_exact_match_counts_twice() {
        let m = matcher(&[("bad", 10)]);
        let score = m.score(&Candidate::new("bad"));
        assert_eq!(score.term_score, 10);
        assert_eq!(score.token_score, 10);
        assert_eq!(score.total(), 20);
    }

    #[test]
    fn test_substring_only() {
        let m = matcher(&[("bad", 10)]);
        let score = m.score(&Candidate::new("xbadx"));
        assert_eq!(score, LexicalScore { term_score: 10, token_score: 0 });
    }

    #[test]
    fn test_leetspeak_candidate_hits_term() {
        let m = matcher(&[("badword", 50)]);
        let score = m.score(&Candidate::new("b4dw0rd"));
        assert_eq!(score.total(), 100);
    }

    #[test]
    fn test_fuzzy_match_is_floored() {
        // "badwrd" vs "badword": bigrams ba ad dw wr rd / ba ad dw wo or rd
        // share 4 of 5 + 6, so similarity = 8/11
        let m = matcher(&[("badword", 50)]);
        let score = m.score(&Candidate::new("badwrd"));
        assert_eq!(score.term_score, (8.0 / 11.0 * 50.0_f64).floor() as u32);
        assert_eq!(score.token_score, 0);
    }

    #[test]
    fn test_unrelated_scores_zero() {
        let m = matcher(&[("badword", 50)]);
        assert_eq!(m.score(&Candidate::new("john_doe")).total(), 0);
    }

    #[test]
    fn test_token_match_uses_raw_term_text() {
        // The raw term is not in normalized form, so only the substring rule fires.
        let m = matcher(&[("B4D", 10)]);
        let score = m.score(&Candidate::new("bad"));
        assert_eq!(score, LexicalScore { term_score: 10, token_score: 0 });
    }

    #[test]
    fn test_repeated_letter_term_matches_by_substring_only() {
        // Both sides normalize to "bo", while the raw term keeps its double
        // letter, so the whole-token rule cannot fire.
        let m = matcher(&[("boo", 10)]);
        let score = m.score(&Candidate::new("b00"));
        assert_eq!(score, LexicalScore { term_score: 10, token_score: 0 });
    }

    #[test]
    fn test_huge_weights_saturate() {
        let m = matcher(&[("bad", 3_000_000_000), ("ba", 3_000_000_000)]);
        let score = m.score(&Candidate::new("bad"));
        assert_eq!(score.term_score, u32::MAX);
        assert_eq!(score.token_score, 3_000_000_000);
        assert_eq!(score.total(), u32::MAX);
    }
}
