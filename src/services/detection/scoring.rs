// Risk Scoring
// Combines lexical, heuristic and classifier signals into one integer score

use crate::models::{Candidate, RiskBreakdown, Term};
use super::heuristics::HeuristicRuleSet;
use super::term_matcher::TermMatcher;

pub const DEFAULT_RISK_THRESHOLD: u32 = 15;

/// Pure scoring over a fixed term list and rule set. Safe to share across
/// threads; it never touches the corpus.
#[derive(Debug)]
pub struct RiskScorer {
    matcher: TermMatcher,
    rules: HeuristicRuleSet,
    threshold: u32,
}

impl RiskScorer {
    pub fn new(matcher: TermMatcher, rules: HeuristicRuleSet, threshold: u32) -> Self {
        Self {
            matcher,
            rules,
            threshold,
        }
    }

    pub fn from_terms(terms: &[Term], fuzzy_threshold: f64, rules: HeuristicRuleSet, threshold: u32) -> Self {
        Self::new(TermMatcher::new(terms, fuzzy_threshold), rules, threshold)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn score(&self, candidate: &Candidate, classifier_bonus: u32) -> RiskBreakdown {
        let lexical = self.matcher.score(candidate);
        let (heuristic_score, fired_rules) = self.rules.evaluate(candidate);
        RiskBreakdown {
            term_score: lexical.term_score,
            token_score: lexical.token_score,
            heuristic_score,
            fired_rules,
            classifier_bonus,
        }
    }

    /// Strictly greater than the threshold needs review.
    pub fn exceeds(&self, total: u32) -> bool {
        total > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::detection::heuristics::DEFAULT_DIGIT_PAIR_BONUS;
    use crate::services::detection::term_matcher::DEFAULT_FUZZY_THRESHOLD;

    fn scorer(terms: &[Term]) -> RiskScorer {
        RiskScorer::from_terms(
            terms,
            DEFAULT_FUZZY_THRESHOLD,
            HeuristicRuleSet::baseline(DEFAULT_DIGIT_PAIR_BONUS),
            DEFAULT_RISK_THRESHOLD,
        )
    }

    #[test]
    fn test_digit_pair_adds_exactly_fifteen() {
        let s = scorer(&[Term::new("badword", 50)]);
        let with_pair = s.score(&Candidate::new("skater69"), 0).total();
        let without = s.score(&Candidate::new("skater6"), 0).total();
        assert_eq!(with_pair, without + 15);
    }

    #[test]
    fn test_classifier_bonus_is_added() {
        let s = scorer(&[]);
        let breakdown = s.score(&Candidate::new("someone"), 20);
        assert_eq!(breakdown.total(), 20);
        assert!(s.exceeds(breakdown.total()));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let s = scorer(&[]);
        assert!(!s.exceeds(15));
        assert!(s.exceeds(16));
    }

    #[test]
    fn test_end_to_end_scores() {
        let s = scorer(&[Term::new("badword", 50)]);
        let bad = s.score(&Candidate::new("b4dw0rd"), 0);
        assert!(bad.total() >= 50);
        assert!(s.exceeds(bad.total()));

        let john = s.score(&Candidate::new("john_doe"), 0);
        assert!(!s.exceeds(john.total()));

        let cool = s.score(&Candidate::new("coolguy69xx"), 0);
        assert_eq!(cool.heuristic_score, 15);
        assert_eq!(cool.total(), cool.lexical() + 15);
    }

    #[test]
    fn test_oversized_weight_saturates_total() {
        let s = scorer(&[Term::new("bad", 3_000_000_000)]);
        let breakdown = s.score(&Candidate::new("bad"), 20);
        assert_eq!(breakdown.lexical(), u32::MAX);
        assert_eq!(breakdown.total(), u32::MAX);
        assert!(s.exceeds(breakdown.total()));
    }
}
