// Heuristic Rules
// Fixed-pattern risk add-ons that do not depend on the term list

use std::fmt;

use crate::models::Candidate;

pub const DIGIT_PAIR_RULE: &str = "digit_pair_69";
pub const DEFAULT_DIGIT_PAIR_BONUS: u32 = 15;

type Predicate = Box<dyn Fn(&Candidate) -> bool + Send + Sync>;

pub struct HeuristicRule {
    pub name: String,
    pub delta: u32,
    predicate: Predicate,
}

impl HeuristicRule {
    pub fn new(
        name: impl Into<String>,
        delta: u32,
        predicate: impl Fn(&Candidate) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            delta,
            predicate: Box::new(predicate),
        }
    }

    pub fn matches(&self, candidate: &Candidate) -> bool {
        (self.predicate)(candidate)
    }
}

impl fmt::Debug for HeuristicRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeuristicRule")
            .field("name", &self.name)
            .field("delta", &self.delta)
            .finish()
    }
}

/// Both `6` and `9` present. Reads the folded text because leetspeak
/// substitution turns `9` into `g`.
fn has_digit_pair(candidate: &Candidate) -> bool {
    candidate.folded.contains('6') && candidate.folded.contains('9')
}

#[derive(Debug, Default)]
pub struct HeuristicRuleSet {
    rules: Vec<HeuristicRule>,
}

impl HeuristicRuleSet {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn baseline(digit_pair_bonus: u32) -> Self {
        Self::empty().with_rule(HeuristicRule::new(
            DIGIT_PAIR_RULE,
            digit_pair_bonus,
            has_digit_pair,
        ))
    }

    pub fn with_rule(mut self, rule: HeuristicRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Sum of deltas of every matching rule, with the names that fired.
    pub fn evaluate(&self, candidate: &Candidate) -> (u32, Vec<String>) {
        let mut total: u32 = 0;
        let mut fired = Vec::new();
        for rule in &self.rules {
            if rule.matches(candidate) {
                total = total.saturating_add(rule.delta);
                fired.push(rule.name.clone());
            }
        }
        (total, fired)
    }
}
