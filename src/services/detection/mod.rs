// Detection Module
// Risk signals organized into specialized submodules:
// - term_matcher: weighted substring, fuzzy and whole-token term matches
// - heuristics: fixed-pattern add-ons independent of the term list
// - sensitivity: classifier confidence gates
// - scoring: combines the signals into one integer risk score

pub mod term_matcher;
pub mod heuristics;
pub mod sensitivity;
pub mod scoring;

pub use term_matcher::{LexicalScore, TermMatcher};
pub use heuristics::{HeuristicRule, HeuristicRuleSet};
pub use sensitivity::{gate_prediction, ClassifierGate, ConfidenceThresholds};
pub use scoring::RiskScorer;
