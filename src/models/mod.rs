// Handle Triage Data Models
// Shared types passed between scoring, corpus and review services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============ Terms & Candidates ============

/// A configured risk term. Loaded once from the term list, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub term: String,
    pub weight: u32,
}

impl Term {
    pub fn new(term: impl Into<String>, weight: u32) -> Self {
        Self {
            term: term.into(),
            weight,
        }
    }
}

/// One input line under review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub raw: String,
    /// Text after case folding, homoglyph folding, run collapse and stripping,
    /// but before leetspeak substitution.
    pub folded: String,
    pub normalized: String,
}

// ============ Labels ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Safe,
    Inappropriate,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Safe => "safe",
            Intent::Inappropriate => "inappropriate",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Intent::Safe => Intent::Inappropriate,
            Intent::Inappropriate => Intent::Safe,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub intent: Intent,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, intent: Intent) -> Self {
        Self {
            text: text.into(),
            intent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub intent: Intent,
    pub confidence: f64,
}

impl Prediction {
    /// Prediction of a model that has nothing to say yet.
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Safe,
            confidence: 0.0,
        }
    }
}

// ============ Scoring ============

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBreakdown {
    /// Substring and fuzzy matches against normalized terms.
    pub term_score: u32,
    /// Exact whole-token matches against raw term text.
    pub token_score: u32,
    pub heuristic_score: u32,
    #[serde(default)]
    pub fired_rules: Vec<String>,
    pub classifier_bonus: u32,
}

impl RiskBreakdown {
    pub fn lexical(&self) -> u32 {
        self.term_score.saturating_add(self.token_score)
    }

    /// Saturates at `u32::MAX` rather than wrapping on very large weights.
    pub fn total(&self) -> u32 {
        self.lexical()
            .saturating_add(self.heuristic_score)
            .saturating_add(self.classifier_bonus)
    }
}

// ============ Review Outcomes ============

/// Terminal state of one candidate's review.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    SkipKnown(Intent),
    SkipPredicted(Prediction),
    Pass(u32),
    Confirmed { intent: Intent, score: u32 },
    /// Confirmation retries were exhausted without an accepted answer.
    Aborted(u32),
    /// The operator interrupted the prompt or the input channel closed.
    Cancelled(u32),
}

impl ReviewOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            ReviewOutcome::SkipKnown(_) => "skip_known",
            ReviewOutcome::SkipPredicted(_) => "skip_predicted",
            ReviewOutcome::Pass(_) => "pass",
            ReviewOutcome::Confirmed { .. } => "confirmed",
            ReviewOutcome::Aborted(_) => "aborted",
            ReviewOutcome::Cancelled(_) => "cancelled",
        }
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewOutcome::SkipKnown(intent) => write!(f, "skipped (known {})", intent),
            ReviewOutcome::SkipPredicted(p) => write!(
                f,
                "skipped (predicted {}, confidence {:.2})",
                p.intent, p.confidence
            ),
            ReviewOutcome::Pass(score) => write!(f, "Risk Score: {}", score),
            ReviewOutcome::Confirmed { intent, score } => {
                write!(f, "Risk Score: {} -> confirmed {}", score, intent)
            }
            ReviewOutcome::Aborted(score) => {
                write!(f, "Risk Score: {} -> aborted (no valid answer)", score)
            }
            ReviewOutcome::Cancelled(score) => write!(f, "Risk Score: {} -> cancelled", score),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateReport {
    pub username: String,
    pub normalized: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskBreakdown>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeCounts {
    pub skipped_known: usize,
    pub skipped_predicted: usize,
    pub passed: usize,
    pub confirmed_inappropriate: usize,
    pub confirmed_safe: usize,
    pub aborted: usize,
    pub cancelled: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: &ReviewOutcome) {
        match outcome {
            ReviewOutcome::SkipKnown(_) => self.skipped_known += 1,
            ReviewOutcome::SkipPredicted(_) => self.skipped_predicted += 1,
            ReviewOutcome::Pass(_) => self.passed += 1,
            ReviewOutcome::Confirmed {
                intent: Intent::Inappropriate,
                ..
            } => self.confirmed_inappropriate += 1,
            ReviewOutcome::Confirmed {
                intent: Intent::Safe,
                ..
            } => self.confirmed_safe += 1,
            ReviewOutcome::Aborted(_) => self.aborted += 1,
            ReviewOutcome::Cancelled(_) => self.cancelled += 1,
        }
    }
}

/// Summary of one batch run, written out with `--report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counts: OutcomeCounts,
    pub candidates: Vec<CandidateReport>,
    pub confirmed: Vec<LabeledExample>,
    pub evicted: Vec<String>,
    pub cancelled: bool,
    pub corpus_size: usize,
}

impl BatchReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            counts: OutcomeCounts::default(),
            candidates: Vec::new(),
            confirmed: Vec::new(),
            evicted: Vec::new(),
            cancelled: false,
            corpus_size: 0,
        }
    }
}
