// Confidence gating
// Classifier confidence influences review gating, never the lexical score itself.

use serde::{Deserialize, Serialize};

use crate::models::{Intent, Prediction};

pub const DEFAULT_SOFT_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_HARD_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_CLASSIFIER_BONUS: u32 = 20;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceThresholds {
    /// Above this, an inappropriate prediction adds `bonus` to the risk score.
    pub soft: f64,
    /// Above this, the prediction decides the candidate without a prompt.
    pub hard: f64,
    pub bonus: u32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            soft: DEFAULT_SOFT_CONFIDENCE,
            hard: DEFAULT_HARD_CONFIDENCE,
            bonus: DEFAULT_CLASSIFIER_BONUS,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClassifierGate {
    /// Confident enough to terminate the review in either direction.
    Decide(Prediction),
    Bonus(u32),
    Neutral,
}

pub fn gate_prediction(prediction: &Prediction, thresholds: &ConfidenceThresholds) -> ClassifierGate {
    if prediction.confidence > thresholds.hard {
        ClassifierGate::Decide(*prediction)
    } else if prediction.intent == Intent::Inappropriate && prediction.confidence > thresholds.soft {
        ClassifierGate::Bonus(thresholds.bonus)
    } else {
        ClassifierGate::Neutral
    }
}
