// Handle Triage Core Services

pub mod text_processor;
pub mod config_store;
pub mod detection;
pub mod classifier;
pub mod corpus;
pub mod stability;
pub mod model_store;
pub mod console;
pub mod review;

pub use text_processor::{fold_handle, normalize_handle, similarity, tokenize_words};
pub use config_store::{load_candidates, load_terms, AppConfig, ConfigStore, ReviewConfig};
pub use classifier::{ClassifierError, IntentClassifier, NgramBayesClassifier};
pub use corpus::TrainingCorpus;
pub use stability::{StabilityConfig, StabilityTracker};
pub use model_store::{ModelEnvelope, ModelStore};
pub use console::{parse_answer, Answer, ReviewConsole, TerminalConsole};
pub use review::{ReviewOrchestrator, Reviewed, TriageState};

pub use detection::{
    gate_prediction,
    ClassifierGate,
    ConfidenceThresholds,
    HeuristicRule,
    HeuristicRuleSet,
    RiskScorer,
    TermMatcher,
};
