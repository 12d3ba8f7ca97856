// Review Orchestrator
// Per-candidate decision pipeline and batch-level retraining

use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{TriageError, TriageResult};
use crate::models::{
    BatchReport, Candidate, CandidateReport, Intent, LabeledExample, ReviewOutcome, RiskBreakdown,
};
use crate::services::classifier::{ClassifierError, IntentClassifier};
use crate::services::console::{parse_answer, Answer, ReviewConsole};
use crate::services::corpus::TrainingCorpus;
use crate::services::detection::scoring::RiskScorer;
use crate::services::detection::sensitivity::{gate_prediction, ClassifierGate, ConfidenceThresholds};
use crate::services::model_store::{ModelEnvelope, ModelStore, MODEL_FORMAT_VERSION};
use crate::services::stability::{StabilityConfig, StabilityTracker};

// ============================================================================
// Owned learning state
// ============================================================================

/// Corpus, classifier and stability counters. Loaded once, mutated per
/// candidate, persisted at batch end.
pub struct TriageState {
    corpus: TrainingCorpus,
    classifier: Box<dyn IntentClassifier>,
    stability: StabilityTracker,
}

impl TriageState {
    pub fn new(classifier: Box<dyn IntentClassifier>, stability: StabilityConfig) -> Self {
        Self {
            corpus: TrainingCorpus::new(),
            classifier,
            stability: StabilityTracker::new(stability),
        }
    }

    pub fn with_corpus(mut self, corpus: TrainingCorpus) -> Self {
        self.corpus = corpus;
        self
    }

    /// Rebuild from a persisted envelope. When the envelope was written by a
    /// different classifier its state is ignored and the classifier is
    /// retrained from the stored corpus instead.
    pub fn restore(
        envelope: Option<ModelEnvelope>,
        mut classifier: Box<dyn IntentClassifier>,
        stability: StabilityConfig,
    ) -> TriageResult<Self> {
        let Some(envelope) = envelope else {
            return Ok(Self::new(classifier, stability));
        };

        let corpus = TrainingCorpus::from_examples(envelope.corpus);
        if envelope.classifier == classifier.name() {
            classifier.load(envelope.state)?;
        } else {
            warn!(
                stored = %envelope.classifier,
                active = %classifier.name(),
                "model.classifier_changed_retraining"
            );
            classifier.train(corpus.examples())?;
        }

        let stability = StabilityTracker::with_counters(stability, envelope.stability, &corpus);
        Ok(Self {
            corpus,
            classifier,
            stability,
        })
    }

    pub fn corpus(&self) -> &TrainingCorpus {
        &self.corpus
    }

    pub fn stability(&self) -> &StabilityTracker {
        &self.stability
    }

    /// Commit an operator decision. Any opposite label for the same text is
    /// dropped first so a text never carries both.
    pub fn record_label(&mut self, text: &str, intent: Intent) {
        if self.corpus.remove(text, intent.opposite()) {
            info!(text, from = %intent.opposite(), to = %intent, "corpus.relabel");
        }
        self.corpus.add(text, intent);
        match intent {
            Intent::Safe => self.stability.reset(text),
            Intent::Inappropriate => self.stability.forget(text),
        }
    }

    pub fn retrain(&mut self) -> Result<(), ClassifierError> {
        self.classifier.train(self.corpus.examples())
    }

    pub fn envelope(&self, run_id: Uuid) -> Result<ModelEnvelope, ClassifierError> {
        Ok(ModelEnvelope {
            version: MODEL_FORMAT_VERSION,
            run_id: Some(run_id),
            saved_at: Utc::now(),
            classifier: self.classifier.name().to_string(),
            state: self.classifier.persist()?,
            corpus: self.corpus.examples().to_vec(),
            stability: self.stability.counters().clone(),
        })
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

#[derive(Debug)]
pub struct Reviewed {
    pub candidate: Candidate,
    pub outcome: ReviewOutcome,
    pub risk: Option<RiskBreakdown>,
    pub evicted: Vec<String>,
}

impl Reviewed {
    fn skipped(candidate: Candidate, outcome: ReviewOutcome) -> Self {
        Self {
            candidate,
            outcome,
            risk: None,
            evicted: Vec::new(),
        }
    }
}

pub struct ReviewOrchestrator {
    scorer: RiskScorer,
    confidence: ConfidenceThresholds,
    max_prompt_attempts: u32,
}

impl ReviewOrchestrator {
    pub fn new(scorer: RiskScorer, confidence: ConfidenceThresholds, max_prompt_attempts: u32) -> Self {
        Self {
            scorer,
            confidence,
            max_prompt_attempts: max_prompt_attempts.max(1),
        }
    }

    /// Drive one candidate to a terminal outcome.
    pub async fn review_candidate<C: ReviewConsole>(
        &self,
        state: &mut TriageState,
        console: &mut C,
        raw: &str,
    ) -> TriageResult<Reviewed> {
        let candidate = Candidate::new(raw);

        for intent in [Intent::Safe, Intent::Inappropriate] {
            if state.corpus.contains(&candidate.normalized, intent) {
                return Ok(Reviewed::skipped(candidate, ReviewOutcome::SkipKnown(intent)));
            }
        }

        let prediction = state.classifier.predict(&candidate.normalized)?;
        let bonus = match gate_prediction(&prediction, &self.confidence) {
            ClassifierGate::Decide(p) => {
                return Ok(Reviewed::skipped(candidate, ReviewOutcome::SkipPredicted(p)));
            }
            ClassifierGate::Bonus(bonus) => bonus,
            ClassifierGate::Neutral => 0,
        };

        let risk = self.scorer.score(&candidate, bonus);
        let total = risk.total();
        debug!(
            normalized = %candidate.normalized,
            term = risk.term_score,
            token = risk.token_score,
            heuristic = risk.heuristic_score,
            bonus,
            total,
            "review.scored"
        );
        if !self.scorer.exceeds(total) {
            return Ok(Reviewed {
                candidate,
                outcome: ReviewOutcome::Pass(total),
                risk: Some(risk),
                evicted: Vec::new(),
            });
        }

        let evicted = state.stability.sweep(&candidate.normalized, &mut state.corpus);
        let outcome = self.confirm(state, console, &candidate, total).await?;
        Ok(Reviewed {
            candidate,
            outcome,
            risk: Some(risk),
            evicted,
        })
    }

    async fn confirm<C: ReviewConsole>(
        &self,
        state: &mut TriageState,
        console: &mut C,
        candidate: &Candidate,
        total: u32,
    ) -> TriageResult<ReviewOutcome> {
        let question = format!(
            "Username: {}, Risk Score: {}. Is this inappropriate? (y/n)",
            candidate.raw, total
        );

        for attempt in 1..=self.max_prompt_attempts {
            let Some(input) = console.ask(&question).await? else {
                return Ok(ReviewOutcome::Cancelled(total));
            };
            let intent = match parse_answer(&input) {
                Answer::Affirmative => Intent::Inappropriate,
                Answer::Negative => Intent::Safe,
                Answer::Unrecognized => {
                    warn!(attempt, max = self.max_prompt_attempts, "review.unrecognized_answer");
                    if attempt < self.max_prompt_attempts {
                        console.report("Please answer yes or no.")?;
                    }
                    continue;
                }
            };
            state.record_label(&candidate.normalized, intent);
            return Ok(ReviewOutcome::Confirmed { intent, score: total });
        }

        Ok(ReviewOutcome::Aborted(total))
    }

    /// Review candidates in input order, then retrain and persist. A
    /// cancelled prompt stops the batch but still saves the labels gathered
    /// so far.
    pub async fn run_batch<C: ReviewConsole>(
        &self,
        state: &mut TriageState,
        console: &mut C,
        candidates: &[String],
        store: &ModelStore,
        run_id: Uuid,
    ) -> TriageResult<BatchReport> {
        let span = info_span!("batch", run_id = %run_id);
        self.review_all(state, console, candidates, store, run_id)
            .instrument(span)
            .await
    }

    async fn review_all<C: ReviewConsole>(
        &self,
        state: &mut TriageState,
        console: &mut C,
        candidates: &[String],
        store: &ModelStore,
        run_id: Uuid,
    ) -> TriageResult<BatchReport> {
        let mut report = BatchReport::new(run_id);
        info!(candidates = candidates.len(), corpus = state.corpus.len(), "batch.started");

        let reviewed = self.review_each(state, console, candidates, &mut report).await;
        if let Err(err) = reviewed {
            return Err(err.with_unsaved(&report.confirmed));
        }

        self.finish(state, store, &mut report)?;
        Ok(report)
    }

    async fn review_each<C: ReviewConsole>(
        &self,
        state: &mut TriageState,
        console: &mut C,
        candidates: &[String],
        report: &mut BatchReport,
    ) -> TriageResult<()> {
        for raw in candidates {
            let reviewed = self.review_candidate(state, console, raw).await?;
            console.report(&format!("Username: {}, {}", raw, reviewed.outcome))?;
            info!(
                candidate = %raw,
                outcome = reviewed.outcome.kind(),
                score = reviewed.risk.as_ref().map(|r| r.total()),
                "review.outcome"
            );

            report.counts.record(&reviewed.outcome);
            if let ReviewOutcome::Confirmed { intent, .. } = reviewed.outcome {
                report
                    .confirmed
                    .push(LabeledExample::new(reviewed.candidate.normalized.clone(), intent));
            }
            report.evicted.extend(reviewed.evicted);
            let cancelled = matches!(reviewed.outcome, ReviewOutcome::Cancelled(_));
            report.candidates.push(CandidateReport {
                username: reviewed.candidate.raw,
                normalized: reviewed.candidate.normalized,
                outcome: reviewed.outcome.kind().to_string(),
                risk: reviewed.risk,
            });

            if cancelled {
                warn!(remaining = candidates.len() - report.candidates.len(), "batch.cancelled");
                report.cancelled = true;
                break;
            }
        }
        Ok(())
    }

    fn finish(&self, state: &mut TriageState, store: &ModelStore, report: &mut BatchReport) -> TriageResult<()> {
        state
            .retrain()
            .map_err(|e| TriageError::from(e).with_unsaved(&report.confirmed))?;
        let persist_failed = |reason: String| TriageError::Persist {
            path: store.path().to_path_buf(),
            reason,
            confirmed: report.confirmed.clone(),
        };

        let envelope = state
            .envelope(report.run_id)
            .map_err(|e| persist_failed(e.to_string()))?;
        store.save(&envelope).map_err(|e| persist_failed(e.to_string()))?;

        report.corpus_size = state.corpus.len();
        report.finished_at = Some(Utc::now());
        info!(
            corpus = report.corpus_size,
            confirmed = report.confirmed.len(),
            evicted = report.evicted.len(),
            "batch.finished"
        );
        Ok(())
    }
}
