// Error types for the triage pipeline

use std::path::PathBuf;

use thiserror::Error;

use crate::models::LabeledExample;
use crate::services::classifier::ClassifierError;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("failed to load {what} from {}: {reason}", .path.display())]
    Config {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("classifier failure: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("confirmation channel failed: {0}")]
    Console(#[from] std::io::Error),

    #[error(
        "failed to persist model to {}: {reason} ({} label(s) confirmed this run were not saved)",
        .path.display(),
        .confirmed.len()
    )]
    Persist {
        path: PathBuf,
        reason: String,
        confirmed: Vec<LabeledExample>,
    },

    /// A batch failed after the operator had already confirmed labels.
    #[error("batch stopped: {source} ({} label(s) confirmed this run were not saved)", .confirmed.len())]
    Interrupted {
        source: Box<TriageError>,
        confirmed: Vec<LabeledExample>,
    },
}

impl TriageError {
    pub fn config(what: &'static str, path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TriageError::Config {
            what,
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Attach the labels confirmed so far to a mid-batch failure. Errors that
    /// already carry them, and runs with nothing confirmed, pass through.
    pub fn with_unsaved(self, confirmed: &[LabeledExample]) -> Self {
        match self {
            TriageError::Persist { .. } | TriageError::Interrupted { .. } => self,
            _ if confirmed.is_empty() => self,
            other => TriageError::Interrupted {
                source: Box::new(other),
                confirmed: confirmed.to_vec(),
            },
        }
    }

    /// Labels an operator confirmed before the failure, if the error carries any.
    pub fn unsaved_labels(&self) -> &[LabeledExample] {
        match self {
            TriageError::Persist { confirmed, .. } | TriageError::Interrupted { confirmed, .. } => confirmed,
            _ => &[],
        }
    }
}

pub type TriageResult<T> = Result<T, TriageError>;
