// Model Store
// Persists classifier state together with the training corpus and stability counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::{TriageError, TriageResult};
use crate::models::LabeledExample;

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEnvelope {
    pub version: u32,
    pub run_id: Option<Uuid>,
    pub saved_at: DateTime<Utc>,
    /// Name of the classifier that produced `state`.
    pub classifier: String,
    /// Opaque classifier state.
    pub state: serde_json::Value,
    #[serde(default)]
    pub corpus: Vec<LabeledExample>,
    #[serde(default)]
    pub stability: BTreeMap<String, u32>,
}

pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no model has been saved yet.
    pub fn load(&self) -> TriageResult<Option<ModelEnvelope>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TriageError::config("model", &self.path, e)),
        };

        let envelope: ModelEnvelope =
            serde_json::from_str(&content).map_err(|e| TriageError::config("model", &self.path, e))?;
        if envelope.version != MODEL_FORMAT_VERSION {
            return Err(TriageError::config(
                "model",
                &self.path,
                format!("unsupported model format version {}", envelope.version),
            ));
        }

        info!(
            path = %self.path.display(),
            examples = envelope.corpus.len(),
            classifier = %envelope.classifier,
            "model.loaded"
        );
        Ok(Some(envelope))
    }

    /// Write to a sibling temp file, then rename over the target.
    pub fn save(&self, envelope: &ModelEnvelope) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(envelope)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), examples = envelope.corpus.len(), "model.saved");
        Ok(())
    }
}
