// Configuration Storage Service
// Config file loading plus term and candidate list loading

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{TriageError, TriageResult};
use crate::models::Term;
use crate::services::detection::heuristics::DEFAULT_DIGIT_PAIR_BONUS;
use crate::services::detection::scoring::DEFAULT_RISK_THRESHOLD;
use crate::services::detection::sensitivity::ConfidenceThresholds;
use crate::services::detection::term_matcher::DEFAULT_FUZZY_THRESHOLD;
use crate::services::stability::StabilityConfig;
use crate::services::text_processor::normalize_handle;

pub const APP_DIR_NAME: &str = "handle-triage";
const ENV_TERMS: &str = "HANDLE_TRIAGE_TERMS";
const ENV_CANDIDATES: &str = "HANDLE_TRIAGE_CANDIDATES";
const ENV_MODEL: &str = "HANDLE_TRIAGE_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub version: String,
    #[serde(default = "default_terms_path")]
    pub terms_path: PathBuf,
    #[serde(default = "default_candidates_path")]
    pub candidates_path: PathBuf,
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    #[serde(default)]
    pub review: ReviewConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            terms_path: default_terms_path(),
            candidates_path: default_candidates_path(),
            model_path: None,
            review: ReviewConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewConfig {
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: u32,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_match_threshold: f64,
    #[serde(default = "default_digit_pair_bonus")]
    pub digit_pair_bonus: u32,
    #[serde(default)]
    pub confidence: ConfidenceThresholds,
    #[serde(default)]
    pub stability: StabilityConfig,
    #[serde(default = "default_max_prompt_attempts")]
    pub max_prompt_attempts: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            risk_threshold: DEFAULT_RISK_THRESHOLD,
            fuzzy_match_threshold: DEFAULT_FUZZY_THRESHOLD,
            digit_pair_bonus: DEFAULT_DIGIT_PAIR_BONUS,
            confidence: ConfidenceThresholds::default(),
            stability: StabilityConfig::default(),
            max_prompt_attempts: 3,
        }
    }
}

fn default_terms_path() -> PathBuf { PathBuf::from("terms.json") }
fn default_candidates_path() -> PathBuf { PathBuf::from("usernames.txt") }
fn default_risk_threshold() -> u32 { DEFAULT_RISK_THRESHOLD }
fn default_fuzzy_threshold() -> f64 { DEFAULT_FUZZY_THRESHOLD }
fn default_digit_pair_bonus() -> u32 { DEFAULT_DIGIT_PAIR_BONUS }
fn default_max_prompt_attempts() -> u32 { 3 }

impl AppConfig {
    /// Environment variables win over the config file for the three paths.
    pub fn apply_env_overrides(&mut self) {
        if let Some(p) = env_path(ENV_TERMS) {
            self.terms_path = p;
        }
        if let Some(p) = env_path(ENV_CANDIDATES) {
            self.candidates_path = p;
        }
        if let Some(p) = env_path(ENV_MODEL) {
            self.model_path = Some(p);
        }
    }

    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join(APP_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("model.json")
        })
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

/// Read-only view of `<dir>/config.json`.
pub struct ConfigStore {
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.json"),
        }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR_NAME))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(&self) -> TriageResult<AppConfig> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| TriageError::config("config", &self.config_file, e))?;

        serde_json::from_str(&content).map_err(|e| TriageError::config("config", &self.config_file, e))
    }
}

// ============ Term & Candidate Lists ============

/// Load the `[{"term": ..., "weight": ...}]` list. Every term must have a
/// positive weight and survive normalization.
///
/// Whole-token matches compare against the term as written, while candidates
/// are fully normalized. A term with doubled letters or leetspeak (`boo`,
/// `b4d`) therefore only ever scores through the substring rule.
pub fn load_terms(path: &Path) -> TriageResult<Vec<Term>> {
    let content = fs::read_to_string(path).map_err(|e| TriageError::config("term list", path, e))?;
    let terms: Vec<Term> =
        serde_json::from_str(&content).map_err(|e| TriageError::config("term list", path, e))?;

    for (i, term) in terms.iter().enumerate() {
        if term.weight == 0 {
            return Err(TriageError::config(
                "term list",
                path,
                format!("term #{} ({:?}) has zero weight", i, term.term),
            ));
        }
        if normalize_handle(&term.term).trim().is_empty() {
            return Err(TriageError::config(
                "term list",
                path,
                format!("term #{} ({:?}) is empty after normalization", i, term.term),
            ));
        }
    }

    info!(path = %path.display(), count = terms.len(), "terms.loaded");
    Ok(terms)
}

/// One candidate per non-blank line, taken literally.
pub fn parse_candidates(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_candidates(path: &Path) -> TriageResult<Vec<String>> {
    let content =
        fs::read_to_string(path).map_err(|e| TriageError::config("candidate list", path, e))?;
    let candidates = parse_candidates(&content);
    info!(path = %path.display(), count = candidates.len(), "candidates.loaded");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.review.risk_threshold, 15);
        assert_eq!(config.review.confidence.soft, 0.5);
        assert_eq!(config.review.confidence.hard, 0.8);
        assert_eq!(config.review.stability.eviction_flags, 5);
        assert_eq!(config.review.max_prompt_attempts, 3);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"version":"1.0.0","review":{"riskThreshold":30}}"#).unwrap();
        assert_eq!(parsed.review.risk_threshold, 30);
        assert_eq!(parsed.review.digit_pair_bonus, 15);
        assert_eq!(parsed.terms_path, PathBuf::from("terms.json"));
    }

    #[test]
    fn test_missing_file_then_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert_eq!(store.load().unwrap().review.risk_threshold, 15);

        fs::write(
            store.config_file(),
            r#"{"version":"0.1.0","modelPath":"/srv/triage/model.json","review":{"maxPromptAttempts":5}}"#,
        )
        .unwrap();
        let config = store.load().unwrap();
        assert_eq!(config.review.max_prompt_attempts, 5);
        assert_eq!(config.resolved_model_path(), PathBuf::from("/srv/triage/model.json"));
    }

    #[test]
    fn test_malformed_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        fs::write(store.config_file(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(TriageError::Config { .. })));
    }

    #[test]
    fn test_parse_candidates_skips_blank_lines() {
        let parsed = parse_candidates("john_doe\r\n\r\nb4dw0rd\n   \ncoolguy69xx\n");
        assert_eq!(parsed, vec!["john_doe", "b4dw0rd", "coolguy69xx"]);
    }

    #[test]
    fn test_load_terms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.json");
        fs::write(&path, r#"[{"term":"badword","weight":50}]"#).unwrap();
        assert_eq!(load_terms(&path).unwrap(), vec![Term::new("badword", 50)]);
    }

    #[test]
    fn test_load_terms_rejects_bad_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.json");

        fs::write(&path, r#"[{"term":"badword","weight":0}]"#).unwrap();
        assert!(load_terms(&path).is_err());

        fs::write(&path, r#"[{"term":"!!!","weight":5}]"#).unwrap();
        assert!(load_terms(&path).is_err());

        fs::write(&path, r#"[{"term":"badword"}]"#).unwrap();
        assert!(load_terms(&path).is_err());
    }

    #[test]
    fn test_missing_candidate_list_is_error() {
        let err = load_candidates(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(err.to_string().contains("candidate list"));
    }
}
