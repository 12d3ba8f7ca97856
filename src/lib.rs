pub mod error;
pub mod models;
pub mod services;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use error::TriageResult;
use models::{BatchReport, Term};
use services::config_store::{load_candidates, load_terms, AppConfig, ReviewConfig, APP_DIR_NAME};
use services::console::ReviewConsole;
use services::detection::{HeuristicRuleSet, RiskScorer};
use services::{ModelStore, NgramBayesClassifier, ReviewOrchestrator, TriageState};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOGS_KEPT: usize = 30;

fn env_flag(key: &str) -> bool {
    matches!(std::env::var(key).as_deref(), Ok("1") | Ok("true") | Ok("TRUE"))
}

/// Initialize logging with one timestamped log file per run.
///
/// stdout belongs to the operator prompt, so console logging (debug builds
/// only, or when file logging is disabled) goes to stderr.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env_flag("HANDLE_TRIAGE_DISABLE_FILE_LOG") {
        init_console_only_logging(env_filter);
        info!("File logging disabled via HANDLE_TRIAGE_DISABLE_FILE_LOG");
        return;
    }

    let logs_dir = match std::env::var("HANDLE_TRIAGE_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("{}_{}.log", APP_DIR_NAME, timestamp);

    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }

    info!("Log file: {}/{}", logs_dir.display(), log_filename);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    cleanup_old_logs(&logs_dir, LOGS_KEPT);
}

fn get_logs_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join(APP_DIR_NAME).join("logs");
    }
    PathBuf::from("logs")
}

fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    let prefix = format!("{}_", APP_DIR_NAME);
    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with(&prefix) && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

fn init_console_only_logging(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

/// Scoring pipeline for the configured terms with the baseline heuristics.
pub fn build_orchestrator(review: &ReviewConfig, terms: &[Term]) -> ReviewOrchestrator {
    let scorer = RiskScorer::from_terms(
        terms,
        review.fuzzy_match_threshold,
        HeuristicRuleSet::baseline(review.digit_pair_bonus),
        review.risk_threshold,
    );
    ReviewOrchestrator::new(scorer, review.confidence, review.max_prompt_attempts)
}

/// Load every input up front, then review the whole candidate list.
pub async fn run_batch<C: ReviewConsole>(config: &AppConfig, console: &mut C) -> TriageResult<BatchReport> {
    let terms = load_terms(&config.terms_path)?;
    let candidates = load_candidates(&config.candidates_path)?;
    let store = ModelStore::new(config.resolved_model_path());
    let mut state = TriageState::restore(
        store.load()?,
        Box::new(NgramBayesClassifier::new()),
        config.review.stability,
    )?;

    let run_id = Uuid::new_v4();
    info!(%run_id, terms = terms.len(), model = %store.path().display(), "run.starting");

    let orchestrator = build_orchestrator(&config.review, &terms);
    orchestrator
        .run_batch(&mut state, console, &candidates, &store, run_id)
        .await
}
