use anyhow::Context;
use std::path::PathBuf;

use handle_triage_lib::services::{ConfigStore, TerminalConsole};

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

const USAGE: &str = "Usage:
  handle-triage [--terms <terms.json>] [--candidates <usernames.txt>] [--model <model.json>]
                [--config <dir>] [--report <report.json>]

Notes:
  - Paths default to the config file, then HANDLE_TRIAGE_TERMS / HANDLE_TRIAGE_CANDIDATES /
    HANDLE_TRIAGE_MODEL, then command-line flags (last wins).
  - Answer each prompt with y/yes/yeah/yea/yep/sure/ok or n/no/nope/nah. Ctrl-C stops the
    batch after saving what has been confirmed so far.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    handle_triage_lib::init_logging();

    let store = match parse_arg_value(&args, "--config") {
        Some(dir) => ConfigStore::new(PathBuf::from(dir)),
        None => ConfigStore::new(
            ConfigStore::default_config_dir().context("no config directory available on this platform")?,
        ),
    };
    let mut config = store.load()?;
    config.apply_env_overrides();
    if let Some(p) = parse_arg_value(&args, "--terms") {
        config.terms_path = PathBuf::from(p);
    }
    if let Some(p) = parse_arg_value(&args, "--candidates") {
        config.candidates_path = PathBuf::from(p);
    }
    if let Some(p) = parse_arg_value(&args, "--model") {
        config.model_path = Some(PathBuf::from(p));
    }

    let mut console = TerminalConsole::new();
    let report = match handle_triage_lib::run_batch(&config, &mut console).await {
        Ok(report) => report,
        Err(err) => {
            let unsaved = err.unsaved_labels();
            if !unsaved.is_empty() {
                eprintln!("Labels confirmed this run (not saved):");
                for example in unsaved {
                    eprintln!("  {}\t{}", example.intent, example.text);
                }
            }
            return Err(err.into());
        }
    };

    println!();
    println!(
        "Reviewed {} candidate(s): {} passed, {} skipped, {} confirmed, {} aborted{}",
        report.candidates.len(),
        report.counts.passed,
        report.counts.skipped_known + report.counts.skipped_predicted,
        report.counts.confirmed_inappropriate + report.counts.confirmed_safe,
        report.counts.aborted,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    if !report.evicted.is_empty() {
        println!("Evicted stale safe labels: {}", report.evicted.join(", "));
    }

    if let Some(out_path) = parse_arg_value(&args, "--report") {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&out_path, json).with_context(|| format!("write report to {}", out_path))?;
        println!("Wrote report: {}", out_path);
    }

    Ok(())
}
