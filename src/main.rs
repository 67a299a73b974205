mod calc;
mod config;
mod curriculum;
mod db;
mod import;
mod improvement;
mod ipc;
mod standards;
mod suggestions;
mod zones;

use anyhow::Context;
use config::Config;
use serde_json::json;
use standards::StandardsTable;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_logging(cfg: &Config) {
    // stdout carries the protocol; logs go to stderr.
    let filter = EnvFilter::try_new(&cfg.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}

fn load_standards(cfg: &Config) -> anyhow::Result<StandardsTable> {
    match &cfg.standards_path {
        Some(path) => StandardsTable::from_path(path)
            .with_context(|| format!("load standards from {}", path.display())),
        None => StandardsTable::bundled(),
    }
}

fn serve(state: &mut ipc::AppState) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                tracing::warn!(error = %e, "bad request line");
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}

fn run(cfg: Config) -> anyhow::Result<()> {
    let standards = load_standards(&cfg)?;
    tracing::info!(
        source = standards.source(),
        fingerprint = standards.fingerprint(),
        "standards loaded"
    );

    let mut state = ipc::AppState {
        workspace: None,
        db: None,
        standards,
    };
    if let Some(path) = cfg.workspace.clone() {
        ipc::open_workspace(&mut state, path.clone())
            .with_context(|| format!("open workspace {}", path.display()))?;
    }

    serve(&mut state);
    Ok(())
}

fn main() {
    let cfg = Config::from_env();
    init_logging(&cfg);
    if let Err(e) = run(cfg) {
        tracing::error!("startup failed: {e:#}");
        eprintln!("prairied: {e:#}");
        std::process::exit(1);
    }
}
