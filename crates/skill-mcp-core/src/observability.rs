//! Observability: tracing init and the execution history log.
//!
//! Uses `config::ObservabilityConfig` for SKILL_MCP_QUIET, LOG_LEVEL, LOG_JSON
//! and HISTORY_LOG. Logs always go to stderr: stdout carries JSON-RPC.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize tracing. Call once at process startup.
/// When SKILL_MCP_QUIET=1 only WARN and above are logged.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "skill_mcp=warn".to_string()
    } else {
        cfg.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_ansi(false),
            )
            .try_init()
    };
}

/// One finished script run, as seen by the history log.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub skill_name: String,
    pub script_path: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Record stamped with the current time.
    pub fn now(skill_name: &str, script_path: &str, success: bool) -> Self {
        Self {
            skill_name: skill_name.to_string(),
            script_path: script_path.to_string(),
            success,
            timestamp: Utc::now(),
        }
    }
}

/// Best-effort sink for execution history.
///
/// Errors are returned so callers can log them; they must never fail the
/// execution that produced the record.
pub trait ExecutionHistory: Send + Sync {
    fn record(&self, record: &ExecutionRecord) -> Result<()>;
}

/// History disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHistory;

impl ExecutionHistory for NoopHistory {
    fn record(&self, _record: &ExecutionRecord) -> Result<()> {
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl ExecutionHistory for JsonlHistory {
    fn record(&self, record: &ExecutionRecord) -> Result<()> {
        let line = json!({
            "ts": record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            "event": "script_executed",
            "skill": record.skill_name,
            "script": record.script_path,
            "success": record.success,
        });
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("history log lock poisoned"))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Create history dir {}", parent.display()))?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Open history log {}", self.path.display()))?;
        writeln!(f, "{}", line)?;
        Ok(())
    }
}

/// History sink configured by SKILL_MCP_HISTORY_LOG.
pub fn history_from_env() -> Box<dyn ExecutionHistory> {
    match ObservabilityConfig::from_env().history_log.as_deref() {
        Some(path) => Box::new(JsonlHistory::new(path)),
        None => Box::new(NoopHistory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonl_history_appends_records() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs/history.jsonl");
        let history = JsonlHistory::new(&path);
        for success in [true, false] {
            history
                .record(&ExecutionRecord::now("calc", "main.py", success))
                .unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["skill"], "calc");
        assert_eq!(lines[0]["success"], true);
        assert_eq!(lines[1]["success"], false);
    }

    #[test]
    fn test_jsonl_history_reports_unwritable_path() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let history = JsonlHistory::new(tmp.path());
        let rec = ExecutionRecord {
            skill_name: "calc".to_string(),
            script_path: "main.py".to_string(),
            success: true,
            timestamp: Utc::now(),
        };
        assert!(history.record(&rec).is_err());
    }
}
