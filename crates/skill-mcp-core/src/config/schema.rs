//! Configuration structs grouped by concern, loaded from the environment.

use super::env_keys::{execution as exec_keys, observability as obv_keys, paths as path_keys};
use super::loader::{env_bool, env_optional, env_or, env_u64};
use std::path::PathBuf;

/// Default wall-clock budget for one script run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default cap on captured stdout/stderr, per stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 100_000;

/// Interpreter used for Python scripts without inline dependencies.
pub const DEFAULT_PYTHON_INTERPRETER: &str = "python3";

/// Skills root configuration.
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub skills_dir: PathBuf,
}

impl PathsConfig {
    pub fn from_env() -> Self {
        let skills_dir = env_optional(path_keys::SKILL_MCP_DIR, path_keys::SKILLS_DIR_ALIASES)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_skills_dir);
        Self { skills_dir }
    }

    /// `~/.skill-mcp/skills`, or `./.skill-mcp/skills` without a home directory.
    pub fn default_skills_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".skill-mcp")
            .join("skills")
    }
}

/// Script execution limits and the external programs the engine launches.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub timeout_secs: u64,
    pub max_output_bytes: usize,
    /// Bare interpreter for `.py` files without an inline dependency block
    pub python: String,
    /// Isolated dependency runner (`uv run <file>`)
    pub dependency_runner: String,
    pub node: String,
    pub npm: String,
    pub shell: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            python: DEFAULT_PYTHON_INTERPRETER.to_string(),
            dependency_runner: "uv".to_string(),
            node: "node".to_string(),
            npm: "npm".to_string(),
            shell: "bash".to_string(),
        }
    }
}

impl ExecutionConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            timeout_secs: env_u64(exec_keys::SKILL_MCP_TIMEOUT_SECS, &[], d.timeout_secs),
            max_output_bytes: env_u64(
                exec_keys::SKILL_MCP_MAX_OUTPUT_BYTES,
                &[],
                d.max_output_bytes as u64,
            ) as usize,
            python: env_or(exec_keys::SKILL_MCP_PYTHON, &[], || d.python),
            dependency_runner: env_or(exec_keys::SKILL_MCP_UV, &[], || d.dependency_runner),
            node: env_or(exec_keys::SKILL_MCP_NODE, &[], || d.node),
            npm: env_or(exec_keys::SKILL_MCP_NPM, &[], || d.npm),
            shell: env_or(exec_keys::SKILL_MCP_SHELL, &[], || d.shell),
        }
    }
}

/// Observability: quiet, log_level, log_json, history_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    /// JSONL file receiving one record per script execution
    pub history_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| Self {
            quiet: env_bool(obv_keys::SKILL_MCP_QUIET, &[], false),
            log_level: env_or(obv_keys::SKILL_MCP_LOG_LEVEL, &[], || {
                "skill_mcp=info".to_string()
            }),
            log_json: env_bool(obv_keys::SKILL_MCP_LOG_JSON, &[], false),
            history_log: env_optional(obv_keys::SKILL_MCP_HISTORY_LOG, &[]),
        })
    }
}
