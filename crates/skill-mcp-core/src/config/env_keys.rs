//! Environment variable keys and their aliases.
//!
//! Primary keys use the `SKILL_MCP_*` prefix.

/// Skills root directory
pub mod paths {
    pub const SKILL_MCP_DIR: &str = "SKILL_MCP_DIR";
    pub const SKILLS_DIR_ALIASES: &[&str] = &["SKILLS_DIR"];
}

/// Script execution limits and interpreters
pub mod execution {
    pub const SKILL_MCP_TIMEOUT_SECS: &str = "SKILL_MCP_TIMEOUT_SECS";
    pub const SKILL_MCP_MAX_OUTPUT_BYTES: &str = "SKILL_MCP_MAX_OUTPUT_BYTES";
    pub const SKILL_MCP_PYTHON: &str = "SKILL_MCP_PYTHON";
    pub const SKILL_MCP_UV: &str = "SKILL_MCP_UV";
    pub const SKILL_MCP_NODE: &str = "SKILL_MCP_NODE";
    pub const SKILL_MCP_NPM: &str = "SKILL_MCP_NPM";
    pub const SKILL_MCP_SHELL: &str = "SKILL_MCP_SHELL";
}

/// Logging and execution history
pub mod observability {
    pub const SKILL_MCP_QUIET: &str = "SKILL_MCP_QUIET";
    pub const SKILL_MCP_LOG_LEVEL: &str = "SKILL_MCP_LOG_LEVEL";
    pub const SKILL_MCP_LOG_JSON: &str = "SKILL_MCP_LOG_JSON";
    pub const SKILL_MCP_HISTORY_LOG: &str = "SKILL_MCP_HISTORY_LOG";
}

/// Variable that receives skill directories for cross-skill imports.
pub const SEARCH_PATH_VAR: &str = "PYTHONPATH";
