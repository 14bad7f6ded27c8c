//! MCP server state shared by all in-flight requests.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use skill_mcp_core::config::{ExecutionConfig, PathsConfig};
use skill_mcp_core::observability::{history_from_env, ExecutionHistory, ExecutionRecord, NoopHistory};
use skill_mcp_core::skill::{DotEnvStore, SkillStore};
use skill_mcp_sandbox::ExecutionEngine;

use super::handlers::{
    handle_execute_python_code, handle_list_skills, handle_run_skill_script, handle_skill_env_crud,
};

/// Text result of one tool call. Errors are results too, flagged with `is_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn to_json(&self) -> Value {
        json!({
            "content": [{"type": "text", "text": self.text}],
            "isError": self.is_error
        })
    }
}

/// Immutable after construction; requests share it through an `Arc`.
pub struct McpServer {
    pub(super) skills: SkillStore,
    pub(super) env_store: DotEnvStore,
    pub(super) engine: ExecutionEngine,
    history: Arc<dyn ExecutionHistory>,
}

impl McpServer {
    pub fn new(engine: ExecutionEngine, history: Box<dyn ExecutionHistory>) -> Self {
        let root = engine.skills_root().to_path_buf();
        Self {
            skills: SkillStore::new(&root),
            env_store: DotEnvStore::new(&root),
            engine,
            history: Arc::from(history),
        }
    }

    /// Server configured from `SKILL_MCP_*` variables, with `paths` overriding
    /// the skills root.
    pub fn from_config(paths: &PathsConfig, exec: &ExecutionConfig) -> Self {
        Self::new(ExecutionEngine::from_config(paths, exec), history_from_env())
    }

    /// Server over `skills_dir` with default interpreters and limits and no
    /// history log.
    pub fn with_skills_dir(skills_dir: &Path) -> Self {
        let store = Arc::new(DotEnvStore::new(skills_dir));
        Self::new(ExecutionEngine::new(skills_dir, store), Box::new(NoopHistory))
    }

    pub fn skills_dir(&self) -> &Path {
        self.skills.root()
    }

    /// Run one tool. Never fails: errors come back as `Error: {message}`.
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> ToolResponse {
        let result = match name {
            "list_skills" => handle_list_skills(self),
            "run_skill_script" => handle_run_skill_script(self, arguments).await,
            "execute_python_code" => handle_execute_python_code(self, arguments).await,
            "skill_env_crud" => handle_skill_env_crud(self, arguments),
            _ => Err(anyhow::anyhow!("Unknown tool: {}", name)),
        };
        match result {
            Ok(text) => ToolResponse {
                text,
                is_error: false,
            },
            Err(e) => {
                tracing::debug!(tool = %name, "Tool failed: {}", e);
                ToolResponse {
                    text: format!("Error: {}", e),
                    is_error: true,
                }
            }
        }
    }

    /// Best-effort: a failing history sink is logged, never surfaced.
    /// Sinks do file I/O, so they run on the blocking pool.
    pub(super) async fn record_execution(&self, skill_name: &str, script_path: &str, success: bool) {
        let record = ExecutionRecord::now(skill_name, script_path, success);
        let history = Arc::clone(&self.history);
        match tokio::task::spawn_blocking(move || history.record(&record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to record script execution: {:#}", e),
            Err(e) => tracing::warn!("History recorder task failed: {}", e),
        }
    }
}
