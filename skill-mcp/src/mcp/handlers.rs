//! MCP request handlers: initialize, list_skills, run_skill_script,
//! execute_python_code, skill_env_crud.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use skill_mcp_sandbox::{ExecutionOutcome, ExecutionRequest, SkillReference};

use super::state::McpServer;

/// Handle the `initialize` request.
pub(super) fn handle_initialize(_params: &Value) -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {},
            "resources": {},
            "prompts": {}
        },
        "serverInfo": {
            "name": "skill-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

#[derive(Debug, Deserialize)]
struct RunSkillScriptArgs {
    skill_name: String,
    script_path: String,
    #[serde(default)]
    args: Option<Vec<String>>,
    #[serde(default)]
    working_dir: Option<String>,
    #[serde(default)]
    timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ExecutePythonCodeArgs {
    code: String,
    #[serde(default)]
    skill_references: Option<Vec<String>>,
    #[serde(default)]
    timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SkillEnvCrudArgs {
    operation: String,
    skill_name: String,
    #[serde(default)]
    variables: Option<BTreeMap<String, String>>,
    #[serde(default)]
    keys: Option<Vec<String>>,
}

fn parse_args<T: DeserializeOwned>(arguments: &Value) -> Result<T> {
    serde_json::from_value(arguments.clone()).map_err(|e| anyhow!("Invalid arguments: {}", e))
}

fn check_timeout(timeout: Option<u64>) -> Result<Option<u64>> {
    if timeout == Some(0) {
        bail!("timeout must be a positive integer");
    }
    Ok(timeout)
}

/// `{header}\nExit code: N\n\n` then the non-empty streams, or `(No output)`.
pub(crate) fn render_outcome(header: &str, outcome: &ExecutionOutcome) -> String {
    let mut out = format!("{}\nExit code: {}\n\n", header, outcome.exit_code);
    if !outcome.stdout.is_empty() {
        out.push_str(&format!("STDOUT:\n{}\n", outcome.stdout));
    }
    if !outcome.stderr.is_empty() {
        out.push_str(&format!("STDERR:\n{}\n", outcome.stderr));
    }
    if outcome.stdout.is_empty() && outcome.stderr.is_empty() {
        out.push_str("(No output)\n");
    }
    out
}

/// Handle the `list_skills` tool call.
pub(super) fn handle_list_skills(server: &McpServer) -> Result<String> {
    let skills = server.skills.list()?;
    if skills.is_empty() {
        return Ok(format!(
            "No skills found in {}",
            server.skills_dir().display()
        ));
    }
    let mut out = format!("Skills ({}):\n", skills.len());
    for skill in &skills {
        out.push_str(&format!("- {}", skill.name));
        if let Some(desc) = &skill.description {
            out.push_str(&format!(": {}", desc));
        }
        if skill.has_env_file {
            out.push_str(" [.env]");
        }
        out.push('\n');
    }
    Ok(out)
}

/// Handle the `run_skill_script` tool call.
pub(super) async fn handle_run_skill_script(server: &McpServer, arguments: &Value) -> Result<String> {
    let args: RunSkillScriptArgs = parse_args(arguments)?;
    let request = ExecutionRequest::script(&args.skill_name, &args.script_path)
        .with_args(args.args.unwrap_or_default())
        .with_working_dir(args.working_dir)
        .with_timeout(check_timeout(args.timeout)?);

    let outcome = server.engine.execute(&request).await?;
    server
        .record_execution(&args.skill_name, &args.script_path, outcome.succeeded())
        .await;

    let header = format!("Script: {}/{}", args.skill_name, args.script_path);
    Ok(render_outcome(&header, &outcome))
}

/// Handle the `execute_python_code` tool call.
pub(super) async fn handle_execute_python_code(server: &McpServer, arguments: &Value) -> Result<String> {
    let args: ExecutePythonCodeArgs = parse_args(arguments)?;
    let references = args
        .skill_references
        .unwrap_or_default()
        .iter()
        .map(|r| r.parse::<SkillReference>())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let request = ExecutionRequest::inline(args.code)
        .with_references(references)
        .with_timeout(check_timeout(args.timeout)?);

    let outcome = server.engine.execute(&request).await?;
    Ok(render_outcome("Python Code Execution", &outcome))
}

/// Handle the `skill_env_crud` tool call. Values are never echoed back.
pub(super) fn handle_skill_env_crud(server: &McpServer, arguments: &Value) -> Result<String> {
    let args: SkillEnvCrudArgs = parse_args(arguments)?;
    let skill = args.skill_name.as_str();
    let store = &server.env_store;

    match args.operation.as_str() {
        "read" => {
            let keys = store.keys(skill)?;
            if keys.is_empty() {
                return Ok(format!("No environment variables set for skill '{}'", skill));
            }
            let mut out = format!("Environment variables for skill '{}' ({}):\n", skill, keys.len());
            for key in &keys {
                out.push_str(&format!("  - {}\n", key));
            }
            out.push_str("\nNote: Values are hidden for security.");
            Ok(out)
        }
        "set" => {
            let variables = args.variables.filter(|v| !v.is_empty()).ok_or_else(|| {
                anyhow!("variables is required for 'set' operation")
            })?;
            store.set_variables(skill, &variables)?;
            tracing::info!(skill = %skill, names = ?variables.keys().collect::<Vec<_>>(), "Set skill variables");
            Ok(format!(
                "Successfully set {} environment variable(s) for skill '{}'",
                variables.len(),
                skill
            ))
        }
        "delete" => {
            let keys = args
                .keys
                .filter(|k| !k.is_empty())
                .ok_or_else(|| anyhow!("keys is required for 'delete' operation"))?;
            let deleted = store.delete_variables(skill, &keys)?;
            Ok(if deleted == keys.len() {
                format!(
                    "Successfully deleted {} environment variable(s) from skill '{}'",
                    deleted, skill
                )
            } else if deleted == 0 {
                format!(
                    "No variables deleted from skill '{}' (variables did not exist)",
                    skill
                )
            } else {
                format!(
                    "Deleted {} of {} environment variable(s) from skill '{}' ({} did not exist)",
                    deleted,
                    keys.len(),
                    skill,
                    keys.len() - deleted
                )
            })
        }
        "clear" => {
            store.clear(skill)?;
            Ok(format!(
                "Successfully cleared all environment variables for skill '{}'",
                skill
            ))
        }
        other => bail!(
            "Unknown operation: {}. Valid operations: read, set, delete, clear",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(code: i32, stdout: &str, stderr: &str) -> ExecutionOutcome {
        ExecutionOutcome {
            exit_code: code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_render_both_streams() {
        let text = render_outcome("Script: demo/main.py", &outcome(1, "out", "err"));
        assert_eq!(
            text,
            "Script: demo/main.py\nExit code: 1\n\nSTDOUT:\nout\nSTDERR:\nerr\n"
        );
    }

    #[test]
    fn test_render_no_output() {
        let text = render_outcome("Python Code Execution", &outcome(0, "", ""));
        assert_eq!(text, "Python Code Execution\nExit code: 0\n\n(No output)\n");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(check_timeout(Some(0)).is_err());
        assert_eq!(check_timeout(Some(5)).unwrap(), Some(5));
        assert_eq!(check_timeout(None).unwrap(), None);
    }
}
