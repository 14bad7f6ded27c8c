//! Tool-level behaviour of the MCP server, end to end through `call_tool`
//! and the JSON-RPC loop.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::{json, Value};
use skill_mcp::{serve, McpServer};
use skill_mcp_core::observability::JsonlHistory;
use skill_mcp_core::skill::DotEnvStore;
use skill_mcp_sandbox::ExecutionEngine;

fn has_program(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

fn skills_fixture() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let weather = tmp.path().join("weather");
    fs::create_dir_all(weather.join("scripts")).unwrap();
    fs::write(
        weather.join("SKILL.md"),
        "---\nname: weather\ndescription: Weather lookups\n---\n\n# Weather\n",
    )
    .unwrap();
    fs::write(weather.join(".env"), "API_KEY=secret-value\n").unwrap();
    fs::write(
        weather.join("scripts/report.sh"),
        "echo \"key=${API_KEY} city=$1\"\n",
    )
    .unwrap();
    fs::write(weather.join("scripts/quiet.sh"), "exit 0\n").unwrap();
    fs::create_dir_all(tmp.path().join("demo-skill")).unwrap();
    tmp
}

fn server(root: &Path) -> McpServer {
    McpServer::with_skills_dir(root)
}

#[tokio::test]
async fn list_skills_shows_frontmatter() {
    let tmp = skills_fixture();
    let resp = server(tmp.path()).call_tool("list_skills", &json!({})).await;
    assert!(!resp.is_error);
    assert!(resp.text.starts_with("Skills (2):\n"));
    assert!(resp.text.contains("- weather: Weather lookups [.env]\n"));
    assert!(resp.text.contains("- demo-skill\n"));
}

#[tokio::test]
async fn missing_script_is_reported_as_error_text() {
    let tmp = skills_fixture();
    let resp = server(tmp.path())
        .call_tool(
            "run_skill_script",
            &json!({"skill_name": "demo-skill", "script_path": "scripts/nonexistent.py"}),
        )
        .await;
    assert!(resp.is_error);
    assert_eq!(
        resp.text,
        "Error: Script 'scripts/nonexistent.py' does not exist in skill 'demo-skill'"
    );
}

#[tokio::test]
async fn run_skill_script_renders_outcome() {
    if !has_program("bash") {
        eprintln!("bash not available; skipping");
        return;
    }
    let tmp = skills_fixture();
    let srv = server(tmp.path());
    let resp = srv
        .call_tool(
            "run_skill_script",
            &json!({
                "skill_name": "weather",
                "script_path": "scripts/report.sh",
                "args": ["London"],
                "timeout": 10
            }),
        )
        .await;
    assert!(!resp.is_error, "{}", resp.text);
    assert_eq!(
        resp.text,
        "Script: weather/scripts/report.sh\nExit code: 0\n\nSTDOUT:\nkey=secret-value city=London\n\n"
    );

    let resp = srv
        .call_tool(
            "run_skill_script",
            &json!({"skill_name": "weather", "script_path": "scripts/quiet.sh", "args": null}),
        )
        .await;
    assert!(resp.text.ends_with("Exit code: 0\n\n(No output)\n"));
}

#[tokio::test]
async fn run_skill_script_appends_history() {
    if !has_program("bash") {
        eprintln!("bash not available; skipping");
        return;
    }
    let tmp = skills_fixture();
    let log_dir = tempfile::tempdir().unwrap();
    let log = log_dir.path().join("logs/history.jsonl");
    let store = std::sync::Arc::new(DotEnvStore::new(tmp.path()));
    let srv = McpServer::new(
        ExecutionEngine::new(tmp.path(), store),
        Box::new(JsonlHistory::new(&log)),
    );
    let resp = srv
        .call_tool(
            "run_skill_script",
            &json!({"skill_name": "weather", "script_path": "scripts/quiet.sh"}),
        )
        .await;
    assert!(!resp.is_error, "{}", resp.text);

    let content = fs::read_to_string(&log).unwrap();
    let record: Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(record["event"], "script_executed");
    assert_eq!(record["skill"], "weather");
    assert_eq!(record["script"], "scripts/quiet.sh");
    assert_eq!(record["success"], true);
}

#[tokio::test]
async fn path_escape_is_rejected() {
    let tmp = skills_fixture();
    let resp = server(tmp.path())
        .call_tool(
            "run_skill_script",
            &json!({"skill_name": "demo-skill", "script_path": "../weather/scripts/report.sh"}),
        )
        .await;
    assert!(resp.is_error);
    assert!(resp.text.starts_with("Error: Invalid script path"));
}

#[tokio::test]
async fn argument_validation() {
    let tmp = skills_fixture();
    let srv = server(tmp.path());

    let resp = srv
        .call_tool("execute_python_code", &json!({"code": "print(1)", "timeout": 0}))
        .await;
    assert_eq!(resp.text, "Error: timeout must be a positive integer");

    let resp = srv
        .call_tool(
            "execute_python_code",
            &json!({"code": "print(1)", "skill_references": ["weather"]}),
        )
        .await;
    assert_eq!(
        resp.text,
        "Error: Invalid skill reference format: 'weather'. Expected 'skill_name:path/to/file.py'"
    );

    let resp = srv
        .call_tool(
            "execute_python_code",
            &json!({"code": "print(1)", "skill_references": ["ghost:lib.py"]}),
        )
        .await;
    assert_eq!(resp.text, "Error: Skill 'ghost' does not exist");

    let resp = srv.call_tool("run_skill_script", &json!({"skill_name": "weather"})).await;
    assert!(resp.is_error);
    assert!(resp.text.starts_with("Error: Invalid arguments"));

    let resp = srv.call_tool("no_such_tool", &json!({})).await;
    assert_eq!(resp.text, "Error: Unknown tool: no_such_tool");
}

#[tokio::test]
async fn execute_python_code_prints() {
    if !has_program("python3") {
        eprintln!("python3 not available; skipping");
        return;
    }
    let tmp = skills_fixture();
    let resp = server(tmp.path())
        .call_tool("execute_python_code", &json!({"code": "print('done')"}))
        .await;
    assert!(!resp.is_error, "{}", resp.text);
    assert_eq!(
        resp.text,
        "Python Code Execution\nExit code: 0\n\nSTDOUT:\ndone\n\n"
    );
}

#[tokio::test]
async fn skill_env_crud_never_returns_values() {
    let tmp = skills_fixture();
    let srv = server(tmp.path());

    let resp = srv
        .call_tool(
            "skill_env_crud",
            &json!({
                "operation": "set",
                "skill_name": "weather",
                "variables": {"REGION": "eu-west", "UNITS": "metric"}
            }),
        )
        .await;
    assert_eq!(
        resp.text,
        "Successfully set 2 environment variable(s) for skill 'weather'"
    );

    let resp = srv
        .call_tool(
            "skill_env_crud",
            &json!({"operation": "read", "skill_name": "weather"}),
        )
        .await;
    assert!(resp.text.starts_with("Environment variables for skill 'weather' (3):\n"));
    assert!(resp.text.contains("  - API_KEY\n"));
    assert!(!resp.text.contains("secret-value"));
    assert!(!resp.text.contains("eu-west"));

    let resp = srv
        .call_tool(
            "skill_env_crud",
            &json!({"operation": "delete", "skill_name": "weather", "keys": ["REGION", "MISSING"]}),
        )
        .await;
    assert_eq!(
        resp.text,
        "Deleted 1 of 2 environment variable(s) from skill 'weather' (1 did not exist)"
    );

    let resp = srv
        .call_tool(
            "skill_env_crud",
            &json!({"operation": "clear", "skill_name": "weather"}),
        )
        .await;
    assert!(!resp.is_error);
    let resp = srv
        .call_tool(
            "skill_env_crud",
            &json!({"operation": "read", "skill_name": "weather"}),
        )
        .await;
    assert_eq!(resp.text, "No environment variables set for skill 'weather'");

    let resp = srv
        .call_tool(
            "skill_env_crud",
            &json!({"operation": "read", "skill_name": "ghost"}),
        )
        .await;
    assert_eq!(resp.text, "Error: Skill 'ghost' does not exist");

    let resp = srv
        .call_tool(
            "skill_env_crud",
            &json!({"operation": "set", "skill_name": "weather"}),
        )
        .await;
    assert_eq!(resp.text, "Error: variables is required for 'set' operation");

    let resp = srv
        .call_tool(
            "skill_env_crud",
            &json!({
                "operation": "set",
                "skill_name": "weather",
                "variables": {"TOKEN": "abc\nINJECTED=pwned"}
            }),
        )
        .await;
    assert!(resp.is_error);
    assert_eq!(
        resp.text,
        "Error: Invalid environment variable: value of 'TOKEN' must be a single line"
    );
}

#[tokio::test]
async fn json_rpc_loop_answers_every_request() {
    let tmp = skills_fixture();
    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}).to_string(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        "{not json".to_string(),
        String::new(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}).to_string(),
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "list_skills", "arguments": {}}
        })
        .to_string(),
    ]
    .join("\n");

    let reader = tokio::io::BufReader::new(input.as_bytes());
    let out = serve(server(tmp.path()), reader, Vec::new()).await.unwrap();
    let lines: Vec<Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);

    let by_id: HashMap<String, &Value> = lines.iter().map(|v| (v["id"].to_string(), v)).collect();
    assert_eq!(by_id["null"]["error"]["code"], -32700);
    assert_eq!(by_id["1"]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(by_id["2"]["result"], json!({}));
    assert_eq!(by_id["3"]["result"]["isError"], false);
    assert!(by_id["3"]["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("weather"));
}
