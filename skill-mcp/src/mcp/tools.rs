//! MCP tool definitions for the 4 tools exposed by the server.

use serde_json::{json, Value};

/// Return the 4 MCP tool definitions.
pub(super) fn get_mcp_tools() -> Vec<Value> {
    vec![
        json!({
            "name": "list_skills",
            "description": "List all skills with their names and descriptions (from SKILL.md frontmatter) and whether they have a .env file.",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "required": []
            }
        }),
        json!({
            "name": "run_skill_script",
            "description": "Execute a script inside a skill directory. Python scripts with PEP 723 inline dependencies (# /// script) run via 'uv run'; .js/.mjs run with node (npm install first when package.json exists without node_modules); .sh run with bash; anything else is executed directly. The skill's .env variables are injected. Paths are relative to the skill directory. Returns the exit code, STDOUT and STDERR.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "skill_name": {
                        "type": "string",
                        "description": "Name of the skill directory (e.g. 'weather-skill')"
                    },
                    "script_path": {
                        "type": "string",
                        "description": "Script path relative to the skill directory (e.g. 'main.py', 'scripts/fetch.py')"
                    },
                    "args": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Command-line arguments for the script"
                    },
                    "working_dir": {
                        "type": "string",
                        "description": "Working directory relative to the skill root (defaults to the skill root)"
                    },
                    "timeout": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Timeout in seconds (default 30)"
                    }
                },
                "required": ["skill_name", "script_path"]
            }
        }),
        json!({
            "name": "execute_python_code",
            "description": "Execute Python code without creating a script file. Supports PEP 723 inline dependencies. skill_references ('skill_name:path/to/file.py') put each referenced skill directory on PYTHONPATH, load that skill's .env variables (later references win on conflicts) and merge the referenced file's inline dependencies into the code. Returns the exit code, STDOUT and STDERR.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Python code to execute (may include a PEP 723 block)"
                    },
                    "skill_references": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Skill files to make importable, e.g. [\"calculator:utils.py\"]"
                    },
                    "timeout": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Timeout in seconds (default 30)"
                    }
                },
                "required": ["code"]
            }
        }),
        json!({
            "name": "skill_env_crud",
            "description": "Manage a skill's .env variables. Operations: 'read' (variable names only, values are never returned), 'set' (merge 'variables'), 'delete' (remove 'keys'), 'clear'.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": ["read", "set", "delete", "clear"]
                    },
                    "skill_name": {
                        "type": "string",
                        "description": "Name of the skill"
                    },
                    "variables": {
                        "type": "object",
                        "additionalProperties": {"type": "string"},
                        "description": "Variables to set (for 'set')"
                    },
                    "keys": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Variable names to delete (for 'delete')"
                    }
                },
                "required": ["operation", "skill_name"]
            }
        }),
    ]
}
