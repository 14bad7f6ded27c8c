use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// skill-mcp - MCP server for managing skills and running their scripts
#[derive(Parser, Debug)]
#[command(name = "skill-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Skills root directory (default: SKILL_MCP_DIR, SKILLS_DIR or ~/.skill-mcp/skills)
    #[arg(long, global = true, env = "SKILL_MCP_DIR", value_name = "DIR")]
    pub skills_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve MCP over stdio (the default)
    Serve,

    /// Run a script inside a skill and print the result
    Run {
        /// Skill directory name
        #[arg(value_name = "SKILL")]
        skill_name: String,

        /// Script path relative to the skill directory
        #[arg(value_name = "SCRIPT_PATH")]
        script_path: String,

        /// Working directory relative to the skill root
        #[arg(long, value_name = "DIR")]
        working_dir: Option<String>,

        /// Execution timeout in seconds (default: from env or 30)
        #[arg(long)]
        timeout: Option<u64>,

        /// Script arguments, after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Execute Python code, optionally importing files from skills
    Exec {
        /// Code to run. Use "-" or omit to read from stdin
        #[arg(long)]
        code: Option<String>,

        /// Skill file to make importable, as skill_name:path/to/file.py (repeatable)
        #[arg(long = "ref", value_name = "SKILL:PATH")]
        references: Vec<String>,

        /// Execution timeout in seconds (default: from env or 30)
        #[arg(long)]
        timeout: Option<u64>,
    },
}
