mod cli;

use std::io::Read;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use cli::{Cli, Commands};
use skill_mcp::{serve_mcp_stdio, McpServer, ToolResponse};
use skill_mcp_core::config::{self, ExecutionConfig, PathsConfig};
use skill_mcp_core::observability;

fn main() -> Result<ExitCode> {
    config::load_dotenv();
    observability::init_tracing();
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let paths = PathsConfig {
        skills_dir: cli
            .skills_dir
            .unwrap_or_else(|| PathsConfig::from_env().skills_dir),
    };
    let exec = ExecutionConfig::from_env();
    let server = McpServer::from_config(&paths, &exec);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            std::fs::create_dir_all(&paths.skills_dir).with_context(|| {
                format!("Failed to create skills directory {}", paths.skills_dir.display())
            })?;
            tracing::info!(skills_dir = %paths.skills_dir.display(), "Serving MCP over stdio");
            serve_mcp_stdio(server).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            skill_name,
            script_path,
            working_dir,
            timeout,
            args,
        } => {
            let arguments = json!({
                "skill_name": skill_name,
                "script_path": script_path,
                "args": args,
                "working_dir": working_dir,
                "timeout": timeout,
            });
            Ok(print_response(
                server.call_tool("run_skill_script", &arguments).await,
            ))
        }
        Commands::Exec {
            code,
            references,
            timeout,
        } => {
            let code = match code.as_deref() {
                None | Some("-") => {
                    let mut s = String::new();
                    std::io::stdin()
                        .read_to_string(&mut s)
                        .context("Failed to read code from stdin")?;
                    s
                }
                Some(c) => c.to_string(),
            };
            let arguments = json!({
                "code": code,
                "skill_references": references,
                "timeout": timeout,
            });
            Ok(print_response(
                server.call_tool("execute_python_code", &arguments).await,
            ))
        }
    }
}

fn print_response(resp: ToolResponse) -> ExitCode {
    if resp.is_error {
        eprintln!("{}", resp.text);
        ExitCode::FAILURE
    } else {
        print!("{}", resp.text);
        ExitCode::SUCCESS
    }
}
