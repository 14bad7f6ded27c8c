//! MCP (Model Context Protocol) server.
//!
//! Implements the MCP JSON-RPC 2.0 over stdio protocol.
//! Provides 4 tools: list_skills, run_skill_script, execute_python_code,
//! skill_env_crud.
//!
//! Protocol flow:
//!   1. Client sends `initialize` → Server returns capabilities
//!   2. Client sends `notifications/initialized`
//!   3. Client sends `tools/list` → Server returns the tool definitions
//!   4. Client sends `tools/call` → Server runs the tool, returns text content
//!
//! Each request is handled on its own task; responses go through a single
//! writer task, so a long script run does not hold up `ping` or `tools/list`.
//! Responses may therefore arrive out of request order.

mod handlers;
mod state;
mod tools;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

pub use state::{McpServer, ToolResponse};

use handlers::handle_initialize;
use tools::get_mcp_tools;

/// Maximum JSON-RPC request size (10 MB).
const MAX_REQUEST_SIZE: usize = 10 * 1024 * 1024;

/// Read a single line from `reader`, enforcing `limit` bytes.
/// Returns `Ok(None)` on EOF, `Ok(Some(line))` on success.
/// Oversized lines are skipped (bytes discarded) and an error is returned.
async fn read_line_limited<R>(reader: &mut R, limit: usize) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return if buf.is_empty() {
                Ok(None)
            } else {
                into_line(buf).map(Some)
            };
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                if buf.len() + pos > limit {
                    reader.consume(pos + 1);
                    return Err(too_large(limit));
                }
                buf.extend_from_slice(&available[..pos]);
                reader.consume(pos + 1);
                return into_line(buf).map(Some);
            }
            None => {
                let len = available.len();
                if buf.len() + len > limit {
                    reader.consume(len);
                    skip_until_newline(reader).await;
                    return Err(too_large(limit));
                }
                buf.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
}

fn into_line(mut buf: Vec<u8>) -> io::Result<String> {
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid UTF-8"))
}

fn too_large(limit: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Request exceeds {} byte size limit", limit),
    )
}

/// Discard bytes from `reader` until a newline or EOF.
async fn skip_until_newline<R>(reader: &mut R)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match reader.fill_buf().await {
            Ok(b) if b.is_empty() => break,
            Ok(b) => {
                if let Some(pos) = b.iter().position(|&c| c == b'\n') {
                    reader.consume(pos + 1);
                    break;
                }
                let len = b.len();
                reader.consume(len);
            }
            Err(_) => break,
        }
    }
}

/// Run the MCP server over stdio until stdin closes.
///
/// This is the entry point for `skill-mcp serve`.
pub async fn serve_mcp_stdio(server: McpServer) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    serve(server, reader, tokio::io::stdout()).await?;
    Ok(())
}

/// Serve JSON-RPC lines from `reader`, writing one response line per request
/// to `writer`. Returns the writer once input is exhausted and every
/// in-flight request has answered.
pub async fn serve<R, W>(server: McpServer, mut reader: R, writer: W) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let server = Arc::new(server);
    let (tx, rx) = mpsc::unbounded_channel::<Value>();
    let writer_task = tokio::spawn(write_responses(rx, writer));

    loop {
        let line = match read_line_limited(&mut reader, MAX_REQUEST_SIZE).await {
            Ok(None) => break, // EOF
            Ok(Some(l)) => l,
            Err(e) => {
                let _ = tx.send(error_response(
                    Value::Null,
                    -32600,
                    format!("Request size error: {}", e),
                ));
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                let _ = tx.send(error_response(
                    Value::Null,
                    -32700,
                    format!("Parse error: {}", e),
                ));
                continue;
            }
        };

        let server = Arc::clone(&server);
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(resp) = dispatch(&server, request).await {
                let _ = tx.send(resp);
            }
        });
    }

    drop(tx);
    let writer = writer_task.await??;
    Ok(writer)
}

async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<Value>, mut writer: W) -> io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(resp) = rx.recv().await {
        let mut line = resp.to_string();
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(writer)
}

/// Handle one request. `None` for notifications, which get no response.
async fn dispatch(server: &McpServer, request: Value) -> Option<Value> {
    let id = request.get("id").cloned();
    let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
    let params = request.get("params").cloned().unwrap_or(json!({}));

    let result = match method {
        // ─── Lifecycle ──────────────────────────────────────────────
        "initialize" => handle_initialize(&params),
        "notifications/initialized" | "initialized" => return None,
        "ping" => json!({}),

        // ─── Tools ─────────────────────────────────────────────────
        "tools/list" => json!({ "tools": get_mcp_tools() }),
        "tools/call" => {
            let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
            let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
            tracing::debug!(tool = %tool_name, "tools/call");
            server.call_tool(tool_name, &arguments).await.to_json()
        }

        // ─── Resources / Prompts (not implemented) ──────────────────
        "resources/list" => json!({"resources": []}),
        "prompts/list" => json!({"prompts": []}),

        // ─── Unknown ────────────────────────────────────────────────
        _ => {
            // Notifications (no id) get no response
            let id = id?;
            return Some(error_response(
                id,
                -32601,
                format!("Method not found: {}", method),
            ));
        }
    };

    Some(json!({
        "jsonrpc": "2.0",
        "id": id.unwrap_or(Value::Null),
        "result": result
    }))
}

fn error_response(id: Value, code: i64, message: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": code, "message": message}
    })
}
