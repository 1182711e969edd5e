// MCP server implementation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::mcp::tools;
use crate::workspace::Workspace;

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC request or notification
#[derive(Debug, Deserialize)]
struct JsonRpcMessage {
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// MCP server capabilities
#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: Value,
}

/// MCP server info
#[derive(Debug, Serialize)]
struct ServerInfo {
    name: String,
    version: String,
}

/// MCP initialize result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: String,
    capabilities: ServerCapabilities,
    server_info: ServerInfo,
}

fn success(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn failure(id: Value, error: JsonRpcError) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

/// MCP server speaking newline-delimited JSON-RPC 2.0 on stdio
pub struct McpServer {
    workspace: Arc<Workspace>,
}

impl McpServer {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace: Arc::new(workspace),
        }
    }

    /// Serve requests until stdin closes
    pub async fn run(self) -> Result<()> {
        info!("Starting MCP server for {}", self.workspace.root().display());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!("Received: {}", line);

            if let Some(response) = self.handle_message(&line).await {
                let encoded = serde_json::to_string(&response)?;
                debug!("Sending: {}", encoded);
                stdout.write_all(encoded.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        info!("Input closed, MCP server stopping");
        Ok(())
    }

    /// Handle one JSON-RPC message. Notifications produce no response.
    pub async fn handle_message(&self, message: &str) -> Option<Value> {
        let msg: JsonRpcMessage = match serde_json::from_str(message) {
            Ok(msg) => msg,
            Err(e) => {
                error!("Unparseable message: {}", e);
                return Some(failure(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ));
            }
        };

        let id = msg.id.clone();
        let method = match (msg.jsonrpc.as_str(), msg.method.as_deref()) {
            ("2.0", Some(method)) => method,
            _ => {
                return id.map(|id| failure(id, JsonRpcError::new(INVALID_REQUEST, "Invalid request")));
            }
        };

        let Some(id) = id else {
            debug!("Notification: {}", method);
            return None;
        };

        Some(match self.dispatch(method, msg.params).await {
            Ok(result) => success(id, result),
            Err(e) => failure(id, e),
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        match method {
            "initialize" => {
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: ServerCapabilities { tools: json!({}) },
                    server_info: ServerInfo {
                        name: env!("CARGO_PKG_NAME").to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    },
                };
                serde_json::to_value(result).map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::definitions() })),
            "tools/call" => self.call_tool(params).await,
            "shutdown" => {
                info!("Received shutdown request");
                Ok(Value::Null)
            }
            _ => Err(
                JsonRpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", method))
                    .with_data(json!({ "method": method })),
            ),
        }
    }

    /// Call a tool on the blocking pool; indexing may take a while.
    async fn call_tool(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params = params.unwrap_or(Value::Null);
        let name = params["name"]
            .as_str()
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing tool name"))?
            .to_string();
        let args = match params.get("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(args)) => args.clone(),
            Some(_) => {
                return Err(JsonRpcError::new(INVALID_PARAMS, "Tool arguments must be an object")
                    .with_data(json!({ "tool": name })))
            }
        };

        debug!("Calling tool {}", name);
        let workspace = Arc::clone(&self.workspace);
        tokio::task::spawn_blocking(move || tools::call(&workspace, &name, &args))
            .await
            .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Tool task failed: {}", e)))
    }
}
