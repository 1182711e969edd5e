use anyhow::Result;
use tracing::info;

use codeindex::mcp::McpServer;
use codeindex::Workspace;

/// Start MCP server with stdio transport
pub async fn serve_stdio(project: String) -> Result<()> {
    let workspace = Workspace::open(&project)?;
    info!(
        "MCP server (stdio) for {}, snapshot {}",
        workspace.root().display(),
        workspace.snapshot_path().display()
    );

    // The index is loaded or built on the first tool call
    McpServer::new(workspace).run().await
}
