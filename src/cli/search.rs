use anyhow::Result;

use codeindex::mcp::tools::format_search;
use codeindex::{ComponentKind, QueryEngine, Workspace};

/// One-shot search; builds the index first when there is no snapshot
pub fn search_project(project: String, query: String, kind: Option<String>, limit: Option<usize>) -> Result<()> {
    let kind = kind.as_deref().map(str::parse::<ComponentKind>).transpose()?;

    let workspace = Workspace::open(&project)?;
    let limit = workspace.config().effective_limit(limit);
    let index = workspace.index()?;

    let hits = QueryEngine::new(&index).search(&query, kind, limit);
    println!("{}", format_search(&query, &hits));
    Ok(())
}
