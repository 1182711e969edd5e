// MCP tool handlers

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::IndexError;
use crate::index::{Component, ComponentKind};
use crate::query::{FileOverview, Lookup, QueryEngine, SearchHit};
use crate::workspace::Workspace;

const LIST_LIMIT: usize = 50;
const EXPLAIN_PER_KIND: usize = 20;
const EXPLAIN_IMPORTS: usize = 10;
const DETAIL_IMPORTS: usize = 5;
const SEARCH_SUMMARY_CHARS: usize = 150;
const CANDIDATE_SUMMARY_CHARS: usize = 100;

pub const TOOL_NAMES: [&str; 7] = [
    "search_code",
    "find_route",
    "find_model",
    "find_table",
    "list_components",
    "explain_file",
    "rebuild_index",
];

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RouteArgs {
    route: String,
}

#[derive(Debug, Deserialize)]
struct ModelArgs {
    model_name: String,
}

#[derive(Debug, Deserialize)]
struct TableArgs {
    table_name: String,
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    component_type: String,
}

#[derive(Debug, Deserialize)]
struct ExplainArgs {
    filepath: String,
}

/// Tool definitions advertised by `tools/list`.
pub fn definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "search_code",
            "description": "Search the codebase for functions, classes, routes, models, tables, or documentation. \
                Covers Python code, SQL schema files and Markdown documentation (titles and full content).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query (function name, class name, concept, documentation topic, etc.)"
                    },
                    "type": {
                        "type": "string",
                        "enum": ["function", "class", "route", "model", "table", "file"],
                        "description": "Filter by component type. Use 'file' for Markdown docs"
                    },
                    "limit": {
                        "type": "integer",
                        "default": 10,
                        "description": "Maximum number of results"
                    }
                },
                "required": ["query"]
            }
        }),
        json!({
            "name": "find_route",
            "description": "Find a web route by path or handler name.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "route": {
                        "type": "string",
                        "description": "Route path (e.g. '/voters') or handler function name"
                    }
                },
                "required": ["route"]
            }
        }),
        json!({
            "name": "find_model",
            "description": "Find a database model class by name.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "model_name": {
                        "type": "string",
                        "description": "Name of the model class (e.g. 'User')"
                    }
                },
                "required": ["model_name"]
            }
        }),
        json!({
            "name": "find_table",
            "description": "Find a database table by name and its SQL definition.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the database table (e.g. 'voters')"
                    }
                },
                "required": ["table_name"]
            }
        }),
        json!({
            "name": "list_components",
            "description": "List all components of one type: routes, models, tables or classes.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "component_type": {
                        "type": "string",
                        "enum": ["route", "model", "table", "class"],
                        "description": "Type of component to list"
                    }
                },
                "required": ["component_type"]
            }
        }),
        json!({
            "name": "explain_file",
            "description": "Describe one file: its summary, the components it declares and its imports.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "filepath": {
                        "type": "string",
                        "description": "Path relative to the project root (e.g. 'app/models.py')"
                    }
                },
                "required": ["filepath"]
            }
        }),
        json!({
            "name": "rebuild_index",
            "description": "Rebuild the index from scratch. Use after significant code changes.",
            "inputSchema": {
                "type": "object",
                "properties": {}
            }
        }),
    ]
}

/// Run a tool and wrap its text in an MCP tool result. Failures become
/// results flagged with `isError` rather than protocol errors.
pub fn call(workspace: &Workspace, name: &str, args: &Map<String, Value>) -> Value {
    match run(workspace, name, args) {
        Ok(text) => json!({
            "content": [{ "type": "text", "text": text }]
        }),
        Err(e) => {
            let index_error = e.downcast_ref::<IndexError>();
            if index_error.is_some_and(IndexError::is_validation) {
                debug!("Tool {} rejected arguments: {:#}", name, e);
            } else {
                warn!("Tool {} failed: {:#}", name, e);
            }

            let mut text = format!("Error: {:#}", e);
            if index_error.is_some_and(IndexError::is_unavailable) {
                text.push_str("\nRun rebuild_index to rebuild the index.");
            }
            json!({
                "content": [{ "type": "text", "text": text }],
                "isError": true
            })
        }
    }
}

fn run(workspace: &Workspace, name: &str, args: &Map<String, Value>) -> Result<String> {
    match name {
        "search_code" => search_code(workspace, parse_args(name, args)?),
        "find_route" => find_route(workspace, parse_args(name, args)?),
        "find_model" => find_model(workspace, parse_args(name, args)?),
        "find_table" => find_table(workspace, parse_args(name, args)?),
        "list_components" => list_components(workspace, parse_args(name, args)?),
        "explain_file" => explain_file(workspace, parse_args(name, args)?),
        "rebuild_index" => rebuild_index(workspace),
        _ => Err(anyhow!("Unknown tool: {}", name)),
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| anyhow!("invalid arguments for {}: {}", tool, e))
}

fn search_code(workspace: &Workspace, args: SearchArgs) -> Result<String> {
    let kind = args.kind.as_deref().map(str::parse::<ComponentKind>).transpose()?;
    let limit = workspace.config().effective_limit(args.limit);

    let index = workspace.index()?;
    let hits = QueryEngine::new(&index).search(&args.query, kind, limit);
    Ok(format_search(&args.query, &hits))
}

fn find_route(workspace: &Workspace, args: RouteArgs) -> Result<String> {
    let index = workspace.index()?;
    let text = match QueryEngine::new(&index).find_route(&args.route) {
        Lookup::Exact(component) => format_component(component),
        Lookup::Candidates(hits) if hits.is_empty() => format!("No route found for '{}'", args.route),
        Lookup::Candidates(hits) => {
            let mut out = vec![format!("🌐 Found {} route(s):\n", hits.len())];
            for (i, hit) in hits.iter().enumerate() {
                let c = hit.component;
                out.push(format!(
                    "\n{}. `{}` → `{}`",
                    i + 1,
                    c.name,
                    c.attributes.route_path().unwrap_or("N/A")
                ));
                out.push(format!("   📄 `{}:{}`", c.source_path, c.line_start));
                if !c.summary.is_empty() {
                    out.push(format!("   📝 {}", truncate(&c.summary, CANDIDATE_SUMMARY_CHARS)));
                }
            }
            out.join("\n")
        }
    };
    Ok(text)
}

fn find_model(workspace: &Workspace, args: ModelArgs) -> Result<String> {
    let index = workspace.index()?;
    let text = match QueryEngine::new(&index).find_model(&args.model_name) {
        Lookup::Exact(component) => format_component(component),
        Lookup::Candidates(hits) if hits.is_empty() => {
            format!("No model found for '{}'", args.model_name)
        }
        Lookup::Candidates(hits) => {
            let mut out = vec![format!("🗄️  Found {} model(s):\n", hits.len())];
            for (i, hit) in hits.iter().enumerate() {
                let c = hit.component;
                out.push(format!("\n{}. **{}**", i + 1, c.name));
                out.push(format!("   📄 `{}:{}`", c.source_path, c.line_start));
                let bases = c.attributes.bases();
                if !bases.is_empty() {
                    out.push(format!("   🧬 Inherits: {}", backticked(bases.iter())));
                }
                if !c.summary.is_empty() {
                    out.push(format!("   📝 {}", truncate(&c.summary, CANDIDATE_SUMMARY_CHARS)));
                }
            }
            out.join("\n")
        }
    };
    Ok(text)
}

fn find_table(workspace: &Workspace, args: TableArgs) -> Result<String> {
    let index = workspace.index()?;
    let text = match QueryEngine::new(&index).find_table(&args.table_name) {
        Lookup::Exact(component) => format_component(component),
        Lookup::Candidates(hits) if hits.is_empty() => {
            format!("No table found for '{}'", args.table_name)
        }
        Lookup::Candidates(hits) => {
            let mut out = vec![format!("📊 Found {} table(s):\n", hits.len())];
            for (i, hit) in hits.iter().enumerate() {
                let c = hit.component;
                out.push(format!("\n{}. **{}**", i + 1, c.name));
                out.push(format!("   📄 `{}:{}-{}`", c.source_path, c.line_start, c.line_end));
            }
            out.join("\n")
        }
    };
    Ok(text)
}

fn list_components(workspace: &Workspace, args: ListArgs) -> Result<String> {
    let kind: ComponentKind = args.component_type.parse()?;
    let index = workspace.index()?;
    let mut items = QueryEngine::new(&index).list_components(kind)?;
    items.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = vec![format!("📋 {} {}(s) in codebase:\n", items.len(), kind)];
    for item in items.iter().take(LIST_LIMIT) {
        out.push(format!("\n• `{}` → `{}:{}`", item.name, item.source_path, item.line_start));
        if let Some(route_path) = item.attributes.route_path() {
            out.push(format!("  Route: `{}`", route_path));
        }
    }
    if items.len() > LIST_LIMIT {
        out.push(format!(
            "\n\n... and {} more. Use search_code to find specific ones.",
            items.len() - LIST_LIMIT
        ));
    }
    Ok(out.join("\n"))
}

fn explain_file(workspace: &Workspace, args: ExplainArgs) -> Result<String> {
    let index = workspace.index()?;
    Ok(match QueryEngine::new(&index).explain_file(&args.filepath) {
        Some(overview) => format_overview(&overview),
        None => format!("File not found: {}", args.filepath),
    })
}

fn rebuild_index(workspace: &Workspace) -> Result<String> {
    let report = workspace.rebuild()?;
    let stats = report.stats;
    let mut text = format!(
        "✅ Index rebuilt successfully!\n\n\
         • {} components indexed\n\
         • {} files\n\
         • {} routes\n\
         • {} models\n\
         • {} tables",
        stats.total_components, stats.files_indexed, stats.routes, stats.models, stats.tables
    );
    if !report.errors.is_empty() {
        text.push_str(&format!("\n• {} files skipped:", report.errors.len()));
        for error in &report.errors {
            text.push_str(&format!("\n  - {}", error));
        }
    }
    Ok(text)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn backticked<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(|i| format!("`{}`", i)).collect::<Vec<_>>().join(", ")
}

pub fn format_search(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for '{}'", query);
    }

    let mut out = vec![format!("🔎 Found {} results for '{}':\n", hits.len(), query)];
    for (i, hit) in hits.iter().enumerate() {
        let c = hit.component;
        out.push(format!(
            "\n{}. **{}**: `{}`",
            i + 1,
            c.kind.as_str().to_uppercase(),
            c.name
        ));
        out.push(format!("   📄 `{}:{}-{}`", c.source_path, c.line_start, c.line_end));
        if !c.signature.is_empty() {
            out.push(format!("   🔧 `{}`", c.signature));
        }
        if !c.enclosing_type.is_empty() {
            out.push(format!("   👪 Class: `{}`", c.enclosing_type));
        }
        if !c.annotations.is_empty() {
            out.push(format!("   🎨 Decorators: {}", backticked(c.annotations.iter())));
        }
        if !c.summary.is_empty() {
            let mut summary = truncate(&c.summary, SEARCH_SUMMARY_CHARS);
            if c.summary.chars().count() > SEARCH_SUMMARY_CHARS {
                summary.push_str("...");
            }
            out.push(format!("   📝 {}", summary));
        }
        if let Some(route_path) = c.attributes.route_path() {
            out.push(format!("   🌐 Route: `{}`", route_path));
        }
    }
    out.join("\n")
}

pub fn format_component(c: &Component) -> String {
    let mut out = vec![
        format!("**{}**: `{}`\n", c.kind.as_str().to_uppercase(), c.name),
        format!("📄 `{}:{}-{}`\n", c.source_path, c.line_start, c.line_end),
    ];
    if !c.signature.is_empty() {
        out.push(format!("**Signature**: `{}`\n", c.signature));
    }
    if !c.enclosing_type.is_empty() {
        out.push(format!("**Class**: `{}`\n", c.enclosing_type));
    }
    if !c.annotations.is_empty() {
        out.push(format!("**Decorators**: {}\n", backticked(c.annotations.iter())));
    }
    if let Some(route_path) = c.attributes.route_path() {
        out.push(format!("**Route**: `{}`\n", route_path));
    }
    if !c.attributes.bases().is_empty() {
        out.push(format!("**Inherits**: {}\n", backticked(c.attributes.bases().iter())));
    }
    if !c.summary.is_empty() {
        out.push(format!("\n**Documentation**:\n{}\n", c.summary));
    }
    if !c.dependencies.is_empty() {
        let mut imports: Vec<&String> = c.dependencies.iter().collect();
        imports.sort();
        imports.dedup();
        out.push(format!(
            "\n**Key imports**: {}",
            backticked(imports.into_iter().take(DETAIL_IMPORTS))
        ));
    }
    out.join("\n")
}

pub fn format_overview(overview: &FileOverview) -> String {
    let mut out = vec![format!("📄 **{}**\n", overview.path)];

    if let Some(file) = overview.file.filter(|f| !f.summary.is_empty()) {
        out.push(format!("**Description**: {}\n", file.summary));
    }

    for (kind, items) in &overview.sections {
        out.push(format!(
            "\n**{}S** ({}):",
            kind.as_str().to_uppercase(),
            items.len()
        ));
        for item in items.iter().take(EXPLAIN_PER_KIND) {
            out.push(format!("• `{}` (line {})", item.name, item.line_start));
            if !item.signature.is_empty() {
                out.push(format!("  {}", item.signature));
            }
        }
    }

    if !overview.dependencies.is_empty() {
        out.push(format!(
            "\n**KEY IMPORTS**: {}",
            backticked(overview.dependencies.iter().take(EXPLAIN_IMPORTS))
        ));
        if overview.dependencies.len() > EXPLAIN_IMPORTS {
            out.push(format!(" ...and {} more", overview.dependencies.len() - EXPLAIN_IMPORTS));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn workspace() -> (TempDir, Workspace) {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app")).unwrap();
        std::fs::write(
            dir.path().join("app/views.py"),
            "\"\"\"Voter views.\"\"\"\nimport flask\n\n@app.route('/voters')\ndef list_voters(page):\n    \"\"\"All voters.\"\"\"\n    pass\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("app/models.py"),
            "class Voter(db.Model):\n    \"\"\"A registered voter.\"\"\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("schema.sql"), "CREATE TABLE voters (id INT);\n").unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        (dir, ws)
    }

    fn body(result: &Value) -> &str {
        result["content"][0]["text"].as_str().unwrap()
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let names: Vec<String> = definitions()
            .iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, TOOL_NAMES);
        assert!(definitions().iter().all(|d| d["inputSchema"]["type"] == "object"));
    }

    #[test]
    fn test_search_code() {
        let (_dir, ws) = workspace();
        let result = call(&ws, "search_code", &args(json!({ "query": "voters", "type": "table" })));
        assert!(result.get("isError").is_none());
        let text = body(&result);
        assert!(text.starts_with("🔎 Found 1 results for 'voters':"));
        assert!(text.contains("**TABLE**: `voters`"));
        assert!(text.contains("`schema.sql:1-1`"));
    }

    #[test]
    fn test_search_code_no_results() {
        let (_dir, ws) = workspace();
        let result = call(&ws, "search_code", &args(json!({ "query": "nothing-here" })));
        assert_eq!(body(&result), "No results found for 'nothing-here'");
    }

    #[test]
    fn test_invalid_kind_is_tool_error() {
        let (_dir, ws) = workspace();
        let result = call(&ws, "search_code", &args(json!({ "query": "x", "type": "method" })));
        assert_eq!(result["isError"], true);
        assert!(body(&result).contains("unknown component kind: method"));

        let result = call(&ws, "list_components", &args(json!({ "component_type": "function" })));
        assert_eq!(result["isError"], true);
    }

    #[test]
    fn test_missing_argument_is_tool_error() {
        let (_dir, ws) = workspace();
        let result = call(&ws, "find_table", &Map::new());
        assert_eq!(result["isError"], true);
        assert!(body(&result).contains("table_name"));
    }

    #[test]
    fn test_unknown_tool() {
        let (_dir, ws) = workspace();
        let result = call(&ws, "drop_tables", &Map::new());
        assert_eq!(result["isError"], true);
        assert_eq!(body(&result), "Error: Unknown tool: drop_tables");
    }

    #[test]
    fn test_find_route_exact_and_candidates() {
        let (_dir, ws) = workspace();

        let exact = call(&ws, "find_route", &args(json!({ "route": "/voters" })));
        let exact = body(&exact);
        assert!(exact.starts_with("**ROUTE**: `list_voters`"));
        assert!(exact.contains("**Route**: `/voters`"));
        assert!(exact.contains("**Signature**: `list_voters(page)`"));

        let candidates = call(&ws, "find_route", &args(json!({ "route": "list" })));
        assert!(body(&candidates).contains("1. `list_voters` → `/voters`"));

        let none = call(&ws, "find_route", &args(json!({ "route": "/absent" })));
        assert_eq!(body(&none), "No route found for '/absent'");
    }

    #[test]
    fn test_find_model_and_table() {
        let (_dir, ws) = workspace();

        let model = call(&ws, "find_model", &args(json!({ "model_name": "Voter" })));
        assert!(body(&model).contains("**Inherits**: `db.Model`"));

        let table = call(&ws, "find_table", &args(json!({ "table_name": "voters" })));
        assert!(body(&table).starts_with("**TABLE**: `voters`"));
    }

    #[test]
    fn test_list_components() {
        let (_dir, ws) = workspace();
        let result = call(&ws, "list_components", &args(json!({ "component_type": "route" })));
        let text = body(&result);
        assert!(text.starts_with("📋 1 route(s) in codebase:"));
        assert!(text.contains("• `list_voters` → `app/views.py:5`"));
        assert!(text.contains("Route: `/voters`"));
    }

    #[test]
    fn test_explain_file() {
        let (_dir, ws) = workspace();
        let result = call(&ws, "explain_file", &args(json!({ "filepath": "app/views.py" })));
        let text = body(&result);
        assert!(text.contains("**Description**: Voter views."));
        assert!(text.contains("**ROUTES** (1):"));
        assert!(text.contains("• `list_voters` (line 5)"));
        assert!(text.contains("**KEY IMPORTS**: `flask`"));

        let missing = call(&ws, "explain_file", &args(json!({ "filepath": "nope.py" })));
        assert_eq!(body(&missing), "File not found: nope.py");
    }

    #[test]
    fn test_rebuild_index() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("extra.sql"), "CREATE TABLE ballots (id INT);").unwrap();

        let result = call(&ws, "rebuild_index", &Map::new());
        let text = body(&result);
        assert!(text.starts_with("✅ Index rebuilt successfully!"));
        assert!(text.contains("• 4 files"));
        assert!(text.contains("• 2 tables"));
    }
}
