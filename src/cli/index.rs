use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use codeindex::mcp::tools::format_search;
use codeindex::{ComponentKind, QueryEngine, Workspace};

pub fn index_project(
    project: String,
    output: Option<PathBuf>,
    search: Option<String>,
    kind: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    info!("Indexing project: {}", project);

    // Validate the kind before spending time on the build
    let kind = kind.as_deref().map(str::parse::<ComponentKind>).transpose()?;

    let mut workspace = Workspace::open(&project)?;
    if let Some(output) = output {
        workspace = workspace.with_snapshot_path(output);
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!("Indexing {}", workspace.root().display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = workspace.rebuild();
    spinner.finish_and_clear();
    let report = report?;

    let stats = report.stats;
    println!("Project: {}", workspace.root().display());
    println!("Snapshot: {}", workspace.snapshot_path().display());
    println!(
        "Indexed {} files ({} components) in {:.2?}",
        stats.files_indexed, stats.total_components, report.elapsed
    );
    println!("  Routes: {}", stats.routes);
    println!("  Models: {}", stats.models);
    println!("  Tables: {}", stats.tables);
    println!("  Classes: {}", stats.classes);
    println!("  Functions: {}", stats.functions);

    if !report.errors.is_empty() {
        println!("\nSkipped {} files:", report.errors.len());
        for error in &report.errors {
            println!("  - {}", error);
        }
    }

    if let Some(query) = search {
        let limit = workspace.config().effective_limit(limit);
        let index = workspace.index()?;
        let hits = QueryEngine::new(&index).search(&query, kind, limit);
        println!("\n{}", format_search(&query, &hits));
    }

    Ok(())
}
