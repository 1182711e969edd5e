use anyhow::Result;
use std::collections::BTreeMap;

use codeindex::index::snapshot;
use codeindex::{ComponentKind, Workspace};

pub fn show_stats(project: String, verbose: bool) -> Result<()> {
    let workspace = Workspace::open(&project)?;
    let index = workspace.index()?;
    let stats = index.stats();

    println!("Project: {}", workspace.root().display());
    println!("Snapshot: {}", workspace.snapshot_path().display());
    if let Ok(document) = snapshot::read_document(workspace.snapshot_path()) {
        println!("Indexed at: {}", document.indexed_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    println!("\n📊 Index Statistics:");
    println!("  Components: {}", stats.total_components);
    println!("  Files: {}", stats.files_indexed);
    println!("  Routes: {}", stats.routes);
    println!("  Models: {}", stats.models);
    println!("  Tables: {}", stats.tables);
    println!("  Classes: {}", stats.classes);
    println!("  Functions: {}", stats.functions);

    if verbose {
        let mut by_language: BTreeMap<&str, usize> = BTreeMap::new();
        for file in index.components().iter().filter(|c| c.kind == ComponentKind::File) {
            let language = file.attributes.language().map_or("unknown", |l| l.as_str());
            *by_language.entry(language).or_default() += 1;
        }

        println!("\n📈 Files by language:");
        for (language, count) in by_language {
            println!("  {}: {}", language, count);
        }
    }

    Ok(())
}
