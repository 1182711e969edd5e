// Query execution engine

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{IndexError, Result};
use crate::index::{Component, ComponentKind, Index, Language};

pub const SCORE_EXACT_NAME: u32 = 100;
pub const SCORE_NAME: u32 = 50;
pub const SCORE_DOC_TITLE: u32 = 30;
pub const SCORE_SUMMARY: u32 = 20;
pub const SCORE_CONTENT: u32 = 15;
pub const SCORE_PATH: u32 = 10;

/// Result limit used by the `find_*` fallbacks.
pub const FALLBACK_LIMIT: usize = 5;

/// Search result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit<'a> {
    pub component: &'a Component,
    pub score: u32,
}

/// Outcome of a keyed lookup: the table entry, or ranked candidates when the
/// key is not in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    Exact(&'a Component),
    Candidates(Vec<SearchHit<'a>>),
}

/// Everything the index knows about one source file.
#[derive(Debug, Clone)]
pub struct FileOverview<'a> {
    pub path: String,
    pub file: Option<&'a Component>,
    /// Non-file components grouped by kind, each group ordered by line.
    pub sections: BTreeMap<ComponentKind, Vec<&'a Component>>,
    /// Distinct dependencies of every component in the file, sorted.
    pub dependencies: Vec<String>,
}

/// Query engine over an immutable index
pub struct QueryEngine<'a> {
    index: &'a Index,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a Index) -> Self {
        Self { index }
    }

    /// Score every component against `query` and return the best `limit`.
    ///
    /// An empty or blank query matches nothing.
    pub fn search(&self, query: &str, kind: Option<ComponentKind>, limit: usize) -> Vec<SearchHit<'a>> {
        if query.trim().is_empty() || limit == 0 {
            return Vec::new();
        }
        let needle = query.to_lowercase();

        let mut hits: Vec<SearchHit<'a>> = self
            .index
            .components()
            .iter()
            .filter(|c| kind.map_or(true, |k| c.kind == k))
            .filter_map(|component| {
                let score = score(component, &needle);
                (score > 0).then_some(SearchHit { component, score })
            })
            .collect();

        // Stable: equal scores keep component order
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        hits
    }

    /// Route by path (or handler name when it has no literal path).
    pub fn find_route(&self, route: &str) -> Lookup<'a> {
        match self.index.route(route) {
            Some(component) => Lookup::Exact(component),
            None => Lookup::Candidates(self.search(route, Some(ComponentKind::Route), FALLBACK_LIMIT)),
        }
    }

    pub fn find_model(&self, name: &str) -> Lookup<'a> {
        match self.index.model(name) {
            Some(component) => Lookup::Exact(component),
            None => Lookup::Candidates(self.search(name, Some(ComponentKind::Model), FALLBACK_LIMIT)),
        }
    }

    pub fn find_table(&self, name: &str) -> Lookup<'a> {
        match self.index.table(name) {
            Some(component) => Lookup::Exact(component),
            None => Lookup::Candidates(self.search(name, Some(ComponentKind::Table), FALLBACK_LIMIT)),
        }
    }

    /// Lookup-table entries for `kind`, ordered by key.
    pub fn list_components(&self, kind: ComponentKind) -> Result<Vec<&'a Component>> {
        match kind {
            ComponentKind::Route | ComponentKind::Model | ComponentKind::Table | ComponentKind::Class => {
                Ok(self.index.lookup_entries(kind))
            }
            other => Err(IndexError::InvalidArgument(format!(
                "cannot list components of kind '{}' (expected route, model, table or class)",
                other
            ))),
        }
    }

    /// `None` when no component comes from `path`.
    pub fn explain_file(&self, path: &str) -> Option<FileOverview<'a>> {
        let components = self.index.components_in(path);
        if components.is_empty() {
            return None;
        }

        let mut file = None;
        let mut sections: BTreeMap<ComponentKind, Vec<&'a Component>> = BTreeMap::new();
        let mut dependencies = BTreeSet::new();

        for component in components {
            dependencies.extend(component.dependencies.iter().cloned());
            if component.kind == ComponentKind::File {
                file.get_or_insert(component);
            } else {
                sections.entry(component.kind).or_default().push(component);
            }
        }
        for group in sections.values_mut() {
            group.sort_by_key(|c| c.line_start);
        }

        Some(FileOverview {
            path: path.to_string(),
            file,
            sections,
            dependencies: dependencies.into_iter().collect(),
        })
    }
}

/// First matching rule wins; 0 means no match. `needle` is lowercase.
fn score(component: &Component, needle: &str) -> u32 {
    let name = component.name.to_lowercase();
    if name == needle {
        return SCORE_EXACT_NAME;
    }
    if name.contains(needle) {
        return SCORE_NAME;
    }
    if component.summary.to_lowercase().contains(needle) {
        return SCORE_SUMMARY;
    }
    if component.source_path.to_lowercase().contains(needle) {
        return SCORE_PATH;
    }

    let attributes = &component.attributes;
    let content_matches = || {
        attributes
            .content()
            .is_some_and(|content| content.to_lowercase().contains(needle))
    };
    match attributes.language() {
        Some(Language::Markdown) => {
            if attributes.title().is_some_and(|t| t.to_lowercase().contains(needle)) {
                SCORE_DOC_TITLE
            } else if content_matches() {
                SCORE_CONTENT
            } else {
                0
            }
        }
        Some(Language::Sql) if content_matches() => SCORE_CONTENT,
        _ => 0,
    }
}
