// Index data model, lookup tables and persistence

pub mod shared;
pub mod snapshot;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Base-type substring that marks a class as a data model.
pub const MODEL_BASE_MARKER: &str = "Model";

/// Component kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Function,
    Class,
    Route,
    Model,
    Table,
    File,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::Function,
        ComponentKind::Class,
        ComponentKind::Route,
        ComponentKind::Model,
        ComponentKind::Table,
        ComponentKind::File,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Function => "function",
            ComponentKind::Class => "class",
            ComponentKind::Route => "route",
            ComponentKind::Model => "model",
            ComponentKind::Table => "table",
            ComponentKind::File => "file",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| IndexError::UnknownKind(s.to_string()))
    }
}

/// Source language tag carried by file and table components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Sql,
    Markdown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Sql => "sql",
            Language::Markdown => "markdown",
        }
    }
}

/// Kind-specific payload of a component.
///
/// Persisted as a flat JSON object whose keys depend on the variant:
///
/// | variant    | keys                                      |
/// |------------|-------------------------------------------|
/// | `None`     | (empty object)                            |
/// | `Route`    | `route_path`                              |
/// | `Class`    | `bases`                                   |
/// | `Module`   | `language` = python, `size`               |
/// | `Table`    | `language` = sql                          |
/// | `Schema`   | `language` = sql, `size`, `content`       |
/// | `Document` | `language` = markdown, `title`, `size`, `content` |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAttributes", into = "RawAttributes")]
pub enum Attributes {
    None,
    Route { route_path: String },
    Class { bases: Vec<String> },
    Module { size: usize },
    Table,
    Schema { size: usize, content: String },
    Document { title: String, size: usize, content: String },
}

impl Attributes {
    pub fn language(&self) -> Option<Language> {
        match self {
            Attributes::Module { .. } => Some(Language::Python),
            Attributes::Table | Attributes::Schema { .. } => Some(Language::Sql),
            Attributes::Document { .. } => Some(Language::Markdown),
            Attributes::None | Attributes::Route { .. } | Attributes::Class { .. } => None,
        }
    }

    pub fn route_path(&self) -> Option<&str> {
        match self {
            Attributes::Route { route_path } => Some(route_path),
            _ => None,
        }
    }

    pub fn bases(&self) -> &[String] {
        match self {
            Attributes::Class { bases } => bases,
            _ => &[],
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Attributes::Document { title, .. } => Some(title),
            _ => None,
        }
    }

    /// Full raw text kept for content scoring.
    pub fn content(&self) -> Option<&str> {
        match self {
            Attributes::Schema { content, .. } | Attributes::Document { content, .. } => {
                Some(content)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    route_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl From<Attributes> for RawAttributes {
    fn from(attributes: Attributes) -> Self {
        let language = attributes.language();
        match attributes {
            Attributes::None => RawAttributes::default(),
            Attributes::Route { route_path } => RawAttributes {
                route_path: Some(route_path),
                ..Default::default()
            },
            Attributes::Class { bases } => RawAttributes {
                bases: Some(bases),
                ..Default::default()
            },
            Attributes::Module { size } => RawAttributes {
                language,
                size: Some(size),
                ..Default::default()
            },
            Attributes::Table => RawAttributes {
                language,
                ..Default::default()
            },
            Attributes::Schema { size, content } => RawAttributes {
                language,
                size: Some(size),
                content: Some(content),
                ..Default::default()
            },
            Attributes::Document {
                title,
                size,
                content,
            } => RawAttributes {
                language,
                title: Some(title),
                size: Some(size),
                content: Some(content),
                ..Default::default()
            },
        }
    }
}

impl TryFrom<RawAttributes> for Attributes {
    type Error = String;

    fn try_from(raw: RawAttributes) -> Result<Self, Self::Error> {
        match raw {
            RawAttributes {
                language: None,
                route_path: None,
                bases: None,
                title: None,
                size: None,
                content: None,
            } => Ok(Attributes::None),
            RawAttributes {
                language: None,
                route_path: Some(route_path),
                bases: None,
                title: None,
                size: None,
                content: None,
            } => Ok(Attributes::Route { route_path }),
            RawAttributes {
                language: None,
                route_path: None,
                bases: Some(bases),
                title: None,
                size: None,
                content: None,
            } => Ok(Attributes::Class { bases }),
            RawAttributes {
                language: Some(Language::Python),
                route_path: None,
                bases: None,
                title: None,
                size: Some(size),
                content: None,
            } => Ok(Attributes::Module { size }),
            RawAttributes {
                language: Some(Language::Sql),
                route_path: None,
                bases: None,
                title: None,
                size: None,
                content: None,
            } => Ok(Attributes::Table),
            RawAttributes {
                language: Some(Language::Sql),
                route_path: None,
                bases: None,
                title: None,
                size: Some(size),
                content: Some(content),
            } => Ok(Attributes::Schema { size, content }),
            RawAttributes {
                language: Some(Language::Markdown),
                route_path: None,
                bases: None,
                title: Some(title),
                size: Some(size),
                content: Some(content),
            } => Ok(Attributes::Document {
                title,
                size,
                content,
            }),
            other => Err(format!("unrecognised attribute set: {:?}", other)),
        }
    }
}

/// One indexed declaration or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Component {
    pub kind: ComponentKind,
    pub name: String,
    /// Root-relative path with forward separators.
    pub source_path: String,
    /// 1-based, inclusive.
    pub line_start: usize,
    pub line_end: usize,
    pub summary: String,
    pub signature: String,
    pub annotations: Vec<String>,
    pub enclosing_type: String,
    pub dependencies: Vec<String>,
    pub attributes: Attributes,
}

impl Component {
    pub fn new(
        kind: ComponentKind,
        name: impl Into<String>,
        source_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            source_path: source_path.into(),
            line_start,
            line_end: line_end.max(line_start),
            summary: String::new(),
            signature: String::new(),
            annotations: Vec::new(),
            enclosing_type: String::new(),
            dependencies: Vec::new(),
            attributes: Attributes::None,
        }
    }

    fn is_model_class(&self) -> bool {
        self.kind == ComponentKind::Class
            && self
                .attributes
                .bases()
                .iter()
                .any(|base| base.contains(MODEL_BASE_MARKER))
    }
}

/// Summary counts for an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Stats {
    pub total_components: usize,
    pub files_indexed: usize,
    pub routes: usize,
    pub models: usize,
    pub tables: usize,
    pub functions: usize,
    pub classes: usize,
}

/// The component sequence plus lookup tables derived from it.
///
/// Lookup tables hold positions into the component sequence and are always
/// rebuilt from it, never mutated independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    root: PathBuf,
    components: Vec<Component>,
    routes: BTreeMap<String, usize>,
    models: BTreeMap<String, usize>,
    tables: BTreeMap<String, usize>,
    functions: BTreeMap<String, Vec<usize>>,
    classes: BTreeMap<String, usize>,
    files: BTreeSet<String>,
}

impl Index {
    /// Build an index from a component sequence. Later components win on
    /// lookup key collisions.
    pub fn new(root: impl Into<PathBuf>, mut components: Vec<Component>) -> Self {
        let mut routes = BTreeMap::new();
        let mut models = BTreeMap::new();
        let mut tables = BTreeMap::new();
        let mut functions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut classes = BTreeMap::new();
        let mut files = BTreeSet::new();

        for (position, component) in components.iter_mut().enumerate() {
            if component.is_model_class() {
                component.kind = ComponentKind::Model;
            }

            match component.kind {
                ComponentKind::Route => {
                    let key = component
                        .attributes
                        .route_path()
                        .unwrap_or(&component.name)
                        .to_string();
                    routes.insert(key, position);
                }
                ComponentKind::Model => {
                    models.insert(component.name.clone(), position);
                }
                ComponentKind::Table => {
                    tables.insert(component.name.clone(), position);
                }
                ComponentKind::Function => {
                    functions
                        .entry(component.name.clone())
                        .or_default()
                        .push(position);
                }
                ComponentKind::Class => {
                    classes.insert(component.name.clone(), position);
                }
                ComponentKind::File => {
                    files.insert(component.source_path.clone());
                }
            }
        }

        Self {
            root: root.into(),
            components,
            routes,
            models,
            tables,
            functions,
            classes,
            files,
        }
    }

    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Vec::new())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn route(&self, key: &str) -> Option<&Component> {
        self.routes.get(key).map(|&i| &self.components[i])
    }

    pub fn model(&self, name: &str) -> Option<&Component> {
        self.models.get(name).map(|&i| &self.components[i])
    }

    pub fn table(&self, name: &str) -> Option<&Component> {
        self.tables.get(name).map(|&i| &self.components[i])
    }

    pub fn class(&self, name: &str) -> Option<&Component> {
        self.classes.get(name).map(|&i| &self.components[i])
    }

    pub fn functions(&self, name: &str) -> Vec<&Component> {
        self.functions
            .get(name)
            .map(|positions| positions.iter().map(|&i| &self.components[i]).collect())
            .unwrap_or_default()
    }

    /// Components registered in the lookup table for `kind`.
    ///
    /// Functions yield every overload; files yield one component per path.
    pub fn lookup_entries(&self, kind: ComponentKind) -> Vec<&Component> {
        let positions: Vec<usize> = match kind {
            ComponentKind::Route => self.routes.values().copied().collect(),
            ComponentKind::Model => self.models.values().copied().collect(),
            ComponentKind::Table => self.tables.values().copied().collect(),
            ComponentKind::Class => self.classes.values().copied().collect(),
            ComponentKind::Function => self.functions.values().flatten().copied().collect(),
            ComponentKind::File => {
                return self
                    .components
                    .iter()
                    .filter(|c| c.kind == ComponentKind::File)
                    .collect()
            }
        };
        positions.into_iter().map(|i| &self.components[i]).collect()
    }

    /// Every component whose source path equals `path`, in sequence order.
    pub fn components_in(&self, path: &str) -> Vec<&Component> {
        self.components
            .iter()
            .filter(|c| c.source_path == path)
            .collect()
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total_components: self.components.len(),
            files_indexed: self.files.len(),
            routes: self.routes.len(),
            models: self.models.len(),
            tables: self.tables.len(),
            functions: self.functions.values().map(Vec::len).sum(),
            classes: self.classes.len(),
        }
    }
}
