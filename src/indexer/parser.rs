// Source extractors: Python (tree-sitter), SQL schemas and Markdown docs

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::{Node, Parser as TreeParser, Tree};

use crate::error::ExtractError;
use crate::index::{Attributes, Component, ComponentKind, Language};

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([a-z_][a-z0-9_]*)")
        .expect("valid CREATE TABLE pattern")
});

static MARKDOWN_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").expect("valid heading pattern"));

const SCHEMA_PREVIEW_CHARS: usize = 500;
const DOC_SUMMARY_LINES: usize = 3;
const DOC_SUMMARY_CHARS: usize = 200;

/// Turns the text of one file into components.
pub trait Extractor: Send + Sync {
    fn language(&self) -> Language;
    fn can_extract(&self, rel_path: &str) -> bool;
    fn extract(&self, rel_path: &str, content: &str) -> Result<Vec<Component>, ExtractError>;
}

/// Python extractor using tree-sitter
#[derive(Debug, Default)]
pub struct PythonExtractor;

/// SQL schema extractor
#[derive(Debug, Default)]
pub struct SqlExtractor;

/// Markdown documentation extractor
#[derive(Debug, Default)]
pub struct MarkdownExtractor;

fn file_name(rel_path: &str) -> String {
    Path::new(rel_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel_path.to_string())
}

fn has_extension(rel_path: &str, ext: &str) -> bool {
    Path::new(rel_path).extension().and_then(|e| e.to_str()) == Some(ext)
}

fn line_of_offset(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

/// Per-file state shared by the Python tree walk.
struct PythonFile<'a> {
    source: &'a str,
    rel_path: &'a str,
    dependencies: Vec<String>,
}

impl<'a> PythonFile<'a> {
    fn text(&self, node: Node) -> &'a str {
        &self.source[node.byte_range()]
    }

    fn component(&self, kind: ComponentKind, name: String, node: Node) -> Component {
        let (start, end) = line_span(node);
        let mut component = Component::new(kind, name, self.rel_path, start, end);
        component.dependencies = self.dependencies.clone();
        component
    }
}

fn line_span(node: Node) -> (usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    let end_line = if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    };
    (start.row + 1, end_line)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

/// First named child that is not a comment.
fn first_statement(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    found
}

/// Value of a plain string literal, or `None` for byte strings and f-strings.
/// Escapes are decoded unless the literal is raw.
fn string_literal_value(literal: &str) -> Option<String> {
    let quote_at = literal.find(['"', '\''])?;
    let prefix = literal[..quote_at].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }

    let body = &literal[quote_at..];
    for delimiter in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= delimiter.len() * 2 && body.starts_with(delimiter) && body.ends_with(delimiter) {
            let inner = &body[delimiter.len()..body.len() - delimiter.len()];
            return Some(if prefix.contains('r') {
                inner.to_string()
            } else {
                decode_escapes(inner)
            });
        }
    }
    None
}

/// Decode Python backslash escapes. Unrecognised escapes and `\N{...}` are
/// kept as written; a backslash before a newline joins the lines.
fn decode_escapes(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push('\\');
            break;
        };

        match escape {
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\\' | '\'' | '"' => out.push(escape),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0B}'),
            '0'..='7' => {
                let mut value = escape.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.extend(char::from_u32(value));
            }
            'x' | 'u' | 'U' => {
                let width = match escape {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().take(width).take_while(char::is_ascii_hexdigit).collect();
                let decoded = Some(digits)
                    .filter(|d| d.len() == width)
                    .and_then(|d| u32::from_str_radix(&d, 16).ok())
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => {
                        out.push(decoded);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    None => {
                        out.push('\\');
                        out.push(escape);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

/// Normalise docstring indentation: strip the first line, remove the common
/// margin of the remaining lines, drop blank lines at both ends.
fn clean_docstring(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let Some((first, rest)) = lines.split_first() else {
        return String::new();
    };

    let margin = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = Vec::with_capacity(lines.len());
    cleaned.push(first.trim());
    for line in rest {
        cleaned.push(line.get(margin..).unwrap_or_else(|| line.trim_start()).trim_end());
    }

    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    let leading = cleaned.iter().take_while(|l| l.is_empty()).count();
    cleaned[leading..].join("\n")
}

impl PythonExtractor {
    pub fn new() -> Self {
        Self
    }

    fn parse_tree(&self, content: &str) -> Result<Tree, ExtractError> {
        let mut parser = TreeParser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into())?;

        let tree = parser.parse(content, None).ok_or_else(|| ExtractError::Parse {
            line: 1,
            message: "parser produced no tree".to_string(),
        })?;

        if let Some(bad) = first_error(tree.root_node()) {
            let message = if bad.is_missing() {
                format!("missing `{}`", bad.kind())
            } else {
                let snippet: String = content[bad.byte_range()].chars().take(40).collect();
                format!("unexpected `{}`", snippet.trim())
            };
            return Err(ExtractError::Parse {
                line: bad.start_position().row + 1,
                message,
            });
        }

        Ok(tree)
    }

    /// Module names from `import` and `from ... import` statements anywhere in
    /// the file, in source order, first occurrence kept.
    fn collect_imports(&self, node: Node, file: &PythonFile, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        let dotted = |n: Node| file.text(n).split_whitespace().collect::<String>();

        let modules: Vec<String> = match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
                names
                    .into_iter()
                    .filter_map(|name| {
                        if name.kind() == "aliased_import" {
                            name.child_by_field_name("name")
                        } else {
                            Some(name)
                        }
                    })
                    .map(dotted)
                    .collect()
            }
            "import_from_statement" => node
                .child_by_field_name("module_name")
                .and_then(|m| {
                    if m.kind() == "relative_import" {
                        let mut cursor = m.walk();
                        let inner = m.named_children(&mut cursor).find(|c| c.kind() == "dotted_name");
                        inner
                    } else {
                        Some(m)
                    }
                })
                .map(dotted)
                .into_iter()
                .collect(),
            "future_import_statement" => vec!["__future__".to_string()],
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.collect_imports(child, file, seen, out);
                }
                return;
            }
        };

        for module in modules {
            if !module.is_empty() && seen.insert(module.clone()) {
                out.push(module);
            }
        }
    }

    /// Value of a string or implicitly concatenated string expression.
    fn literal_value(&self, expr: Node, file: &PythonFile) -> Option<String> {
        match expr.kind() {
            "string" => string_literal_value(file.text(expr)),
            "concatenated_string" => {
                let mut cursor = expr.walk();
                let parts: Vec<Node> = expr
                    .named_children(&mut cursor)
                    .filter(|part| part.kind() != "comment")
                    .collect();
                parts
                    .into_iter()
                    .map(|part| self.literal_value(part, file))
                    .collect::<Option<Vec<String>>>()
                    .map(|parts| parts.concat())
            }
            _ => None,
        }
    }

    fn docstring(&self, body: Option<Node>, file: &PythonFile) -> String {
        body.and_then(first_statement)
            .filter(|stmt| stmt.kind() == "expression_statement")
            .and_then(|stmt| stmt.named_child(0))
            .and_then(|expr| self.literal_value(expr, file))
            .map(|raw| clean_docstring(&raw))
            .unwrap_or_default()
    }

    /// Dotted rendering of names and attribute chains; other expressions are
    /// rendered as written.
    fn dotted_name(&self, node: Node, file: &PythonFile) -> String {
        match node.kind() {
            "attribute" => {
                let object = node.child_by_field_name("object");
                let attribute = node.child_by_field_name("attribute");
                match (object, attribute) {
                    (Some(object), Some(attribute)) => {
                        format!("{}.{}", self.dotted_name(object, file), file.text(attribute))
                    }
                    _ => file.text(node).to_string(),
                }
            }
            _ => file.text(node).to_string(),
        }
    }

    fn decorator_expression(decorator: Node) -> Option<Node> {
        first_statement(decorator)
    }

    fn decorator_name(&self, decorator: Node, file: &PythonFile) -> String {
        let Some(mut expr) = Self::decorator_expression(decorator) else {
            return file.text(decorator).trim_start_matches('@').trim().to_string();
        };
        while expr.kind() == "call" {
            match expr.child_by_field_name("function") {
                Some(function) => expr = function,
                None => break,
            }
        }
        self.dotted_name(expr, file)
    }

    /// Literal path from the first `<obj>.route("<path>", ...)` decorator.
    fn route_path(&self, decorators: &[Node], file: &PythonFile) -> Option<String> {
        decorators.iter().find_map(|decorator| {
            let call = Self::decorator_expression(*decorator).filter(|e| e.kind() == "call")?;
            let function = call.child_by_field_name("function").filter(|f| f.kind() == "attribute")?;
            let attribute = function.child_by_field_name("attribute")?;
            if file.text(attribute) != "route" {
                return None;
            }
            let arguments = call
                .child_by_field_name("arguments")
                .filter(|a| a.kind() == "argument_list")?;
            let first = first_statement(arguments)?;
            self.literal_value(first, file).filter(|path| !path.is_empty())
        })
    }

    fn positional_parameters(&self, parameters: Option<Node>, file: &PythonFile) -> Vec<String> {
        let mut names = Vec::new();
        let Some(parameters) = parameters else {
            return names;
        };

        let mut cursor = parameters.walk();
        for param in parameters.named_children(&mut cursor) {
            match param.kind() {
                "identifier" => names.push(file.text(param).to_string()),
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = param.child_by_field_name("name") {
                        names.push(file.text(name).to_string());
                    }
                }
                "typed_parameter" => match param.named_child(0) {
                    Some(inner) if inner.kind() == "identifier" => {
                        names.push(file.text(inner).to_string())
                    }
                    Some(inner) if inner.kind() == "list_splat_pattern" => break,
                    _ => {}
                },
                "list_splat_pattern" | "keyword_separator" => break,
                _ => {}
            }
        }
        names
    }

    fn walk(&self, node: Node, file: &PythonFile, enclosing: Option<&str>, out: &mut Vec<Component>) {
        match node.kind() {
            "decorated_definition" => {
                let mut cursor = node.walk();
                let decorators: Vec<Node> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "decorator")
                    .collect();
                if let Some(definition) = node.child_by_field_name("definition") {
                    self.definition(definition, &decorators, file, enclosing, out);
                }
            }
            "class_definition" | "function_definition" => {
                self.definition(node, &[], file, enclosing, out);
            }
            _ => self.walk_children(node, file, None, out),
        }
    }

    fn walk_children(&self, node: Node, file: &PythonFile, enclosing: Option<&str>, out: &mut Vec<Component>) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk(child, file, enclosing, out);
        }
    }

    fn definition(
        &self,
        node: Node,
        decorators: &[Node],
        file: &PythonFile,
        enclosing: Option<&str>,
        out: &mut Vec<Component>,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = file.text(name_node).to_string();
        let body = node.child_by_field_name("body");
        let annotations: Vec<String> = decorators.iter().map(|d| self.decorator_name(*d, file)).collect();

        match node.kind() {
            "class_definition" => {
                let bases = node
                    .child_by_field_name("superclasses")
                    .map(|args| {
                        let mut cursor = args.walk();
                        let bases: Vec<String> = args
                            .named_children(&mut cursor)
                            .filter(|a| !matches!(a.kind(), "keyword_argument" | "comment"))
                            .map(|a| self.dotted_name(a, file))
                            .collect();
                        bases
                    })
                    .unwrap_or_default();

                let mut class = file.component(ComponentKind::Class, name.clone(), node);
                class.summary = self.docstring(body, file);
                class.annotations = annotations;
                class.attributes = Attributes::Class { bases };
                out.push(class);

                if let Some(body) = body {
                    self.walk_children(body, file, Some(name.as_str()), out);
                }
            }
            "function_definition" => {
                let params = self.positional_parameters(node.child_by_field_name("parameters"), file);
                let is_route = annotations.iter().any(|a| a.to_lowercase().contains("route"));

                let mut function = file.component(
                    if is_route { ComponentKind::Route } else { ComponentKind::Function },
                    name.clone(),
                    node,
                );
                function.signature = format!("{}({})", name, params.join(", "));
                function.summary = self.docstring(body, file);
                function.enclosing_type = enclosing.unwrap_or_default().to_string();
                if is_route {
                    if let Some(route_path) = self.route_path(decorators, file) {
                        function.attributes = Attributes::Route { route_path };
                    }
                }
                function.annotations = annotations;
                out.push(function);

                if let Some(body) = body {
                    self.walk_children(body, file, None, out);
                }
            }
            _ => {}
        }
    }
}

impl Extractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn can_extract(&self, rel_path: &str) -> bool {
        has_extension(rel_path, "py")
    }

    fn extract(&self, rel_path: &str, content: &str) -> Result<Vec<Component>, ExtractError> {
        let tree = self.parse_tree(content)?;
        let root = tree.root_node();

        let mut file = PythonFile {
            source: content,
            rel_path,
            dependencies: Vec::new(),
        };
        let mut dependencies = Vec::new();
        self.collect_imports(root, &file, &mut HashSet::new(), &mut dependencies);
        file.dependencies = dependencies;

        let mut module = Component::new(
            ComponentKind::File,
            file_name(rel_path),
            rel_path,
            1,
            content.lines().count(),
        );
        module.summary = self.docstring(Some(root), &file);
        module.dependencies = file.dependencies.clone();
        module.attributes = Attributes::Module { size: content.len() };

        let mut components = vec![module];
        self.walk_children(root, &file, None, &mut components);
        Ok(components)
    }
}

impl SqlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for SqlExtractor {
    fn language(&self) -> Language {
        Language::Sql
    }

    fn can_extract(&self, rel_path: &str) -> bool {
        has_extension(rel_path, "sql")
    }

    fn extract(&self, rel_path: &str, content: &str) -> Result<Vec<Component>, ExtractError> {
        let mut file = Component::new(
            ComponentKind::File,
            file_name(rel_path),
            rel_path,
            1,
            content.lines().count(),
        );
        file.summary = content.chars().take(SCHEMA_PREVIEW_CHARS).collect();
        file.attributes = Attributes::Schema {
            size: content.len(),
            content: content.to_string(),
        };

        let mut components = vec![file];
        for captures in CREATE_TABLE.captures_iter(content) {
            let (Some(statement), Some(table)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let start = statement.start();
            let end = content[start..]
                .find(';')
                .map(|offset| start + offset)
                .unwrap_or(content.len());

            let mut component = Component::new(
                ComponentKind::Table,
                table.as_str(),
                rel_path,
                line_of_offset(content, start),
                line_of_offset(content, end),
            );
            component.attributes = Attributes::Table;
            components.push(component);
        }

        Ok(components)
    }
}

impl MarkdownExtractor {
    pub fn new() -> Self {
        Self
    }

    fn summary(content: &str) -> String {
        let lines: Vec<&str> = content
            .split('\n')
            .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
            .map(str::trim)
            .take(DOC_SUMMARY_LINES)
            .collect();
        lines.join(" ").chars().take(DOC_SUMMARY_CHARS).collect()
    }
}

impl Extractor for MarkdownExtractor {
    fn language(&self) -> Language {
        Language::Markdown
    }

    /// Hidden Markdown files (leading dot) are skipped.
    fn can_extract(&self, rel_path: &str) -> bool {
        has_extension(rel_path, "md") && !file_name(rel_path).starts_with('.')
    }

    fn extract(&self, rel_path: &str, content: &str) -> Result<Vec<Component>, ExtractError> {
        let title = MARKDOWN_TITLE
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| {
                Path::new(rel_path)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

        let mut doc = Component::new(
            ComponentKind::File,
            file_name(rel_path),
            rel_path,
            1,
            content.split('\n').count(),
        );
        doc.summary = Self::summary(content);
        doc.attributes = Attributes::Document {
            title,
            size: content.len(),
            content: content.to_string(),
        };

        Ok(vec![doc])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python(source: &str) -> Vec<Component> {
        PythonExtractor::new().extract("pkg/animals.py", source).unwrap()
    }

    fn named<'a>(components: &'a [Component], kind: ComponentKind, name: &str) -> &'a Component {
        components
            .iter()
            .find(|c| c.kind == kind && c.name == name)
            .unwrap_or_else(|| panic!("no {} named {}", kind, name))
    }

    #[test]
    fn test_class_with_method() {
        let source = r#"
class Dog(Animal):
    def bark(self):
        "says woof"
        return "woof"
"#;
        let components = python(source);

        let dog = named(&components, ComponentKind::Class, "Dog");
        assert_eq!(dog.attributes.bases(), ["Animal".to_string()]);
        assert_eq!(dog.line_start, 2);
        assert_eq!(dog.line_end, 5);

        let bark = named(&components, ComponentKind::Function, "bark");
        assert_eq!(bark.enclosing_type, "Dog");
        assert_eq!(bark.summary, "says woof");
        assert_eq!(bark.signature, "bark(self)");
        assert_eq!(bark.line_start, 3);

        assert_eq!(components.iter().filter(|c| c.name == "bark").count(), 1);
    }

    #[test]
    fn test_file_component() {
        let source = "\"\"\"Animal helpers.\n\n    More detail.\n\"\"\"\nimport os, sys.path as sp\nfrom .models import Dog\nfrom . import sibling\nfrom collections import OrderedDict\nimport os\n\ndef f():\n    import json\n";
        let components = python(source);

        let file = &components[0];
        assert_eq!(file.kind, ComponentKind::File);
        assert_eq!(file.name, "animals.py");
        assert_eq!(file.source_path, "pkg/animals.py");
        assert_eq!(file.summary, "Animal helpers.\n\nMore detail.");
        assert_eq!(file.dependencies, ["os", "sys.path", "models", "collections", "json"]);
        assert_eq!(file.line_start, 1);
        assert_eq!(file.line_end, 12);
        assert_eq!(file.attributes, Attributes::Module { size: source.len() });

        let f = named(&components, ComponentKind::Function, "f");
        assert_eq!(f.dependencies, file.dependencies);
    }

    #[test]
    fn test_signature_uses_positional_names() {
        let source = "def handler(a, b: int, c=1, d: str = 'x', *args, e, **kwargs):\n    pass\n";
        let components = python(source);
        let handler = named(&components, ComponentKind::Function, "handler");
        assert_eq!(handler.signature, "handler(a, b, c, d)");
        assert_eq!(handler.enclosing_type, "");
        assert!(handler.annotations.is_empty());
    }

    #[test]
    fn test_route_detection() {
        let source = r#"
@app.route("/voters", methods=["GET"])
@login_required
def list_voters():
    """List voters."""
    return []

@bp.route(path)
def dynamic():
    pass

@cache.cached(timeout=60)
def cached():
    pass
"#;
        let components = python(source);

        let voters = named(&components, ComponentKind::Route, "list_voters");
        assert_eq!(voters.annotations, ["app.route", "login_required"]);
        assert_eq!(voters.attributes.route_path(), Some("/voters"));
        assert_eq!(voters.summary, "List voters.");
        assert_eq!(voters.line_start, 4);

        let dynamic = named(&components, ComponentKind::Route, "dynamic");
        assert_eq!(dynamic.attributes, Attributes::None);

        let cached = named(&components, ComponentKind::Function, "cached");
        assert_eq!(cached.annotations, ["cache.cached"]);
    }

    #[test]
    fn test_decorated_and_nested_classes() {
        let source = r#"
@dataclass
class Outer(base.Model, metaclass=Meta):
    class Inner:
        def method(self):
            def helper(x):
                pass

def factory():
    class Local(Base):
        pass
"#;
        let components = python(source);

        let outer = named(&components, ComponentKind::Class, "Outer");
        assert_eq!(outer.annotations, ["dataclass"]);
        assert_eq!(outer.attributes.bases(), ["base.Model".to_string()]);
        assert_eq!(outer.line_start, 3);

        assert_eq!(named(&components, ComponentKind::Function, "method").enclosing_type, "Inner");
        assert_eq!(named(&components, ComponentKind::Function, "helper").enclosing_type, "");
        assert_eq!(named(&components, ComponentKind::Class, "Local").attributes.bases(), ["Base".to_string()]);

        let kinds: Vec<&str> = components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(kinds, ["animals.py", "Outer", "Inner", "method", "helper", "factory", "Local"]);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = PythonExtractor::new()
            .extract("bad.py", "def broken(:\n    pass\n")
            .unwrap_err();
        assert!(matches!(err, ExtractError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_empty_python_file() {
        let components = python("");
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].line_end, 1);
        assert_eq!(components[0].summary, "");
    }

    #[test]
    fn test_sql_tables() {
        let source = "-- schema\nCREATE TABLE IF NOT EXISTS voters (id INT);\n\ncreate table precincts (\n  id INT,\n  name TEXT\n);\nCREATE TABLE dangling (id INT)\n";
        let components = SqlExtractor::new().extract("db/schema.sql", source).unwrap();

        assert_eq!(components.len(), 4);
        let file = &components[0];
        assert_eq!(file.kind, ComponentKind::File);
        assert_eq!(file.attributes.content(), Some(source));
        assert_eq!(file.attributes.language(), Some(Language::Sql));

        let voters = named(&components, ComponentKind::Table, "voters");
        assert_eq!((voters.line_start, voters.line_end), (2, 2));
        assert_eq!(voters.attributes, Attributes::Table);

        let precincts = named(&components, ComponentKind::Table, "precincts");
        assert_eq!((precincts.line_start, precincts.line_end), (4, 7));

        let dangling = named(&components, ComponentKind::Table, "dangling");
        assert_eq!((dangling.line_start, dangling.line_end), (8, 9));
    }

    #[test]
    fn test_sql_preview_is_truncated() {
        let source = "x".repeat(800);
        let components = SqlExtractor::new().extract("big.sql", &source).unwrap();
        assert_eq!(components[0].summary.chars().count(), SCHEMA_PREVIEW_CHARS);
    }

    #[test]
    fn test_markdown_title_and_summary() {
        let source = "Intro line\n\n# Voter Guide\n\n## Setup\nFirst step.\n   Second step.  \n\nThird step.\nFourth step.\n";
        let components = MarkdownExtractor::new().extract("docs/guide.md", source).unwrap();

        assert_eq!(components.len(), 1);
        let doc = &components[0];
        assert_eq!(doc.name, "guide.md");
        assert_eq!(doc.attributes.title(), Some("Voter Guide"));
        assert_eq!(doc.summary, "Intro line First step. Second step.");
        assert_eq!(doc.line_end, 11);
        assert_eq!(doc.attributes.language(), Some(Language::Markdown));
    }

    #[test]
    fn test_markdown_title_falls_back_to_stem() {
        let components = MarkdownExtractor::new().extract("docs/notes.md", "## Only sub\ntext").unwrap();
        assert_eq!(components[0].attributes.title(), Some("notes"));
    }

    #[test]
    fn test_markdown_skips_hidden_files() {
        let extractor = MarkdownExtractor::new();
        assert!(extractor.can_extract("docs/guide.md"));
        assert!(!extractor.can_extract("docs/.draft.md"));
        assert!(!extractor.can_extract("docs/guide.txt"));
    }

    #[test]
    fn test_clean_docstring() {
        assert_eq!(clean_docstring("  Summary.\n\n    Body line\n      indented\n    "), "Summary.\n\nBody line\n  indented");
        assert_eq!(clean_docstring("\n    Only body.\n"), "Only body.");
    }

    #[test]
    fn test_string_literal_value() {
        assert_eq!(string_literal_value("'/a'").as_deref(), Some("/a"));
        assert_eq!(string_literal_value("r\"/b\"").as_deref(), Some("/b"));
        assert_eq!(string_literal_value("\"\"\"doc\"\"\"").as_deref(), Some("doc"));
        assert_eq!(string_literal_value("f\"/{x}\""), None);
        assert_eq!(string_literal_value("b'raw'"), None);
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal_value(r#""says \"woof\"""#).as_deref(), Some("says \"woof\""));
        assert_eq!(string_literal_value(r"'line1\nline2\ttab'").as_deref(), Some("line1\nline2\ttab"));
        assert_eq!(string_literal_value(r"'\x41\u00e9\101\\'").as_deref(), Some("A\u{e9}A\\"));
        assert_eq!(string_literal_value("'joined \\\nline'").as_deref(), Some("joined line"));
        assert_eq!(string_literal_value(r"'\d+ \N{BULLET}'").as_deref(), Some(r"\d+ \N{BULLET}"));
        assert_eq!(string_literal_value(r"r'\d+\n'").as_deref(), Some(r"\d+\n"));
        assert_eq!(string_literal_value(r#"R"\"""#).as_deref(), Some(r#"\""#));
    }

    #[test]
    fn test_escaped_docstring_and_route_path() {
        let source = r#"
@app.route("/voters/\x7bid\x7d")
def show():
    "says \"woof\"\nloudly"

def plain():
    r"keeps \n as written"
"#;
        let components = python(source);

        let show = named(&components, ComponentKind::Route, "show");
        assert_eq!(show.summary, "says \"woof\"\nloudly");
        assert_eq!(show.attributes.route_path(), Some("/voters/{id}"));

        let plain = named(&components, ComponentKind::Function, "plain");
        assert_eq!(plain.summary, r"keeps \n as written");
    }

    #[test]
    fn test_concatenated_docstring() {
        let source = "def f():\n    \"a\" \"b\"\n\nclass C:\n    'one ' 'two'\n\ndef g():\n    f'{x}' 'tail'\n";
        let components = python(source);

        assert_eq!(named(&components, ComponentKind::Function, "f").summary, "ab");
        assert_eq!(named(&components, ComponentKind::Class, "C").summary, "one two");
        assert_eq!(named(&components, ComponentKind::Function, "g").summary, "");
    }

    #[test]
    fn test_empty_route_path_keys_by_name() {
        let source = "@app.route(\"\")\ndef root():\n    pass\n";
        let components = python(source);

        let root = named(&components, ComponentKind::Route, "root");
        assert_eq!(root.attributes, Attributes::None);

        let index = crate::index::Index::new("/project", components);
        assert!(index.route("root").is_some());
        assert!(index.route("").is_none());
    }
}
