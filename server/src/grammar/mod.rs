//! Language grammar adapters.
//!
//! Each adapter turns source text into raw syntactic constructs with
//! zero-based line spans. Adapters never fail on malformed input: they return
//! whatever constructs were recoverable plus line-scoped diagnostics.

mod c_family;
mod go;
mod java;
mod javascript;
mod python;
mod rust;

pub use c_family::{CDialect, CFamilyAdapter};
pub use go::GoAdapter;
pub use java::JavaAdapter;
pub use javascript::{Dialect, EcmaScriptAdapter};
pub use python::PythonAdapter;
pub use rust::RustAdapter;

use serde::{Deserialize, Serialize};
use tree_sitter::{Language, Node, Parser, Tree};

/// Longest signature kept on a construct.
const MAX_SIGNATURE_LEN: usize = 200;
/// Longest documentation kept on a construct.
const MAX_DOC_LEN: usize = 1000;

/// Nodes that wrap a declaration; comments attach to the wrapper.
const DECLARATION_WRAPPERS: &[&str] = &[
    "export_statement",
    "decorated_definition",
    "template_declaration",
];

/// Raw construct kinds reported by adapters, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructKind {
    Function,
    /// A function declared within a class or type body
    Method,
    Class,
    Struct,
    Enum,
    Interface,
    Trait,
    TypeAlias,
    /// Top-level mutable (or convention-less) binding
    Binding,
    /// Top-level binding declared immutable by the language
    ConstBinding,
    Module,
    Macro,
}

impl ConstructKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstructKind::Function => "function",
            ConstructKind::Method => "method",
            ConstructKind::Class => "class",
            ConstructKind::Struct => "struct",
            ConstructKind::Enum => "enum",
            ConstructKind::Interface => "interface",
            ConstructKind::Trait => "trait",
            ConstructKind::TypeAlias => "type_alias",
            ConstructKind::Binding => "binding",
            ConstructKind::ConstBinding => "const_binding",
            ConstructKind::Module => "module",
            ConstructKind::Macro => "macro",
        }
    }
}

/// One syntactic construct found by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawConstruct {
    pub kind: ConstructKind,
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Enclosing type, for methods and nested types
    pub parent: Option<String>,
    pub signature: Option<String>,
    pub documentation: Option<String>,
}

/// A non-fatal, line-scoped parse problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

/// Constructs and diagnostics for one source text.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub constructs: Vec<RawConstruct>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parsing capability implemented once per source language.
pub trait GrammarAdapter: Send + Sync {
    /// Canonical language tag, e.g. `python`.
    fn language(&self) -> &'static str;

    /// Alternative tags accepted for this language.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// File extensions without the leading dot.
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse source text into constructs.
    fn parse(&self, source: &str) -> ParseOutput;
}

/// Per-parse state shared by the adapters' tree walkers.
pub(crate) struct Collector<'a> {
    pub source: &'a str,
    max_row: u32,
    pub output: ParseOutput,
}

impl<'a> Collector<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_count = source.lines().count() as u32;
        Self {
            source,
            max_row: line_count.saturating_sub(1),
            output: ParseOutput::default(),
        }
    }

    pub fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Record a construct spanning `node`, named by the text of `name_node`.
    ///
    /// An empty `parent` is recorded as none. Comments directly above `node`
    /// become its documentation.
    pub fn push(
        &mut self,
        kind: ConstructKind,
        name_node: Node,
        node: Node,
        parent: Option<&str>,
        signature: Option<String>,
    ) {
        let documentation = self.leading_comments(node);
        self.push_documented(kind, name_node, node, parent, signature, documentation);
    }

    pub fn push_documented(
        &mut self,
        kind: ConstructKind,
        name_node: Node,
        node: Node,
        parent: Option<&str>,
        signature: Option<String>,
        documentation: Option<String>,
    ) {
        let name = self.text(name_node).trim();
        if name.is_empty() {
            return;
        }
        let (start_line, end_line) = self.span(node);
        self.output.constructs.push(RawConstruct {
            kind,
            name: name.to_string(),
            start_line,
            end_line,
            parent: parent.filter(|p| !p.is_empty()).map(str::to_string),
            signature,
            documentation: documentation.map(truncate_doc),
        });
    }

    /// The run of comments ending on the line above `node`, markers stripped.
    pub fn leading_comments(&self, node: Node) -> Option<String> {
        let mut anchor = node;
        while let Some(parent) = anchor
            .parent()
            .filter(|p| DECLARATION_WRAPPERS.contains(&p.kind()))
        {
            anchor = parent;
        }
        // Attributes sit between Rust doc comments and their item.
        let mut cursor = anchor.prev_sibling();
        while let Some(sibling) = cursor.filter(|s| s.kind() == "attribute_item") {
            cursor = sibling.prev_sibling();
        }

        let mut next_row = anchor.start_position().row;
        let mut blocks = Vec::new();
        while let Some(comment) = cursor.filter(|c| is_comment(*c)) {
            if last_row(comment) + 1 < next_row {
                break;
            }
            // A trailing comment belongs to the code before it.
            let trailing = comment.prev_sibling().is_some_and(|p| {
                !is_comment(p) && last_row(p) == comment.start_position().row
            });
            if trailing {
                break;
            }
            blocks.push(self.text(comment));
            next_row = comment.start_position().row;
            cursor = comment.prev_sibling();
        }

        let lines: Vec<String> = blocks
            .iter()
            .rev()
            .flat_map(|block| block.lines())
            .map(strip_comment_markers)
            .collect();
        join_doc_lines(&lines)
    }

    /// Zero-based inclusive line span, clamped to the source's lines.
    pub fn span(&self, node: Node) -> (u32, u32) {
        let start = node.start_position().row as u32;
        let end_pos = node.end_position();
        let mut end = end_pos.row as u32;
        // A node ending at column 0 ends on the previous line's newline
        if end_pos.column == 0 && end > start {
            end -= 1;
        }
        let start = start.min(self.max_row);
        let end = end.min(self.max_row).max(start);
        (start, end)
    }

    /// Declaration header up to (not including) the body node.
    pub fn signature(&self, node: Node, body: Option<Node>) -> Option<String> {
        let end = body.map_or(node.end_byte(), |b| b.start_byte());
        let header = self.source.get(node.start_byte()..end)?;
        let collapsed = header.split_whitespace().collect::<Vec<_>>().join(" ");
        let trimmed = collapsed.trim_end_matches(['{', ':', ';', '=', ' ']).trim();
        if trimmed.is_empty() {
            return None;
        }
        let mut signature = trimmed.to_string();
        if signature.len() > MAX_SIGNATURE_LEN {
            let mut cut = MAX_SIGNATURE_LEN;
            while !signature.is_char_boundary(cut) {
                cut -= 1;
            }
            signature.truncate(cut);
            signature.push_str("...");
        }
        Some(signature)
    }

    pub fn diagnostic(&mut self, line: u32, message: impl Into<String>) {
        self.output.diagnostics.push(Diagnostic {
            line: line.min(self.max_row),
            message: message.into(),
        });
    }

    pub fn finish(self) -> ParseOutput {
        self.output
    }
}

fn is_comment(node: Node) -> bool {
    node.kind().contains("comment")
}

/// Row of the last character; line comments may end at column 0 of the next row.
fn last_row(node: Node) -> usize {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row - 1
    } else {
        end.row
    }
}

fn strip_comment_markers(line: &str) -> String {
    let mut line = line.trim();
    for marker in ["///", "//!", "//", "/**", "/*", "#"] {
        if let Some(rest) = line.strip_prefix(marker) {
            line = rest;
            break;
        }
    }
    let line = line.strip_suffix("*/").unwrap_or(line).trim();
    let line = line.strip_prefix('*').unwrap_or(line);
    line.trim().to_string()
}

/// Join cleaned lines, dropping blank ones at either end.
pub(crate) fn join_doc_lines(lines: &[String]) -> Option<String> {
    let start = lines.iter().position(|l| !l.is_empty())?;
    let end = lines.iter().rposition(|l| !l.is_empty())?;
    Some(lines[start..=end].join("\n"))
}

fn truncate_doc(mut doc: String) -> String {
    if doc.len() > MAX_DOC_LEN {
        let mut cut = MAX_DOC_LEN;
        while !doc.is_char_boundary(cut) {
            cut -= 1;
        }
        doc.truncate(cut);
        doc.push_str("...");
    }
    doc
}

/// Parse `source` with a fresh parser for `language`.
///
/// Parsers are cheap and not `Sync`, so each call builds its own.
pub(crate) fn parse_tree(language: &Language, source: &str) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| format!("failed to load grammar: {e}"))?;
    parser
        .parse(source, None)
        .ok_or_else(|| "parser produced no syntax tree".to_string())
}

/// Run a walker over a freshly parsed tree, collecting syntax diagnostics.
pub(crate) fn run_adapter<F>(language: &Language, source: &str, walk: F) -> ParseOutput
where
    F: FnOnce(Node, &mut Collector),
{
    let mut collector = Collector::new(source);
    match parse_tree(language, source) {
        Ok(tree) => {
            let root = tree.root_node();
            walk(root, &mut collector);
            if root.has_error() {
                collect_syntax_errors(root, &mut collector);
            }
        }
        Err(message) => collector.diagnostic(0, message),
    }
    collector.finish()
}

fn collect_syntax_errors(node: Node, collector: &mut Collector) {
    if node.is_missing() {
        let line = node.start_position().row as u32;
        collector.diagnostic(line, format!("missing {}", node.kind()));
        return;
    }
    if node.is_error() {
        let line = node.start_position().row as u32;
        let snippet: String = collector.text(node).chars().take(40).collect();
        let snippet = snippet.split_whitespace().collect::<Vec<_>>().join(" ");
        collector.diagnostic(line, format!("syntax error near '{snippet}'"));
    }

    let children: Vec<Node> = node.children(&mut node.walk()).collect();
    for child in children {
        if child.has_error() || child.is_missing() {
            collect_syntax_errors(child, collector);
        }
    }
}

/// Every adapter shipped with the server.
pub fn builtin_adapters() -> Vec<Box<dyn GrammarAdapter>> {
    vec![
        Box::new(PythonAdapter),
        Box::new(RustAdapter),
        Box::new(GoAdapter),
        Box::new(EcmaScriptAdapter::new(Dialect::JavaScript)),
        Box::new(EcmaScriptAdapter::new(Dialect::TypeScript)),
        Box::new(EcmaScriptAdapter::new(Dialect::Tsx)),
        Box::new(JavaAdapter),
        Box::new(CFamilyAdapter::new(CDialect::C)),
        Box::new(CFamilyAdapter::new(CDialect::Cpp)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_strips_body_punctuation() {
        let source = "def  greet(name):\n    pass\n";
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let tree = parse_tree(&language, source).unwrap();
        let collector = Collector::new(source);
        let func = tree.root_node().named_child(0).unwrap();
        let body = func.child_by_field_name("body");
        assert_eq!(
            collector.signature(func, body),
            Some("def greet(name)".to_string())
        );
    }

    #[test]
    fn test_span_is_clamped_to_source() {
        let source = "x = 1\n";
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let tree = parse_tree(&language, source).unwrap();
        let collector = Collector::new(source);
        // The module node ends at row 1, column 0
        assert_eq!(collector.span(tree.root_node()), (0, 0));
    }

    #[test]
    fn test_builtin_languages_are_distinct() {
        let adapters = builtin_adapters();
        let mut tags: Vec<&str> = adapters.iter().map(|a| a.language()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), adapters.len());
    }

    #[test]
    fn test_leading_comments() {
        let source = "x = 1  # trailing\n# Load settings.\n#\n# Reads from disk.\ndef load():\n    pass\n\n# Detached.\n\ndef other():\n    pass\n";
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let tree = parse_tree(&language, source).unwrap();
        let collector = Collector::new(source);
        let functions: Vec<Node> = tree
            .root_node()
            .named_children(&mut tree.root_node().walk())
            .filter(|n| n.kind() == "function_definition")
            .collect();

        assert_eq!(
            collector.leading_comments(functions[0]).as_deref(),
            Some("Load settings.\n\nReads from disk.")
        );
        assert_eq!(collector.leading_comments(functions[1]), None);
    }

    #[test]
    fn test_comment_markers() {
        assert_eq!(strip_comment_markers("/// Doc line"), "Doc line");
        assert_eq!(strip_comment_markers(" * middle of block"), "middle of block");
        assert_eq!(strip_comment_markers("/** Block. */"), "Block.");
        assert_eq!(join_doc_lines(&["".into(), "a".into(), "".into()]).as_deref(), Some("a"));
        assert_eq!(join_doc_lines(&["".into()]), None);
    }

    #[test]
    fn test_empty_parent_is_dropped() {
        let source = "def run():\n    pass\n";
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let tree = parse_tree(&language, source).unwrap();
        let func = tree.root_node().named_child(0).unwrap();
        let name = func.child_by_field_name("name").unwrap();

        let mut collector = Collector::new(source);
        collector.push(ConstructKind::Method, name, func, Some(""), None);
        collector.push(ConstructKind::Method, name, func, Some("Runner"), None);
        let output = collector.finish();
        assert_eq!(output.constructs[0].parent, None);
        assert_eq!(output.constructs[1].parent.as_deref(), Some("Runner"));
    }
}
