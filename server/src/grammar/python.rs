//! Python grammar adapter.

use tree_sitter::{Language, Node};

use super::{join_doc_lines, run_adapter, Collector, ConstructKind, GrammarAdapter, ParseOutput};

pub struct PythonAdapter;

impl GrammarAdapter for PythonAdapter {
    fn language(&self) -> &'static str {
        "python"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["py", "python3"]
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn parse(&self, source: &str) -> ParseOutput {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        run_adapter(&language, source, |root, collector| {
            walk_module(root, collector)
        })
    }
}

/// Module level: functions, classes and bindings, including those nested in
/// top-level control flow such as `if TYPE_CHECKING:` or `try:` blocks.
fn walk_module(node: Node, collector: &mut Collector) {
    let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
    for child in children {
        match child.kind() {
            "function_definition" => function(child, child, None, collector),
            "class_definition" => class(child, child, None, collector),
            "decorated_definition" => decorated(child, None, collector),
            "expression_statement" => assignment_targets(child, collector),
            "if_statement" | "elif_clause" | "else_clause" | "try_statement"
            | "except_clause" | "finally_clause" | "with_statement" | "block" | "ERROR" => {
                walk_module(child, collector)
            }
            _ => {}
        }
    }
}

/// `@decorator` wrappers; the span includes the decorators.
fn decorated(node: Node, class_name: Option<&str>, collector: &mut Collector) {
    let Some(definition) = node.child_by_field_name("definition") else {
        return;
    };
    match definition.kind() {
        "function_definition" => function(definition, node, class_name, collector),
        "class_definition" => class(definition, node, class_name, collector),
        _ => {}
    }
}

fn function(def: Node, span: Node, class_name: Option<&str>, collector: &mut Collector) {
    let Some(name) = def.child_by_field_name("name") else {
        return;
    };
    let kind = if class_name.is_some() {
        ConstructKind::Method
    } else {
        ConstructKind::Function
    };
    let signature = collector.signature(def, def.child_by_field_name("body"));
    let documentation = docstring(def, collector).or_else(|| collector.leading_comments(span));
    collector.push_documented(kind, name, span, class_name, signature, documentation);
}

fn class(def: Node, span: Node, outer: Option<&str>, collector: &mut Collector) {
    let Some(name_node) = def.child_by_field_name("name") else {
        return;
    };
    let documentation = docstring(def, collector).or_else(|| collector.leading_comments(span));
    collector.push_documented(ConstructKind::Class, name_node, span, outer, None, documentation);

    let class_name = collector.text(name_node).to_string();
    if let Some(body) = def.child_by_field_name("body") {
        walk_class_body(body, &class_name, collector);
    }
}

/// A string literal opening the body of a function or class.
fn docstring(def: Node, collector: &Collector) -> Option<String> {
    let body = def.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0).filter(|n| n.kind() == "string")?;
    let content: String = string
        .named_children(&mut string.walk())
        .filter(|part| part.kind() == "string_content")
        .map(|part| collector.text(part))
        .collect();
    let lines: Vec<String> = content.lines().map(|l| l.trim().to_string()).collect();
    join_doc_lines(&lines)
}

fn walk_class_body(body: Node, class_name: &str, collector: &mut Collector) {
    let children: Vec<Node> = body.named_children(&mut body.walk()).collect();
    for child in children {
        match child.kind() {
            "function_definition" => function(child, child, Some(class_name), collector),
            "class_definition" => class(child, child, Some(class_name), collector),
            "decorated_definition" => decorated(child, Some(class_name), collector),
            "ERROR" => walk_class_body(child, class_name, collector),
            _ => {}
        }
    }
}

/// `x = ...`, `a, b = ...`, `x: int = ...` and chained `a = b = ...`.
fn assignment_targets(statement: Node, collector: &mut Collector) {
    let Some(mut assignment) = statement.named_child(0) else {
        return;
    };
    if assignment.kind() != "assignment" {
        return;
    }

    loop {
        if let Some(left) = assignment.child_by_field_name("left") {
            binding_names(left, statement, collector);
        }
        match assignment.child_by_field_name("right") {
            Some(right) if right.kind() == "assignment" => assignment = right,
            _ => break,
        }
    }
}

fn binding_names(target: Node, statement: Node, collector: &mut Collector) {
    match target.kind() {
        "identifier" => collector.push(ConstructKind::Binding, target, statement, None, None),
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let children: Vec<Node> = target.named_children(&mut target.walk()).collect();
            for child in children {
                binding_names(child, statement, collector);
            }
        }
        // Attribute and subscript targets mutate existing objects.
        _ => {}
    }
}
