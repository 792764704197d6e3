//! JavaScript and TypeScript grammar adapters.
//!
//! The TypeScript grammars extend the JavaScript one, so a single walker
//! serves all three dialects; TypeScript-only node kinds simply never occur
//! in JavaScript trees.

use tree_sitter::{Language, Node};

use super::{run_adapter, Collector, ConstructKind, GrammarAdapter, ParseOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    JavaScript,
    TypeScript,
    Tsx,
}

pub struct EcmaScriptAdapter {
    dialect: Dialect,
}

impl EcmaScriptAdapter {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    fn grammar(&self) -> Language {
        match self.dialect {
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

impl GrammarAdapter for EcmaScriptAdapter {
    fn language(&self) -> &'static str {
        match self.dialect {
            Dialect::JavaScript => "javascript",
            Dialect::TypeScript => "typescript",
            Dialect::Tsx => "tsx",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self.dialect {
            Dialect::JavaScript => &["js", "jsx", "node", "javascriptreact"],
            Dialect::TypeScript => &["ts"],
            Dialect::Tsx => &["typescriptreact"],
        }
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        match self.dialect {
            Dialect::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Dialect::TypeScript => &["ts", "mts", "cts"],
            Dialect::Tsx => &["tsx"],
        }
    }

    fn parse(&self, source: &str) -> ParseOutput {
        run_adapter(&self.grammar(), source, |root, collector| {
            walk_statements(root, collector)
        })
    }
}

fn is_function_value(node: Node) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn walk_statements(node: Node, collector: &mut Collector) {
    let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
    for child in children {
        statement(child, collector);
    }
}

fn statement(node: Node, collector: &mut Collector) {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            if let Some(name) = node.child_by_field_name("name") {
                let signature = collector.signature(node, node.child_by_field_name("body"));
                collector.push(ConstructKind::Function, name, node, None, signature);
            }
        }
        "class_declaration" | "abstract_class_declaration" => class(node, collector),
        "interface_declaration" => interface(node, collector),
        "type_alias_declaration" => named(node, ConstructKind::TypeAlias, collector),
        "enum_declaration" => named(node, ConstructKind::Enum, collector),
        "lexical_declaration" | "variable_declaration" => declarators(node, collector),
        "export_statement" => {
            if let Some(declaration) = node.child_by_field_name("declaration") {
                statement(declaration, collector);
            } else if let Some(value) = node.child_by_field_name("value") {
                // `export default class Foo {}` / `export default function foo() {}`
                if matches!(value.kind(), "class" | "function_expression" | "function") {
                    if let Some(name) = value.child_by_field_name("name") {
                        let kind = if value.kind() == "class" {
                            ConstructKind::Class
                        } else {
                            ConstructKind::Function
                        };
                        collector.push(kind, name, node, None, None);
                    }
                }
            }
        }
        "internal_module" | "module" => {
            named(node, ConstructKind::Module, collector);
            if let Some(body) = node.child_by_field_name("body") {
                walk_statements(body, collector);
            }
        }
        "expression_statement" => {
            // `namespace Foo {}` parses as an expression
            if let Some(inner) = node.named_child(0) {
                if inner.kind() == "internal_module" {
                    statement(inner, collector);
                }
            }
        }
        "ambient_declaration" | "ERROR" => walk_statements(node, collector),
        _ => {}
    }
}

fn named(node: Node, kind: ConstructKind, collector: &mut Collector) {
    if let Some(name) = node.child_by_field_name("name") {
        collector.push(kind, name, node, None, None);
    }
}

/// `const`/`let`/`var` declarators; function-valued ones are functions.
fn declarators(node: Node, collector: &mut Collector) {
    let is_const = node
        .child(0)
        .is_some_and(|keyword| collector.text(keyword) == "const");
    let binding_kind = if is_const {
        ConstructKind::ConstBinding
    } else {
        ConstructKind::Binding
    };

    let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
    for declarator in children {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name) = declarator.child_by_field_name("name") else {
            continue;
        };
        // Destructuring patterns bind several names; only plain identifiers are recorded.
        if name.kind() != "identifier" {
            continue;
        }

        match declarator.child_by_field_name("value") {
            Some(value) if is_function_value(value) => {
                let signature = collector.signature(declarator, value.child_by_field_name("body"));
                collector.push(ConstructKind::Function, name, node, None, signature);
            }
            _ => collector.push(binding_kind, name, node, None, None),
        }
    }
}

fn class(node: Node, collector: &mut Collector) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    collector.push(ConstructKind::Class, name_node, node, None, None);

    let class_name = collector.text(name_node).to_string();
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };

    let members: Vec<Node> = body.named_children(&mut body.walk()).collect();
    for member in members {
        match member.kind() {
            "method_definition" | "abstract_method_signature" => {
                if let Some(name) = member.child_by_field_name("name") {
                    let signature = collector.signature(member, member.child_by_field_name("body"));
                    collector.push(
                        ConstructKind::Method,
                        name,
                        member,
                        Some(&class_name),
                        signature,
                    );
                }
            }
            // `handler = () => {}` class fields behave as methods
            "field_definition" | "public_field_definition" => {
                let name = member
                    .child_by_field_name("property")
                    .or_else(|| member.child_by_field_name("name"));
                let value = member.child_by_field_name("value");
                if let (Some(name), Some(value)) = (name, value) {
                    if is_function_value(value) {
                        let signature = collector.signature(member, value.child_by_field_name("body"));
                        collector.push(
                            ConstructKind::Method,
                            name,
                            member,
                            Some(&class_name),
                            signature,
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

/// Interfaces, with their method signatures as methods.
fn interface(node: Node, collector: &mut Collector) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    collector.push(ConstructKind::Interface, name_node, node, None, None);

    let interface_name = collector.text(name_node).to_string();
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let members: Vec<Node> = body.named_children(&mut body.walk()).collect();
    for member in members {
        let is_method = match member.kind() {
            "method_signature" => true,
            // `onChange: (value: string) => void`
            "property_signature" => member
                .child_by_field_name("type")
                .and_then(|annotation| annotation.named_child(0))
                .is_some_and(|t| t.kind() == "function_type"),
            _ => false,
        };
        if !is_method {
            continue;
        }
        if let Some(name) = member.child_by_field_name("name") {
            let signature = collector.signature(member, None);
            collector.push(
                ConstructKind::Method,
                name,
                member,
                Some(&interface_name),
                signature,
            );
        }
    }
}
