//! Java grammar adapter.

use tree_sitter::{Language, Node};

use super::{run_adapter, Collector, ConstructKind, GrammarAdapter, ParseOutput};

pub struct JavaAdapter;

impl GrammarAdapter for JavaAdapter {
    fn language(&self) -> &'static str {
        "java"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn parse(&self, source: &str) -> ParseOutput {
        let language: Language = tree_sitter_java::LANGUAGE.into();
        run_adapter(&language, source, |root, collector| {
            walk_declarations(root, None, collector)
        })
    }
}

/// Type declarations at file level or nested in another type's body.
fn walk_declarations(node: Node, owner: Option<&str>, collector: &mut Collector) {
    let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
    for child in children {
        match child.kind() {
            "class_declaration" | "record_declaration" => {
                type_declaration(child, ConstructKind::Class, owner, collector)
            }
            "interface_declaration" | "annotation_type_declaration" => {
                type_declaration(child, ConstructKind::Interface, owner, collector)
            }
            "enum_declaration" => type_declaration(child, ConstructKind::Enum, owner, collector),
            "method_declaration" | "constructor_declaration" if owner.is_some() => {
                if let Some(name) = child.child_by_field_name("name") {
                    let signature = collector.signature(child, child.child_by_field_name("body"));
                    collector.push(ConstructKind::Method, name, child, owner, signature);
                }
            }
            "constant_declaration" => constants(child, owner, collector),
            "field_declaration" if has_modifiers(child, &["static", "final"]) => {
                constants(child, owner, collector)
            }
            // Members declared after the constants of an enum
            "enum_body_declarations" | "ERROR" => walk_declarations(child, owner, collector),
            _ => {}
        }
    }
}

fn type_declaration(
    node: Node,
    kind: ConstructKind,
    owner: Option<&str>,
    collector: &mut Collector,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    collector.push(kind, name_node, node, owner, None);

    let type_name = collector.text(name_node).to_string();
    if let Some(body) = node.child_by_field_name("body") {
        walk_declarations(body, Some(&type_name), collector);
    }
}

/// `static final` fields and interface constants.
fn constants(node: Node, owner: Option<&str>, collector: &mut Collector) {
    let declarators: Vec<Node> = node
        .children_by_field_name("declarator", &mut node.walk())
        .collect();
    for declarator in declarators {
        if let Some(name) = declarator.child_by_field_name("name") {
            collector.push(ConstructKind::ConstBinding, name, node, owner, None);
        }
    }
}

fn has_modifiers(node: Node, required: &[&str]) -> bool {
    let Some(modifiers) = node
        .children(&mut node.walk())
        .find(|c| c.kind() == "modifiers")
    else {
        return false;
    };
    let present: Vec<&str> = modifiers
        .children(&mut modifiers.walk())
        .map(|m| m.kind())
        .collect();
    required.iter().all(|r| present.contains(r))
}
