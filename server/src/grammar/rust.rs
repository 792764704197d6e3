//! Rust grammar adapter.

use tree_sitter::{Language, Node};

use super::{run_adapter, Collector, ConstructKind, GrammarAdapter, ParseOutput};

pub struct RustAdapter;

impl GrammarAdapter for RustAdapter {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn parse(&self, source: &str) -> ParseOutput {
        let language: Language = tree_sitter_rust::LANGUAGE.into();
        run_adapter(&language, source, |root, collector| {
            walk_items(root, None, collector)
        })
    }
}

/// Items of a source file, module body, `impl` block or trait body.
///
/// `owner` is set inside `impl`/`trait` bodies, where functions are methods.
fn walk_items(node: Node, owner: Option<&str>, collector: &mut Collector) {
    let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
    for child in children {
        match child.kind() {
            "function_item" | "function_signature_item" => {
                let Some(name) = child.child_by_field_name("name") else {
                    continue;
                };
                let kind = if owner.is_some() {
                    ConstructKind::Method
                } else {
                    ConstructKind::Function
                };
                let signature = collector.signature(child, child.child_by_field_name("body"));
                collector.push(kind, name, child, owner, signature);
            }
            "struct_item" | "union_item" => named(child, ConstructKind::Struct, owner, collector),
            "enum_item" => named(child, ConstructKind::Enum, owner, collector),
            "type_item" => named(child, ConstructKind::TypeAlias, owner, collector),
            "const_item" => named(child, ConstructKind::ConstBinding, owner, collector),
            "static_item" => {
                let mutable = child
                    .children(&mut child.walk())
                    .any(|c| c.kind() == "mutable_specifier");
                let kind = if mutable {
                    ConstructKind::Binding
                } else {
                    ConstructKind::ConstBinding
                };
                named(child, kind, owner, collector);
            }
            "macro_definition" => named(child, ConstructKind::Macro, owner, collector),
            "trait_item" => {
                named(child, ConstructKind::Trait, owner, collector);
                if let (Some(name), Some(body)) = (
                    child.child_by_field_name("name"),
                    child.child_by_field_name("body"),
                ) {
                    let trait_name = collector.text(name).to_string();
                    walk_items(body, Some(&trait_name), collector);
                }
            }
            "impl_item" => {
                let Some(body) = child.child_by_field_name("body") else {
                    continue;
                };
                // Recovered impls may lack a type; their methods keep no parent.
                let type_name = child
                    .child_by_field_name("type")
                    .map(|t| base_type_name(t, collector))
                    .unwrap_or_default();
                walk_items(body, Some(&type_name), collector);
            }
            "mod_item" => {
                named(child, ConstructKind::Module, owner, collector);
                if let Some(body) = child.child_by_field_name("body") {
                    walk_items(body, None, collector);
                }
            }
            "ERROR" => walk_items(child, owner, collector),
            _ => {}
        }
    }
}

fn named(node: Node, kind: ConstructKind, owner: Option<&str>, collector: &mut Collector) {
    if let Some(name) = node.child_by_field_name("name") {
        collector.push(kind, name, node, owner, None);
    }
}

/// `Foo<T>` and `crate::a::Foo` both name `Foo`.
fn base_type_name(node: Node, collector: &Collector) -> String {
    match node.kind() {
        "generic_type" => node
            .child_by_field_name("type")
            .map(|t| base_type_name(t, collector))
            .unwrap_or_default(),
        "scoped_type_identifier" => node
            .child_by_field_name("name")
            .map(|t| collector.text(t).to_string())
            .unwrap_or_default(),
        "reference_type" => node
            .child_by_field_name("type")
            .map(|t| base_type_name(t, collector))
            .unwrap_or_default(),
        _ => collector.text(node).to_string(),
    }
}
