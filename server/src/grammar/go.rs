//! Go grammar adapter.

use tree_sitter::{Language, Node};

use super::{run_adapter, Collector, ConstructKind, GrammarAdapter, ParseOutput};

pub struct GoAdapter;

impl GrammarAdapter for GoAdapter {
    fn language(&self) -> &'static str {
        "go"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["golang"]
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn parse(&self, source: &str) -> ParseOutput {
        let language: Language = tree_sitter_go::LANGUAGE.into();
        run_adapter(&language, source, |root, collector| {
            walk_declarations(root, collector)
        })
    }
}

fn walk_declarations(node: Node, collector: &mut Collector) {
    let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
    for child in children {
        match child.kind() {
            "function_declaration" => {
                if let Some(name) = child.child_by_field_name("name") {
                    let signature = collector.signature(child, child.child_by_field_name("body"));
                    collector.push(ConstructKind::Function, name, child, None, signature);
                }
            }
            "method_declaration" => method(child, collector),
            "type_declaration" => {
                let specs: Vec<Node> = child.named_children(&mut child.walk()).collect();
                for spec in specs {
                    type_spec(spec, collector);
                }
            }
            "const_declaration" => value_specs(child, ConstructKind::ConstBinding, collector),
            "var_declaration" => value_specs(child, ConstructKind::Binding, collector),
            "ERROR" => walk_declarations(child, collector),
            _ => {}
        }
    }
}

/// Methods are attributed to their receiver's base type.
fn method(node: Node, collector: &mut Collector) {
    let Some(name) = node.child_by_field_name("name") else {
        return;
    };
    let receiver = node
        .child_by_field_name("receiver")
        .and_then(|r| first_of_kind(r, "type_identifier"))
        .map(|t| collector.text(t).to_string());
    let signature = collector.signature(node, node.child_by_field_name("body"));
    collector.push(
        ConstructKind::Method,
        name,
        node,
        receiver.as_deref(),
        signature,
    );
}

fn type_spec(spec: Node, collector: &mut Collector) {
    let Some(name) = spec.child_by_field_name("name") else {
        return;
    };
    let kind = match spec.kind() {
        "type_alias" => ConstructKind::TypeAlias,
        "type_spec" => match spec.child_by_field_name("type").map(|t| t.kind()) {
            Some("struct_type") => ConstructKind::Struct,
            Some("interface_type") => ConstructKind::Interface,
            _ => ConstructKind::TypeAlias,
        },
        _ => return,
    };
    collector.push(kind, name, spec, None, None);
}

/// `const`/`var` blocks: every name of every spec, grouped or not.
fn value_specs(node: Node, kind: ConstructKind, collector: &mut Collector) {
    let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
    for child in children {
        match child.kind() {
            "const_spec" | "var_spec" => {
                let names: Vec<Node> = child
                    .children_by_field_name("name", &mut child.walk())
                    .collect();
                for name in names {
                    if collector.text(name) != "_" {
                        collector.push(kind, name, child, None, None);
                    }
                }
            }
            "var_spec_list" => value_specs(child, kind, collector),
            _ => {}
        }
    }
}

fn first_of_kind<'tree>(node: Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    if node.kind() == kind {
        return Some(node);
    }
    let children: Vec<Node<'tree>> = node.named_children(&mut node.walk()).collect();
    children.into_iter().find_map(|c| first_of_kind(c, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(output: &ParseOutput) -> Vec<(&str, ConstructKind, Option<&str>)> {
        output
            .constructs
            .iter()
            .map(|c| (c.name.as_str(), c.kind, c.parent.as_deref()))
            .collect()
    }

    #[test]
    fn test_declarations() {
        let source = r#"package main

const MaxRetries = 3

var (
	counter int
	a, b = 1, 2
)

type Server struct {
	port int
}

type Handler interface {
	Serve()
}

type ID string

type Alias = Server

func NewServer(port int) *Server {
	return &Server{port: port}
}

func (s *Server) Start() error {
	return nil
}
"#;
        let output = GoAdapter.parse(source);
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

        let found = kinds(&output);
        assert!(found.contains(&("MaxRetries", ConstructKind::ConstBinding, None)));
        assert!(found.contains(&("counter", ConstructKind::Binding, None)));
        assert!(found.contains(&("a", ConstructKind::Binding, None)));
        assert!(found.contains(&("b", ConstructKind::Binding, None)));
        assert!(found.contains(&("Server", ConstructKind::Struct, None)));
        assert!(found.contains(&("Handler", ConstructKind::Interface, None)));
        assert!(found.contains(&("ID", ConstructKind::TypeAlias, None)));
        assert!(found.contains(&("Alias", ConstructKind::TypeAlias, None)));
        assert!(found.contains(&("NewServer", ConstructKind::Function, None)));
        assert!(found.contains(&("Start", ConstructKind::Method, Some("Server"))));

        let start = output.constructs.iter().find(|c| c.name == "Start").unwrap();
        assert_eq!(start.signature.as_deref(), Some("func (s *Server) Start() error"));
    }

    #[test]
    fn test_generic_receiver() {
        let output = GoAdapter.parse("package p\n\nfunc (l *List[T]) Push(v T) {}\n");
        assert_eq!(kinds(&output), vec![("Push", ConstructKind::Method, Some("List"))]);
    }
}
