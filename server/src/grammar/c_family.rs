//! C and C++ grammar adapters.
//!
//! The C++ grammar extends the C one, so one walker serves both. Function
//! prototypes are recorded only when the same file does not also define the
//! function.

use std::collections::HashSet;

use tree_sitter::{Language, Node};

use super::{run_adapter, Collector, ConstructKind, GrammarAdapter, ParseOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CDialect {
    C,
    Cpp,
}

pub struct CFamilyAdapter {
    dialect: CDialect,
}

impl CFamilyAdapter {
    pub fn new(dialect: CDialect) -> Self {
        Self { dialect }
    }

    fn grammar(&self) -> Language {
        match self.dialect {
            CDialect::C => tree_sitter_c::LANGUAGE.into(),
            CDialect::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }
}

impl GrammarAdapter for CFamilyAdapter {
    fn language(&self) -> &'static str {
        match self.dialect {
            CDialect::C => "c",
            CDialect::Cpp => "cpp",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self.dialect {
            CDialect::C => &[],
            CDialect::Cpp => &["c++", "cxx"],
        }
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        match self.dialect {
            CDialect::C => &["c", "h"],
            CDialect::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        }
    }

    fn parse(&self, source: &str) -> ParseOutput {
        run_adapter(&self.grammar(), source, |root, collector| {
            let mut walker = Walker::default();
            walker.walk(root, None, collector);
            walker.drop_defined_prototypes(collector);
        })
    }
}

#[derive(Default)]
struct Walker {
    /// Indices of constructs recorded from prototypes
    prototypes: HashSet<usize>,
}

impl Walker {
    fn walk(&mut self, node: Node, owner: Option<&str>, collector: &mut Collector) {
        let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
        for child in children {
            match child.kind() {
                "function_definition" => {
                    if let Some(declarator) = child.child_by_field_name("declarator") {
                        self.function(child, declarator, owner, false, collector)
                    }
                }
                "declaration" | "field_declaration" => self.declaration(child, owner, collector),
                "type_definition" => type_definition(child, owner, collector),
                "struct_specifier" | "union_specifier" | "class_specifier" | "enum_specifier" => {
                    self.specifier(child, child, owner, collector)
                }
                "alias_declaration" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        collector.push(ConstructKind::TypeAlias, name, child, owner, None);
                    }
                }
                "namespace_definition" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        collector.push(ConstructKind::Module, name, child, None, None);
                    }
                    if let Some(body) = child.child_by_field_name("body") {
                        self.walk(body, None, collector);
                    }
                }
                "preproc_def" if owner.is_none() => {
                    // Include guards define a name without a value
                    if let (Some(name), Some(_)) = (
                        child.child_by_field_name("name"),
                        child.child_by_field_name("value"),
                    ) {
                        collector.push(ConstructKind::ConstBinding, name, child, None, None);
                    }
                }
                "preproc_function_def" if owner.is_none() => {
                    if let Some(name) = child.child_by_field_name("name") {
                        collector.push(ConstructKind::Macro, name, child, None, None);
                    }
                }
                "template_declaration" | "linkage_specification" | "declaration_list"
                | "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif" | "ERROR" => {
                    self.walk(child, owner, collector)
                }
                _ => {}
            }
        }
    }

    /// A function definition, or a prototype when `prototype` is set.
    ///
    /// `Type::name` declarators are methods of `Type` even outside its body.
    fn function(
        &mut self,
        node: Node,
        declarator: Node,
        owner: Option<&str>,
        prototype: bool,
        collector: &mut Collector,
    ) {
        let Some(declarator) = function_declarator(declarator) else {
            return;
        };
        let Some(name_node) = declarator.child_by_field_name("declarator") else {
            return;
        };
        let (scope, name_node) = unqualify(name_node, collector);
        let parent = owner.map(str::to_string).or(scope);
        let kind = if parent.is_some() {
            ConstructKind::Method
        } else {
            ConstructKind::Function
        };

        let signature = collector.signature(node, node.child_by_field_name("body"));
        let before = collector.output.constructs.len();
        collector.push(kind, name_node, node, parent.as_deref(), signature);
        if prototype && collector.output.constructs.len() > before {
            self.prototypes.insert(before);
        }
    }

    /// Prototypes, globals and member declarations.
    fn declaration(&mut self, node: Node, owner: Option<&str>, collector: &mut Collector) {
        if let Some(spec) = node.child_by_field_name("type") {
            if is_specifier(spec) {
                self.specifier(spec, node, owner, collector);
            }
        }

        let declarators: Vec<Node> = node
            .children_by_field_name("declarator", &mut node.walk())
            .collect();
        for declarator in declarators {
            if function_declarator(declarator).is_some() {
                // Member function declarations are the method's only record
                // when it is defined out of line in another file.
                self.function(node, declarator, owner, owner.is_none(), collector);
                continue;
            }
            // Data members are not recorded
            if owner.is_some() {
                continue;
            }
            let Some(name) = variable_name(declarator) else {
                continue;
            };
            let kind = if is_const(node, collector) {
                ConstructKind::ConstBinding
            } else {
                ConstructKind::Binding
            };
            collector.push(kind, name, node, None, None);
        }
    }

    /// `struct`/`class`/`union`/`enum` with a body; forward declarations are skipped.
    fn specifier(&mut self, spec: Node, span: Node, owner: Option<&str>, collector: &mut Collector) {
        let Some(body) = spec.child_by_field_name("body") else {
            return;
        };
        let Some(name_node) = spec.child_by_field_name("name") else {
            return;
        };
        let (_, name_node) = unqualify(name_node, collector);
        collector.push(specifier_kind(spec), name_node, span, owner, None);

        if matches!(spec.kind(), "class_specifier" | "struct_specifier") {
            let type_name = collector.text(name_node).to_string();
            self.walk(body, Some(&type_name), collector);
        }
    }

    fn drop_defined_prototypes(&self, collector: &mut Collector) {
        if self.prototypes.is_empty() {
            return;
        }
        let defined: HashSet<(String, Option<String>)> = collector
            .output
            .constructs
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.prototypes.contains(index))
            .map(|(_, c)| (c.name.clone(), c.parent.clone()))
            .collect();

        let mut index = 0;
        collector.output.constructs.retain(|construct| {
            let keep = !self.prototypes.contains(&index)
                || !defined.contains(&(construct.name.clone(), construct.parent.clone()));
            index += 1;
            keep
        });
    }
}

/// `typedef struct { ... } User;` names the struct; other typedefs are aliases.
fn type_definition(node: Node, owner: Option<&str>, collector: &mut Collector) {
    let Some(alias) = node
        .child_by_field_name("declarator")
        .and_then(variable_name)
    else {
        return;
    };
    let spec = node
        .child_by_field_name("type")
        .filter(|t| is_specifier(*t) && t.child_by_field_name("body").is_some());

    match spec {
        Some(spec) => {
            let named = spec.child_by_field_name("name");
            let kind = specifier_kind(spec);
            match named {
                Some(tag) if collector.text(tag) != collector.text(alias) => {
                    collector.push(kind, tag, node, owner, None);
                    collector.push(ConstructKind::TypeAlias, alias, node, owner, None);
                }
                _ => collector.push(kind, alias, node, owner, None),
            }
        }
        None => collector.push(ConstructKind::TypeAlias, alias, node, owner, None),
    }
}

fn is_specifier(node: Node) -> bool {
    matches!(
        node.kind(),
        "struct_specifier" | "union_specifier" | "class_specifier" | "enum_specifier"
    )
}

fn specifier_kind(spec: Node) -> ConstructKind {
    match spec.kind() {
        "class_specifier" => ConstructKind::Class,
        "enum_specifier" => ConstructKind::Enum,
        _ => ConstructKind::Struct,
    }
}

/// The function declarator under pointer, reference and parenthesized wrappers.
fn function_declarator(node: Node) -> Option<Node> {
    let mut current = node;
    loop {
        match current.kind() {
            "function_declarator" => return Some(current),
            "pointer_declarator" | "reference_declarator" | "parenthesized_declarator"
            | "attributed_declarator" | "init_declarator" => {
                current = current
                    .child_by_field_name("declarator")
                    .or_else(|| current.named_child(0))?;
            }
            _ => return None,
        }
    }
}

/// The identifier a declarator introduces, e.g. `buf` in `char *buf[8] = {0}`.
fn variable_name(node: Node) -> Option<Node> {
    let mut current = node;
    loop {
        match current.kind() {
            "identifier" | "type_identifier" | "field_identifier" => return Some(current),
            "pointer_declarator" | "reference_declarator" | "parenthesized_declarator"
            | "array_declarator" | "init_declarator" | "attributed_declarator"
            | "function_declarator" => {
                current = current
                    .child_by_field_name("declarator")
                    .or_else(|| current.named_child(0))?;
            }
            _ => return None,
        }
    }
}

/// Split `ns::Type::name` into the innermost scope (`Type`) and the name node.
fn unqualify<'tree>(node: Node<'tree>, collector: &Collector) -> (Option<String>, Node<'tree>) {
    let mut scope = None;
    let mut current = node;
    while current.kind() == "qualified_identifier" {
        if let Some(s) = current.child_by_field_name("scope") {
            let base = if s.kind() == "template_type" {
                s.child_by_field_name("name").unwrap_or(s)
            } else {
                s
            };
            scope = Some(collector.text(base).to_string());
        }
        match current.child_by_field_name("name") {
            Some(name) => current = name,
            None => break,
        }
    }
    if current.kind() == "template_type" {
        if let Some(name) = current.child_by_field_name("name") {
            current = name;
        }
    }
    (scope, current)
}

fn is_const(declaration: Node, collector: &Collector) -> bool {
    declaration
        .children(&mut declaration.walk())
        .filter(|c| c.kind() == "type_qualifier")
        .any(|q| matches!(collector.text(q), "const" | "constexpr"))
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
    fn test_c_constructs() {
        let source = r#"
#ifndef SAMPLE_H
#define SAMPLE_H
#include <stdio.h>

#define MAX_USERS 1000
#define MIN(a, b) ((a) < (b) ? (a) : (b))

typedef enum {
    STATUS_ACTIVE,
    STATUS_INACTIVE
} Status;

typedef struct {
    long id;
    char name[100];
} User;

struct node {
    struct node *next;
};

typedef long UserId;

static int user_count = 0;
const char *DEFAULT_NAME = "guest";

User* user_create(const char* name);
void log_info(const char* message);

/* Allocates a user. */
User* user_create(const char* name) {
    return NULL;
}

int main(void) {
    return 0;
}
#endif
"#;
        let output = CFamilyAdapter::new(CDialect::C).parse(source);
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

        let found = kinds(&output);
        assert!(found.contains(&("MAX_USERS", ConstructKind::ConstBinding, None)));
        assert!(found.contains(&("MIN", ConstructKind::Macro, None)));
        assert!(found.contains(&("Status", ConstructKind::Enum, None)));
        assert!(found.contains(&("User", ConstructKind::Struct, None)));
        assert!(found.contains(&("node", ConstructKind::Struct, None)));
        assert!(found.contains(&("UserId", ConstructKind::TypeAlias, None)));
        assert!(found.contains(&("user_count", ConstructKind::Binding, None)));
        assert!(found.contains(&("DEFAULT_NAME", ConstructKind::ConstBinding, None)));
        assert!(found.contains(&("log_info", ConstructKind::Function, None)));
        assert!(found.contains(&("main", ConstructKind::Function, None)));
        assert!(!found.iter().any(|(name, _, _)| *name == "SAMPLE_H"));

        // The prototype gives way to the definition
        let creates: Vec<_> = output
            .constructs
            .iter()
            .filter(|c| c.name == "user_create")
            .collect();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].signature.as_deref(), Some("User* user_create(const char* name)"));
        assert_eq!(creates[0].documentation.as_deref(), Some("Allocates a user."));
    }

    #[test]
    fn test_cpp_constructs() {
        let source = r#"
namespace amp {

enum class Role { Admin, Guest };

template<typename T>
class IRepository {
public:
    virtual ~IRepository() = default;
    virtual T save(const T& entity) = 0;
};

class User : public IRepository<User> {
private:
    std::string name_;

public:
    User() : name_("") {}
    const std::string& getName() const { return name_; }
    User save(const User& entity) override;
};

User User::save(const User& entity) {
    return entity;
}

using UserList = std::vector<User>;

namespace utils {
bool isValidName(const std::string& name) {
    return !name.empty();
}
}

}
"#;
        let output = CFamilyAdapter::new(CDialect::Cpp).parse(source);
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

        let found = kinds(&output);
        assert!(found.contains(&("amp", ConstructKind::Module, None)));
        assert!(found.contains(&("Role", ConstructKind::Enum, None)));
        assert!(found.contains(&("IRepository", ConstructKind::Class, None)));
        assert!(found.contains(&("save", ConstructKind::Method, Some("IRepository"))));
        assert!(found.contains(&("User", ConstructKind::Class, None)));
        assert!(found.contains(&("User", ConstructKind::Method, Some("User"))));
        assert!(found.contains(&("getName", ConstructKind::Method, Some("User"))));
        assert!(found.contains(&("UserList", ConstructKind::TypeAlias, None)));
        assert!(found.contains(&("isValidName", ConstructKind::Function, None)));
        assert!(!found.iter().any(|(name, _, _)| *name == "name_"));

        // In-class declaration plus out-of-line definition
        let saves = found
            .iter()
            .filter(|(name, _, parent)| *name == "save" && *parent == Some("User"))
            .count();
        assert_eq!(saves, 2);
    }
}
