// Rust scope graph construction.
//
// Items (fn/struct/enum/trait/mod/use) are visible throughout their scope,
// so every item definition is hoisted. `let` bindings are positional.
// `impl Trait for Type` blocks attach the trait to the type's superclass
// list at build time; associated functions index as methods with the impl
// target as their container.

use std::path::Path;

use tree_sitter::Node;

use crate::scope_graph::{BoundValue, ImportKind, RefKind, ReturnedValue, ScopeGraph, ScopeId, ScopeKind};
use crate::{Access, Result, SymbolKind};

use super::LanguageSupport;
use super::helpers::{
    ScopeGraphBuilder, child_by_field, doc_comment_above, find_child_by_kind, node_range, node_text,
};

#[derive(Debug)]
pub struct RustSupport;

impl LanguageSupport for RustSupport {
    fn id(&self) -> &'static str {
        "rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_rust::LANGUAGE.into()
    }

    fn build_scope_graph(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<ScopeGraph> {
        let mut builder =
            ScopeGraphBuilder::new(path, self.id(), tree.root_node().range().into());
        let root = builder.root();
        walk_scope(&mut builder, source, tree.root_node(), root, false);
        Ok(builder.build())
    }
}

fn walk_scope(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    in_test: bool,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        dispatch_node(builder, source, child, scope, in_test, None);
    }
}

fn dispatch_node(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    in_test: bool,
    container: Option<&str>,
) {
    match node.kind() {
        "function_item" => {
            scope_function(builder, source, node, scope, in_test, container);
        }
        "function_signature_item" => {
            // Trait method signature without a body — not callable.
            if let Some(name_node) = child_by_field(node, "name") {
                let name = node_text(name_node, source).to_string();
                let def = builder.add_definition(
                    scope,
                    &name,
                    SymbolKind::Property,
                    node_range(name_node),
                );
                def.enclosing_range = Some(node_range(node));
                def.hoisted = true;
                def.container = container.map(str::to_string);
            }
        }
        "struct_item" | "union_item" => {
            scope_named_item(builder, source, node, scope, SymbolKind::Class, in_test);
        }
        "enum_item" => {
            scope_enum(builder, source, node, scope, in_test);
        }
        "trait_item" => {
            scope_trait(builder, source, node, scope, in_test);
        }
        "type_item" => {
            scope_named_item(builder, source, node, scope, SymbolKind::TypeAlias, in_test);
        }
        "impl_item" => {
            scope_impl(builder, source, node, scope, in_test);
        }
        "mod_item" => {
            scope_mod(builder, source, node, scope, in_test);
        }
        "use_declaration" => {
            scope_use(builder, source, node, scope);
        }
        "const_item" | "static_item" => {
            if let Some(name_node) = child_by_field(node, "name") {
                let name = node_text(name_node, source).to_string();
                let def = builder.add_definition(
                    scope,
                    &name,
                    SymbolKind::Constant,
                    node_range(name_node),
                );
                def.hoisted = true;
                def.exported = has_pub(node);
                def.access = has_pub(node).then_some(Access::Public);
            }
        }
        "let_declaration" => {
            scope_let(builder, source, node, scope, in_test);
        }
        "call_expression" => {
            scope_call(builder, source, node, scope, in_test);
        }
        "return_statement" | "expression_statement" => {
            scope_return_or_expr(builder, source, node, scope, in_test);
        }
        "block" => {
            let block = builder.open_scope(scope, ScopeKind::Block, node_range(node));
            walk_scope(builder, source, node, block, in_test);
        }
        "for_expression" => {
            let for_scope = builder.open_scope(scope, ScopeKind::For, node_range(node));
            if let Some(pattern) = child_by_field(node, "pattern") {
                bind_pattern(builder, source, pattern, for_scope);
            }
            if let Some(value) = child_by_field(node, "value") {
                dispatch_node(builder, source, value, for_scope, in_test, None);
            }
            if let Some(body) = child_by_field(node, "body") {
                walk_scope(builder, source, body, for_scope, in_test);
            }
        }
        "macro_invocation" | "line_comment" | "block_comment" | "attribute_item" => {}
        _ => {
            walk_scope(builder, source, node, scope, in_test);
        }
    }
}

fn has_pub(node: Node<'_>) -> bool {
    find_child_by_kind(node, "visibility_modifier").is_some()
}

/// Scan preceding `attribute_item` siblings for a marker (`test`, `cfg(test)`).
fn has_attribute(node: Node<'_>, source: &str, marker: &str) -> bool {
    let mut current = node;
    while let Some(prev) = current.prev_sibling() {
        if prev.kind() != "attribute_item" {
            break;
        }
        if node_text(prev, source).contains(marker) {
            return true;
        }
        current = prev;
    }
    false
}

fn scope_function(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    in_test: bool,
    container: Option<&str>,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, source).to_string();
    let kind = if container.is_some() {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };

    let doc = doc_comment_above(node, source, "///");
    let def = builder.add_definition(scope, &name, kind, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.exported = has_pub(node);
    def.access = has_pub(node).then_some(Access::Public);
    def.is_test = in_test || has_attribute(node, source, "test");
    def.container = container.map(str::to_string);
    def.docstring = doc;
    if let Some(ret) = child_by_field(node, "return_type") {
        if ret.kind() == "type_identifier" {
            def.return_type = Some(node_text(ret, source).to_string());
        }
    }

    let func_scope = builder.open_scope(scope, ScopeKind::Function, node_range(node));
    if let Some(ret) = child_by_field(node, "return_type") {
        if ret.kind() == "type_identifier" {
            builder.add_reference(
                func_scope,
                node_text(ret, source),
                RefKind::Type,
                node_range(ret),
                None,
            );
        }
    }
    if let Some(params) = child_by_field(node, "parameters") {
        let mut cursor = params.walk();
        for param in params.children(&mut cursor) {
            if param.kind() != "parameter" {
                continue;
            }
            let Some(pattern) = child_by_field(param, "pattern") else {
                continue;
            };
            if pattern.kind() != "identifier" {
                continue;
            }
            let pname = node_text(pattern, source).to_string();
            let type_name = child_by_field(param, "type")
                .filter(|t| t.kind() == "type_identifier")
                .map(|t| node_text(t, source).to_string());
            if let Some(t) = child_by_field(param, "type") {
                if t.kind() == "type_identifier" {
                    builder.add_reference(
                        func_scope,
                        node_text(t, source),
                        RefKind::Type,
                        node_range(t),
                        None,
                    );
                }
            }
            let p = builder.add_definition(
                func_scope,
                &pname,
                SymbolKind::Parameter,
                node_range(pattern),
            );
            p.type_names = type_name.into_iter().collect();
        }
    }
    if let Some(body) = child_by_field(node, "body") {
        walk_scope(builder, source, body, func_scope, in_test);
    }
}

fn scope_named_item(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    kind: SymbolKind,
    _in_test: bool,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, source).to_string();
    let doc = doc_comment_above(node, source, "///");
    let def = builder.add_definition(scope, &name, kind, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.exported = has_pub(node);
    def.access = has_pub(node).then_some(Access::Public);
    def.docstring = doc;
}

fn scope_enum(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    _in_test: bool,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, source).to_string();
    let def = builder.add_definition(scope, &name, SymbolKind::Enum, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.exported = has_pub(node);
    def.docstring = doc_comment_above(node, source, "///");

    if let Some(body) = child_by_field(node, "body") {
        let body_scope = builder.open_scope(scope, ScopeKind::ClassBody, node_range(body));
        let mut cursor = body.walk();
        for variant in body.children(&mut cursor) {
            if variant.kind() != "enum_variant" {
                continue;
            }
            if let Some(vname) = child_by_field(variant, "name") {
                let text = node_text(vname, source).to_string();
                let d = builder.add_definition(
                    body_scope,
                    &text,
                    SymbolKind::EnumMember,
                    node_range(vname),
                );
                d.hoisted = true;
                d.container = Some(name.clone());
            }
        }
    }
}

fn scope_trait(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    in_test: bool,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, source).to_string();
    let def = builder.add_definition(scope, &name, SymbolKind::Interface, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.exported = has_pub(node);
    def.docstring = doc_comment_above(node, source, "///");

    if let Some(body) = child_by_field(node, "body") {
        let trait_scope = builder.open_scope(scope, ScopeKind::ClassBody, node_range(node));
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            dispatch_node(builder, source, member, trait_scope, in_test, Some(&name));
        }
    }
}

fn impl_type_name<'a>(node: Node<'a>, source: &'a str) -> Option<&'a str> {
    let ty = child_by_field(node, "type")?;
    match ty.kind() {
        "type_identifier" => Some(node_text(ty, source)),
        "generic_type" => child_by_field(ty, "type").map(|t| node_text(t, source)),
        _ => None,
    }
}

fn scope_impl(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    in_test: bool,
) {
    let Some(type_name) = impl_type_name(node, source).map(str::to_string) else {
        return;
    };

    if let Some(ty) = child_by_field(node, "type") {
        builder.add_reference(scope, &type_name, RefKind::Type, node_range(ty), None);
    }
    if let Some(trait_node) = child_by_field(node, "trait") {
        let trait_name = node_text(trait_node, source);
        builder.add_reference(scope, trait_name, RefKind::Type, node_range(trait_node), None);
        builder.note_trait_impl(&type_name, trait_name);
    }

    let impl_scope = builder.open_scope(scope, ScopeKind::ClassBody, node_range(node));
    if let Some(body) = child_by_field(node, "body") {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            dispatch_node(builder, source, member, impl_scope, in_test, Some(&type_name));
        }
    }
}

fn scope_mod(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    in_test: bool,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, source).to_string();
    let def = builder.add_definition(scope, &name, SymbolKind::Namespace, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.exported = has_pub(node);

    let mod_is_test = in_test || has_attribute(node, source, "cfg(test)");
    if let Some(body) = child_by_field(node, "body") {
        let mod_scope = builder.open_scope(scope, ScopeKind::Block, node_range(body));
        walk_scope(builder, source, body, mod_scope, mod_is_test);
    }
}

// ── Use declarations ──────────────────────────────────────────────────

fn scope_use(builder: &mut ScopeGraphBuilder, source: &str, node: Node<'_>, scope: ScopeId) {
    let kind = if has_pub(node) {
        ImportKind::ReExport
    } else {
        ImportKind::Named
    };
    if let Some(arg) = child_by_field(node, "argument") {
        collect_use_bindings(builder, source, arg, scope, "", kind);
    }
}

fn collect_use_bindings(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    prefix: &str,
    kind: ImportKind,
) {
    match node.kind() {
        "scoped_identifier" => {
            // use a::b::c — module path a::b, local name c
            let path = child_by_field(node, "path").map_or("", |n| node_text(n, source));
            let name = child_by_field(node, "name").map_or("", |n| node_text(n, source));
            if !name.is_empty() {
                let module = join_path(prefix, path);
                builder.add_import(scope, name, None, &module, kind, node_range(node));
            }
        }
        "identifier" => {
            let name = node_text(node, source);
            builder.add_import(scope, name, None, prefix, kind, node_range(node));
        }
        "use_as_clause" => {
            // use a::b as c
            if let Some(path_node) = child_by_field(node, "path") {
                let (module, original) = match path_node.kind() {
                    "scoped_identifier" => (
                        join_path(
                            prefix,
                            child_by_field(path_node, "path")
                                .map_or("", |n| node_text(n, source)),
                        ),
                        child_by_field(path_node, "name")
                            .map_or("", |n| node_text(n, source)),
                    ),
                    _ => (prefix.to_string(), node_text(path_node, source)),
                };
                let alias = child_by_field(node, "alias").map_or(original, |n| node_text(n, source));
                if !original.is_empty() {
                    builder.add_import(
                        scope,
                        alias,
                        (alias != original).then_some(original),
                        &module,
                        kind,
                        node_range(node),
                    );
                }
            }
        }
        "scoped_use_list" => {
            // use a::{b, c as d}
            let path = child_by_field(node, "path").map_or("", |n| node_text(n, source));
            let module = join_path(prefix, path);
            if let Some(list) = find_child_by_kind(node, "use_list") {
                let mut cursor = list.walk();
                for child in list.children(&mut cursor) {
                    collect_use_bindings(builder, source, child, scope, &module, kind);
                }
            }
        }
        "use_list" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_use_bindings(builder, source, child, scope, prefix, kind);
            }
        }
        "use_wildcard" => {
            // use a::* — everything the module exports
            let path = node
                .named_child(0)
                .map_or("", |n| node_text(n, source));
            let module = join_path(prefix, path);
            builder.add_import(scope, "*", None, &module, kind, node_range(node));
        }
        _ => {}
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}::{path}")
    }
}

// ── Expressions ───────────────────────────────────────────────────────

fn bind_pattern(builder: &mut ScopeGraphBuilder, source: &str, pattern: Node<'_>, scope: ScopeId) {
    match pattern.kind() {
        "identifier" => {
            builder.add_definition(
                scope,
                node_text(pattern, source),
                SymbolKind::Variable,
                node_range(pattern),
            );
        }
        "tuple_pattern" | "mut_pattern" | "reference_pattern" => {
            let mut cursor = pattern.walk();
            for child in pattern.children(&mut cursor) {
                bind_pattern(builder, source, child, scope);
            }
        }
        _ => {}
    }
}

fn scope_let(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    in_test: bool,
) {
    let Some(pattern) = child_by_field(node, "pattern") else {
        return;
    };

    if pattern.kind() == "identifier" {
        let name = node_text(pattern, source).to_string();
        let type_name = child_by_field(node, "type")
            .filter(|t| t.kind() == "type_identifier")
            .map(|t| node_text(t, source).to_string());
        let def = builder.add_definition(scope, &name, SymbolKind::Variable, node_range(pattern));
        def.type_names = type_name.into_iter().collect();

        if let Some(value) = child_by_field(node, "value") {
            let bound = bound_value_of(value, source);
            if let Some(bound) = bound {
                builder.add_binding(scope, &name, node_range(node), bound);
            }
            dispatch_node(builder, source, value, scope, in_test, None);
        }
        return;
    }

    bind_pattern(builder, source, pattern, scope);
    if let Some(value) = child_by_field(node, "value") {
        dispatch_node(builder, source, value, scope, in_test, None);
    }
}

fn bound_value_of(value: Node<'_>, source: &str) -> Option<BoundValue> {
    match value.kind() {
        // C::new(..) and C { .. } both construct a C
        "call_expression" => {
            let func = child_by_field(value, "function")?;
            match func.kind() {
                "scoped_identifier" => {
                    let path = child_by_field(func, "path").map(|n| node_text(n, source))?;
                    let name = child_by_field(func, "name").map(|n| node_text(n, source))?;
                    if name == "new" {
                        Some(BoundValue::Constructed {
                            class_name: path.to_string(),
                        })
                    } else {
                        None
                    }
                }
                "identifier" => Some(BoundValue::CallResult {
                    callee: node_text(func, source).to_string(),
                }),
                _ => None,
            }
        }
        "struct_expression" => child_by_field(value, "name").map(|n| BoundValue::Constructed {
            class_name: node_text(n, source).to_string(),
        }),
        "identifier" => Some(BoundValue::Copied {
            source: node_text(value, source).to_string(),
        }),
        _ => None,
    }
}

fn scope_call(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    in_test: bool,
) {
    if let Some(func) = child_by_field(node, "function") {
        match func.kind() {
            "identifier" => {
                builder.add_reference(
                    scope,
                    node_text(func, source),
                    RefKind::Call,
                    node_range(func),
                    None,
                );
            }
            "field_expression" => {
                // x.method()
                if let Some(field) = child_by_field(func, "field") {
                    let receiver = child_by_field(func, "value")
                        .filter(|v| matches!(v.kind(), "identifier" | "self"))
                        .map(|v| node_text(v, source).to_string());
                    builder.add_reference(
                        scope,
                        node_text(field, source),
                        RefKind::MethodCall,
                        node_range(field),
                        receiver,
                    );
                }
                if let Some(value) = child_by_field(func, "value") {
                    dispatch_node(builder, source, value, scope, in_test, None);
                }
            }
            "scoped_identifier" => {
                // Type::assoc() — a method call with the path as receiver
                if let (Some(path), Some(name)) =
                    (child_by_field(func, "path"), child_by_field(func, "name"))
                {
                    builder.add_reference(
                        scope,
                        node_text(name, source),
                        RefKind::MethodCall,
                        node_range(name),
                        Some(node_text(path, source).to_string()),
                    );
                }
            }
            _ => {
                dispatch_node(builder, source, func, scope, in_test, None);
            }
        }
    }

    if let Some(args) = child_by_field(node, "arguments") {
        let call_range = node_range(node);
        let mut cursor = args.walk();
        for arg in args.children(&mut cursor) {
            if arg.kind() == "identifier" {
                let name = node_text(arg, source);
                builder.add_reference(scope, name, RefKind::Read, node_range(arg), None);
                builder.add_value_use(scope, name, call_range);
            } else {
                dispatch_node(builder, source, arg, scope, in_test, None);
            }
        }
    }
}

fn scope_return_or_expr(
    builder: &mut ScopeGraphBuilder,
    source: &str,
    node: Node<'_>,
    scope: ScopeId,
    in_test: bool,
) {
    if node.kind() == "return_statement" {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "identifier" => builder.add_return(
                    scope,
                    node_range(node),
                    ReturnedValue::Named {
                        name: node_text(child, source).to_string(),
                    },
                ),
                "call_expression" | "struct_expression" => {
                    if let Some(BoundValue::Constructed { class_name }) =
                        bound_value_of(child, source)
                    {
                        builder.add_return(
                            scope,
                            node_range(node),
                            ReturnedValue::Constructed { class_name },
                        );
                    }
                    dispatch_node(builder, source, child, scope, in_test, None);
                }
                _ => dispatch_node(builder, source, child, scope, in_test, None),
            }
        }
    } else {
        walk_scope(builder, source, node, scope, in_test);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
