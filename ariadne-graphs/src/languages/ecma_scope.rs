// Shared ES module scope graph construction for TypeScript and JavaScript.
//
// Handles all ECMAScript patterns common to both languages:
// - function/class/method declarations with hoisting, arrow-function bindings
// - import_statement (named, default, namespace) and export_statement
//   (declarations, named exports, aliased and wildcard re-exports)
// - call/new expressions, member calls with receivers, write references
// - assignment and collection-literal facts for the type tracker
// - TypeScript-specific: interfaces, enums, type aliases, namespaces,
//   parameter/return type annotations, accessibility modifiers, decorators

use tree_sitter::Node;

use crate::scope_graph::{BoundValue, ImportKind, RefKind, ReturnedValue, ScopeId, ScopeKind};
use crate::{Access, SymbolKind, TextRange};

use super::ScopeGraphBuilder;
use super::helpers::{block_doc_comment, child_by_field, find_child_by_kind, node_range, node_text};

/// Per-file context shared by the walker functions.
#[derive(Debug)]
pub struct EcmaCtx<'a> {
    pub source: &'a str,
    /// The file is named `*.test.*` or `*.spec.*`.
    pub is_test_file: bool,
}

/// Walk the children of `node`, dispatching each to its handler.
pub fn walk_scope(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
    module_level: bool,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        dispatch_node(builder, ctx, child, scope, module_level);
    }
}

fn dispatch_node(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
    module_level: bool,
) {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            scope_function_decl(builder, ctx, node, scope);
        }
        "class_declaration" => {
            scope_class_decl(builder, ctx, node, scope);
        }
        "interface_declaration" => {
            scope_interface_decl(builder, ctx, node, scope);
        }
        "enum_declaration" => {
            scope_enum_decl(builder, ctx, node, scope);
        }
        "type_alias_declaration" => {
            if let Some(name_node) = child_by_field(node, "name") {
                let name = node_text(name_node, ctx.source);
                let def = builder.add_definition(
                    scope,
                    name,
                    SymbolKind::TypeAlias,
                    node_range(name_node),
                );
                def.enclosing_range = Some(node_range(node));
                def.hoisted = true;
            }
        }
        "internal_module" => {
            // TS `namespace X { ... }`
            if let Some(name_node) = child_by_field(node, "name") {
                let name = node_text(name_node, ctx.source);
                let def = builder.add_definition(
                    scope,
                    name,
                    SymbolKind::Namespace,
                    node_range(name_node),
                );
                def.enclosing_range = Some(node_range(node));
                def.hoisted = true;
                let ns_scope = builder.open_scope(scope, ScopeKind::Block, node_range(node));
                if let Some(body) = child_by_field(node, "body") {
                    walk_scope(builder, ctx, body, ns_scope, false);
                }
            }
        }
        "import_statement" => {
            scope_import(builder, ctx, node, scope);
        }
        "export_statement" => {
            scope_export(builder, ctx, node, scope, module_level);
        }
        "lexical_declaration" | "variable_declaration" => {
            scope_var_decl(builder, ctx, node, scope);
        }
        "expression_statement" => {
            walk_scope(builder, ctx, node, scope, false);
        }
        "assignment_expression" => {
            scope_assignment(builder, ctx, node, scope);
        }
        "augmented_assignment_expression" => {
            if let Some(left) = child_by_field(node, "left") {
                if left.kind() == "identifier" {
                    let name = node_text(left, ctx.source);
                    builder.add_reference(scope, name, RefKind::Write, node_range(left), None);
                }
            }
            walk_scope(builder, ctx, node, scope, false);
        }
        "call_expression" => {
            scope_call(builder, ctx, node, scope);
        }
        "new_expression" => {
            scope_new(builder, ctx, node, scope);
        }
        "arrow_function" | "function_expression" | "function" => {
            scope_anonymous_function(builder, ctx, node, scope);
        }
        "return_statement" => {
            scope_return(builder, ctx, node, scope);
        }
        "statement_block" => {
            let block = builder.open_scope(scope, ScopeKind::Block, node_range(node));
            walk_scope(builder, ctx, node, block, false);
        }
        "for_statement" | "for_in_statement" => {
            let for_scope = builder.open_scope(scope, ScopeKind::For, node_range(node));
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                // The loop body block shares the for scope
                if child.kind() == "statement_block" {
                    walk_scope(builder, ctx, child, for_scope, false);
                } else {
                    dispatch_node(builder, ctx, child, for_scope, false);
                }
            }
        }
        "catch_clause" => {
            let catch_scope = builder.open_scope(scope, ScopeKind::Catch, node_range(node));
            if let Some(param) = child_by_field(node, "parameter") {
                if param.kind() == "identifier" {
                    let name = node_text(param, ctx.source);
                    builder.add_definition(
                        catch_scope,
                        name,
                        SymbolKind::Parameter,
                        node_range(param),
                    );
                }
            }
            if let Some(body) = child_by_field(node, "body") {
                walk_scope(builder, ctx, body, catch_scope, false);
            }
        }
        _ => {
            walk_scope(builder, ctx, node, scope, module_level);
        }
    }
}

// ── Declarations ──────────────────────────────────────────────────────

fn decorators_of(node: Node<'_>, source: &str) -> Vec<String> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .map(|c| node_text(c, source).trim_start_matches('@').to_string())
        .collect()
}

fn scope_function_decl(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, ctx.source).to_string();
    let doc = block_doc_comment(node, ctx.source);
    let return_type = annotated_type_names(node, ctx.source).into_iter().next();

    let def = builder.add_definition(scope, &name, SymbolKind::Function, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.is_test = ctx.is_test_file;
    def.docstring = doc;
    def.return_type = return_type;

    let func_scope = builder.open_scope(scope, ScopeKind::Function, node_range(node));
    if let Some(params) = child_by_field(node, "parameters") {
        scope_params(builder, ctx, params, func_scope);
    }
    if let Some(body) = child_by_field(node, "body") {
        walk_scope(builder, ctx, body, func_scope, false);
    }
}

fn scope_class_decl(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, ctx.source).to_string();

    let supers = heritage_names(node, ctx.source);
    let doc = block_doc_comment(node, ctx.source);
    let decs = decorators_of(node, ctx.source);

    let def = builder.add_definition(scope, &name, SymbolKind::Class, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.is_test = ctx.is_test_file;
    def.superclasses = supers;
    def.docstring = doc;
    def.decorators = decs;

    let class_scope = builder.open_scope(scope, ScopeKind::ClassBody, node_range(node));
    let mut has_constructor = false;
    if let Some(body) = child_by_field(node, "body") {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            match member.kind() {
                "method_definition" => {
                    has_constructor |=
                        scope_method_def(builder, ctx, member, class_scope, &name);
                }
                "public_field_definition" | "field_definition" => {
                    scope_field_def(builder, ctx, member, class_scope, &name);
                }
                "abstract_method_signature" | "method_signature" => {
                    scope_member_signature(builder, ctx, member, class_scope, &name);
                }
                _ => dispatch_node(builder, ctx, member, class_scope, false),
            }
        }
    }

    // `new X()` always needs a callable target, declared or not.
    if !has_constructor {
        let def = builder.add_definition(
            class_scope,
            "constructor",
            SymbolKind::Constructor,
            node_range(name_node),
        );
        def.enclosing_range = Some(node_range(name_node));
        def.hoisted = true;
        def.container = Some(name);
    }
}

/// Collect `extends` / `implements` names, declaration order.
fn heritage_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let Some(heritage) = find_child_by_kind(node, "class_heritage") else {
        return names;
    };

    // TS nests extends_clause/implements_clause; JS puts the expression
    // directly under class_heritage.
    let mut cursor = heritage.walk();
    for clause in heritage.children(&mut cursor) {
        match clause.kind() {
            "extends_clause" | "implements_clause" => {
                let mut inner = clause.walk();
                for c in clause.children(&mut inner) {
                    if matches!(c.kind(), "identifier" | "type_identifier") {
                        names.push(node_text(c, source).to_string());
                    }
                }
            }
            "identifier" => names.push(node_text(clause, source).to_string()),
            _ => {}
        }
    }
    names
}

/// Returns true when the method is a constructor.
fn scope_method_def(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    class_scope: ScopeId,
    class_name: &str,
) -> bool {
    let Some(name_node) = child_by_field(node, "name") else {
        return false;
    };
    let name = node_text(name_node, ctx.source).to_string();
    let is_ctor = name == "constructor";
    let kind = if is_ctor {
        SymbolKind::Constructor
    } else {
        SymbolKind::Method
    };

    let access = accessibility_of(node, ctx.source);
    let doc = block_doc_comment(node, ctx.source);
    let decs = decorators_of(node, ctx.source);
    let return_type = annotated_type_names(node, ctx.source).into_iter().next();

    let def = builder.add_definition(class_scope, &name, kind, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.is_test = ctx.is_test_file;
    def.container = Some(class_name.to_string());
    def.access = access;
    def.docstring = doc;
    def.decorators = decs;
    def.return_type = return_type;

    let method_scope = builder.open_scope(class_scope, ScopeKind::Function, node_range(node));
    if let Some(params) = child_by_field(node, "parameters") {
        scope_params(builder, ctx, params, method_scope);
    }
    if let Some(body) = child_by_field(node, "body") {
        walk_scope(builder, ctx, body, method_scope, false);
    }
    is_ctor
}

fn scope_field_def(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    class_scope: ScopeId,
    class_name: &str,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, ctx.source).to_string();
    let value = child_by_field(node, "value");
    let is_callable = value.is_some_and(|v| matches!(v.kind(), "arrow_function" | "function"));
    let kind = if is_callable {
        SymbolKind::Method
    } else {
        SymbolKind::Property
    };

    let access = accessibility_of(node, ctx.source);
    let def = builder.add_definition(class_scope, &name, kind, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.container = Some(class_name.to_string());
    def.access = access;

    if let Some(value) = value {
        if is_callable {
            let func_scope = builder.open_scope(class_scope, ScopeKind::Function, node_range(value));
            if let Some(params) = child_by_field(value, "parameters") {
                scope_params(builder, ctx, params, func_scope);
            }
            if let Some(body) = child_by_field(value, "body") {
                walk_body_or_expression(builder, ctx, body, func_scope);
            }
        } else {
            dispatch_node(builder, ctx, value, class_scope, false);
        }
    }
}

/// Interface/abstract member signatures index as non-callable properties;
/// dispatch on an interface-typed receiver fans out to implementations.
fn scope_member_signature(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    body_scope: ScopeId,
    owner_name: &str,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, ctx.source).to_string();
    let def = builder.add_definition(body_scope, &name, SymbolKind::Property, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.container = Some(owner_name.to_string());
}

fn scope_interface_decl(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, ctx.source).to_string();

    let mut supers = Vec::new();
    if let Some(ext) = find_child_by_kind(node, "extends_type_clause") {
        let mut cursor = ext.walk();
        for c in ext.children(&mut cursor) {
            if c.kind() == "type_identifier" {
                supers.push(node_text(c, ctx.source).to_string());
            }
        }
    }

    let doc = block_doc_comment(node, ctx.source);
    let def = builder.add_definition(scope, &name, SymbolKind::Interface, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.superclasses = supers;
    def.docstring = doc;

    let body_scope = builder.open_scope(scope, ScopeKind::ClassBody, node_range(node));
    if let Some(body) = child_by_field(node, "body") {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            if matches!(member.kind(), "property_signature" | "method_signature") {
                scope_member_signature(builder, ctx, member, body_scope, &name);
            }
        }
    }
}

fn scope_enum_decl(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, ctx.source).to_string();
    let def = builder.add_definition(scope, &name, SymbolKind::Enum, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;

    let body_scope = builder.open_scope(scope, ScopeKind::ClassBody, node_range(node));
    if let Some(body) = child_by_field(node, "body") {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            let member_name = match member.kind() {
                "property_identifier" => Some(member),
                "enum_assignment" => child_by_field(member, "name"),
                _ => None,
            };
            if let Some(mn) = member_name {
                let text = node_text(mn, ctx.source).to_string();
                let d = builder.add_definition(
                    body_scope,
                    &text,
                    SymbolKind::EnumMember,
                    node_range(mn),
                );
                d.hoisted = true;
                d.container = Some(name.clone());
            }
        }
    }
}

fn accessibility_of(node: Node<'_>, source: &str) -> Option<Access> {
    let modifier = find_child_by_kind(node, "accessibility_modifier")?;
    match node_text(modifier, source) {
        "public" => Some(Access::Public),
        "protected" => Some(Access::Protected),
        "private" => Some(Access::Private),
        _ => None,
    }
}

// ── Imports and exports ───────────────────────────────────────────────

fn import_source(node: Node<'_>, source: &str) -> Option<String> {
    let src = child_by_field(node, "source")?;
    Some(node_text(src, source).trim_matches(['\'', '"', '`']).to_string())
}

fn scope_import(builder: &mut ScopeGraphBuilder, ctx: &EcmaCtx<'_>, node: Node<'_>, scope: ScopeId) {
    let Some(module) = import_source(node, ctx.source) else {
        return;
    };
    let Some(clause) = find_child_by_kind(node, "import_clause") else {
        return; // Side-effect import: import './module'
    };

    let mut cursor = clause.walk();
    for child in clause.children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                // Default import: import foo from '...'
                let local = node_text(child, ctx.source);
                builder.add_import(
                    scope,
                    local,
                    None,
                    &module,
                    ImportKind::Default,
                    node_range(child),
                );
            }
            "named_imports" => {
                let mut inner = child.walk();
                for spec in child.children(&mut inner) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let name = child_by_field(spec, "name")
                        .map_or("", |n| node_text(n, ctx.source));
                    let alias = child_by_field(spec, "alias")
                        .map(|n| node_text(n, ctx.source));
                    builder.add_import(
                        scope,
                        alias.unwrap_or(name),
                        alias.map(|_| name),
                        &module,
                        ImportKind::Named,
                        node_range(spec),
                    );
                }
            }
            "namespace_import" => {
                let local = find_child_by_kind(child, "identifier")
                    .map_or("*", |n| node_text(n, ctx.source));
                builder.add_import(
                    scope,
                    local,
                    None,
                    &module,
                    ImportKind::Namespace,
                    node_range(child),
                );
            }
            _ => {}
        }
    }
}

fn scope_export(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
    module_level: bool,
) {
    // Case 1: export <declaration> / export default <declaration>
    if let Some(decl) = child_by_field(node, "declaration") {
        let exported_name = child_by_field(decl, "name").map(|n| node_text(n, ctx.source).to_string());
        dispatch_node(builder, ctx, decl, scope, module_level);
        if let Some(name) = exported_name {
            builder.flag_export(&name);
            if find_child_by_kind(node, "default").is_some() {
                builder.add_export_alias("default", &name, node_range(node));
            }
        } else if matches!(decl.kind(), "lexical_declaration" | "variable_declaration") {
            // export const a = ..., b = ...
            let mut cursor = decl.walk();
            for declarator in decl.children(&mut cursor) {
                if declarator.kind() == "variable_declarator" {
                    if let Some(n) = child_by_field(declarator, "name") {
                        if n.kind() == "identifier" {
                            builder.flag_export(node_text(n, ctx.source));
                        }
                    }
                }
            }
        }
        return;
    }

    // Case 2: export default <value>
    if let Some(value) = child_by_field(node, "value") {
        if matches!(
            value.kind(),
            "function_declaration" | "class_declaration" | "function"
        ) {
            if let Some(name_node) = child_by_field(value, "name") {
                let name = node_text(name_node, ctx.source).to_string();
                dispatch_node(builder, ctx, value, scope, module_level);
                builder.flag_export(&name);
                builder.add_export_alias("default", &name, node_range(node));
                return;
            }
        }
        // Anonymous default export
        let def = builder.add_definition(scope, "default", SymbolKind::Constant, node_range(node));
        def.exported = true;
        dispatch_node(builder, ctx, value, scope, false);
        return;
    }

    let source_module = import_source(node, ctx.source);

    // Case 3: export { a, b as c } [from './m']
    if let Some(clause) = find_child_by_kind(node, "export_clause") {
        let mut cursor = clause.walk();
        for spec in clause.children(&mut cursor) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let name = child_by_field(spec, "name").map_or("", |n| node_text(n, ctx.source));
            let alias = child_by_field(spec, "alias").map(|n| node_text(n, ctx.source));
            match &source_module {
                Some(module) => {
                    // Re-export: an import carrying the original name, visible
                    // to other files under the (possibly aliased) local name.
                    builder.add_import(
                        scope,
                        alias.unwrap_or(name),
                        alias.map(|_| name),
                        module,
                        ImportKind::ReExport,
                        node_range(spec),
                    );
                }
                None => match alias {
                    Some(alias) => builder.add_export_alias(alias, name, node_range(spec)),
                    None => builder.flag_export(name),
                },
            }
        }
        return;
    }

    // Case 4: export * from './m' (barrel) / export * as ns from './m'
    if let Some(module) = source_module {
        if let Some(ns) = find_child_by_kind(node, "namespace_export") {
            let local = find_child_by_kind(ns, "identifier")
                .map_or("*", |n| node_text(n, ctx.source));
            builder.add_import(scope, local, Some("*"), &module, ImportKind::ReExport, node_range(node));
        } else {
            builder.add_import(scope, "*", None, &module, ImportKind::ReExport, node_range(node));
        }
    }
}

// ── Variables and assignments ─────────────────────────────────────────

fn scope_var_decl(builder: &mut ScopeGraphBuilder, ctx: &EcmaCtx<'_>, node: Node<'_>, scope: ScopeId) {
    let is_const = node
        .child(0)
        .is_some_and(|c| node_text(c, ctx.source) == "const");
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "variable_declarator" {
            scope_declarator(builder, ctx, child, scope, is_const);
        }
    }
}

fn scope_declarator(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
    is_const: bool,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    if name_node.kind() != "identifier" {
        // Destructuring patterns — walk the value for nested expressions only.
        if let Some(value) = child_by_field(node, "value") {
            dispatch_node(builder, ctx, value, scope, false);
        }
        return;
    }
    let name = node_text(name_node, ctx.source).to_string();
    let value = child_by_field(node, "value");
    let type_names = annotated_type_names(node, ctx.source);
    emit_type_refs(builder, node, scope, &type_names);

    let is_function_value =
        value.is_some_and(|v| matches!(v.kind(), "arrow_function" | "function_expression" | "function"));
    let kind = if is_function_value {
        SymbolKind::Function
    } else if is_const {
        SymbolKind::Constant
    } else {
        SymbolKind::Variable
    };

    let def = builder.add_definition(scope, &name, kind, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.is_test = ctx.is_test_file && is_function_value;
    def.type_names = type_names;
    if is_function_value {
        def.docstring = block_doc_comment(node.parent().unwrap_or(node), ctx.source);
    }

    let Some(value) = value else {
        return;
    };

    record_binding(builder, ctx, scope, &name, node_range(node), value);

    if is_function_value {
        let func_scope = builder.open_scope(scope, ScopeKind::Function, node_range(value));
        if let Some(params) = child_by_field(value, "parameters") {
            scope_params(builder, ctx, params, func_scope);
        } else if let Some(param) = child_by_field(value, "parameter") {
            // Single-parameter arrow without parentheses: x => ...
            let pname = node_text(param, ctx.source);
            builder.add_definition(func_scope, pname, SymbolKind::Parameter, node_range(param));
        }
        if let Some(body) = child_by_field(value, "body") {
            walk_body_or_expression(builder, ctx, body, func_scope);
        }
    } else {
        dispatch_node(builder, ctx, value, scope, false);
    }
}

/// Record what a variable was bound to, for the type tracker.
fn record_binding(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    scope: ScopeId,
    target: &str,
    range: TextRange,
    value: Node<'_>,
) {
    let bound = match value.kind() {
        "new_expression" => child_by_field(value, "constructor")
            .filter(|c| c.kind() == "identifier")
            .map(|c| BoundValue::Constructed {
                class_name: node_text(c, ctx.source).to_string(),
            }),
        "call_expression" => child_by_field(value, "function")
            .filter(|c| c.kind() == "identifier")
            .map(|c| BoundValue::CallResult {
                callee: node_text(c, ctx.source).to_string(),
            }),
        "identifier" => Some(BoundValue::Copied {
            source: node_text(value, ctx.source).to_string(),
        }),
        "object" | "array" => {
            let (members, spreads) = collection_members(value, ctx.source);
            if members.is_empty() && spreads.is_empty() {
                None
            } else {
                Some(BoundValue::Collection { members, spreads })
            }
        }
        _ => None,
    };
    if let Some(bound) = bound {
        builder.add_binding(scope, target, range, bound);
    }
}

/// Identifier values and spread sources inside an object/array literal.
fn collection_members(node: Node<'_>, source: &str) -> (Vec<String>, Vec<String>) {
    let mut members = Vec::new();
    let mut spreads = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "pair" => {
                if let Some(value) = child_by_field(child, "value") {
                    if value.kind() == "identifier" {
                        members.push(node_text(value, source).to_string());
                    }
                }
            }
            "shorthand_property_identifier" | "identifier" => {
                members.push(node_text(child, source).to_string());
            }
            "spread_element" => {
                if let Some(inner) = find_child_by_kind(child, "identifier") {
                    spreads.push(node_text(inner, source).to_string());
                }
            }
            _ => {}
        }
    }
    (members, spreads)
}

fn scope_assignment(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
) {
    if let Some(left) = child_by_field(node, "left") {
        match left.kind() {
            "identifier" => {
                let name = node_text(left, ctx.source).to_string();
                builder.add_reference(scope, &name, RefKind::Write, node_range(left), None);
                if let Some(value) = child_by_field(node, "right") {
                    record_binding(builder, ctx, scope, &name, node_range(node), value);
                }
            }
            "member_expression" => {
                if let Some(prop) = child_by_field(left, "property") {
                    let receiver = child_by_field(left, "object")
                        .filter(|o| matches!(o.kind(), "identifier" | "this"))
                        .map(|o| node_text(o, ctx.source).to_string());
                    builder.add_reference(
                        scope,
                        node_text(prop, ctx.source),
                        RefKind::Write,
                        node_range(prop),
                        receiver,
                    );
                }
            }
            "subscript_expression" => {
                if let Some(obj) = child_by_field(left, "object") {
                    if obj.kind() == "identifier" {
                        builder.add_reference(
                            scope,
                            node_text(obj, ctx.source),
                            RefKind::Write,
                            node_range(obj),
                            None,
                        );
                    }
                }
            }
            _ => {}
        }
    }
    if let Some(right) = child_by_field(node, "right") {
        dispatch_node(builder, ctx, right, scope, false);
    }
}

// ── Calls ─────────────────────────────────────────────────────────────

fn scope_call(builder: &mut ScopeGraphBuilder, ctx: &EcmaCtx<'_>, node: Node<'_>, scope: ScopeId) {
    if let Some(func) = child_by_field(node, "function") {
        match func.kind() {
            "identifier" => {
                builder.add_reference(
                    scope,
                    node_text(func, ctx.source),
                    RefKind::Call,
                    node_range(func),
                    None,
                );
            }
            "member_expression" => {
                if let Some(prop) = child_by_field(func, "property") {
                    let receiver = child_by_field(func, "object")
                        .filter(|o| matches!(o.kind(), "identifier" | "this"))
                        .map(|o| node_text(o, ctx.source).to_string());
                    builder.add_reference(
                        scope,
                        node_text(prop, ctx.source),
                        RefKind::MethodCall,
                        node_range(prop),
                        receiver,
                    );
                }
                // Chained receivers (foo().bar()) carry their own call refs.
                if let Some(obj) = child_by_field(func, "object") {
                    dispatch_node(builder, ctx, obj, scope, false);
                }
            }
            // obj[name]() — dynamic property call, deliberately unresolved.
            _ => {
                dispatch_node(builder, ctx, func, scope, false);
            }
        }
    }

    if let Some(args) = child_by_field(node, "arguments") {
        let call_range = node_range(node);
        let mut cursor = args.walk();
        for arg in args.children(&mut cursor) {
            match arg.kind() {
                "identifier" => {
                    // A named value passed without parentheses — both a read
                    // and an indirect-reachability fact.
                    let name = node_text(arg, ctx.source);
                    builder.add_reference(scope, name, RefKind::Read, node_range(arg), None);
                    builder.add_value_use(scope, name, call_range);
                }
                "object" | "array" => {
                    let (members, spreads) = collection_members(arg, ctx.source);
                    for member in members {
                        builder.add_value_use(scope, &member, call_range);
                    }
                    for spread in spreads {
                        builder.add_reference(scope, &spread, RefKind::Read, node_range(arg), None);
                    }
                    walk_scope(builder, ctx, arg, scope, false);
                }
                // register(ns.helper) — a member read passed as a value
                "member_expression" => {
                    if let Some(prop) = child_by_field(arg, "property") {
                        let receiver = child_by_field(arg, "object")
                            .filter(|o| o.kind() == "identifier")
                            .map(|o| node_text(o, ctx.source).to_string());
                        builder.add_reference(
                            scope,
                            node_text(prop, ctx.source),
                            RefKind::NamespaceMember,
                            node_range(prop),
                            receiver,
                        );
                    }
                }
                _ => dispatch_node(builder, ctx, arg, scope, false),
            }
        }
    }
}

fn scope_new(builder: &mut ScopeGraphBuilder, ctx: &EcmaCtx<'_>, node: Node<'_>, scope: ScopeId) {
    if let Some(ctor) = child_by_field(node, "constructor") {
        if ctor.kind() == "identifier" {
            builder.add_reference(
                scope,
                node_text(ctor, ctx.source),
                RefKind::ConstructorCall,
                node_range(ctor),
                None,
            );
        }
    }
    if let Some(args) = child_by_field(node, "arguments") {
        walk_scope(builder, ctx, args, scope, false);
    }
}

fn scope_anonymous_function(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
) {
    let func_scope = builder.open_scope(scope, ScopeKind::Function, node_range(node));
    if let Some(params) = child_by_field(node, "parameters") {
        scope_params(builder, ctx, params, func_scope);
    } else if let Some(param) = child_by_field(node, "parameter") {
        let pname = node_text(param, ctx.source);
        builder.add_definition(func_scope, pname, SymbolKind::Parameter, node_range(param));
    }
    if let Some(body) = child_by_field(node, "body") {
        walk_body_or_expression(builder, ctx, body, func_scope);
    }
}

fn scope_return(builder: &mut ScopeGraphBuilder, ctx: &EcmaCtx<'_>, node: Node<'_>, scope: ScopeId) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "new_expression" => {
                if let Some(ctor) = child_by_field(child, "constructor") {
                    if ctor.kind() == "identifier" {
                        builder.add_return(
                            scope,
                            node_range(node),
                            ReturnedValue::Constructed {
                                class_name: node_text(ctor, ctx.source).to_string(),
                            },
                        );
                    }
                }
                dispatch_node(builder, ctx, child, scope, false);
            }
            "identifier" => {
                builder.add_return(
                    scope,
                    node_range(node),
                    ReturnedValue::Named {
                        name: node_text(child, ctx.source).to_string(),
                    },
                );
            }
            "return" | ";" => {}
            _ => dispatch_node(builder, ctx, child, scope, false),
        }
    }
}

// ── Parameters and types ──────────────────────────────────────────────

fn scope_params(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    params_node: Node<'_>,
    func_scope: ScopeId,
) {
    let mut cursor = params_node.walk();
    for child in params_node.children(&mut cursor) {
        let name_node = match child.kind() {
            "identifier" => Some(child),
            "required_parameter" | "optional_parameter" => {
                child_by_field(child, "pattern").filter(|n| n.kind() == "identifier")
            }
            "rest_pattern" | "rest_parameter" => find_child_by_kind(child, "identifier"),
            // assignment_pattern: param with default value (e.g., x = 5)
            "assignment_pattern" => {
                child_by_field(child, "left").filter(|n| n.kind() == "identifier")
            }
            _ => None,
        };
        let Some(name_node) = name_node else {
            continue;
        };
        let name = node_text(name_node, ctx.source).to_string();
        let type_names = annotated_type_names(child, ctx.source);
        emit_type_refs(builder, child, func_scope, &type_names);
        let def = builder.add_definition(
            func_scope,
            &name,
            SymbolKind::Parameter,
            node_range(name_node),
        );
        def.type_names = type_names;
    }
}

/// Every named type in a `type`/`return_type` annotation, declaration
/// order. A union annotation contributes one entry per named arm
/// (`Foo | Bar` → both; `null`/`undefined` arms have no name and drop out).
fn annotated_type_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let Some(annotation) = child_by_field(node, "type")
        .or_else(|| child_by_field(node, "return_type"))
    else {
        return names;
    };
    let mut cursor = annotation.walk();
    if let Some(ty) = annotation.children(&mut cursor).find(|c| c.kind() != ":") {
        collect_named_types(ty, source, &mut names);
    }
    names
}

fn collect_named_types(ty: Node<'_>, source: &str, out: &mut Vec<String>) {
    match ty.kind() {
        "type_identifier" => out.push(node_text(ty, source).to_string()),
        "union_type" | "parenthesized_type" => {
            let mut cursor = ty.walk();
            for child in ty.children(&mut cursor) {
                collect_named_types(child, source, out);
            }
        }
        _ => {}
    }
}

fn emit_type_refs(
    builder: &mut ScopeGraphBuilder,
    node: Node<'_>,
    scope: ScopeId,
    type_names: &[String],
) {
    let range = child_by_field(node, "type")
        .or_else(|| child_by_field(node, "return_type"))
        .map_or_else(|| node_range(node), node_range);
    for type_name in type_names {
        builder.add_reference(scope, type_name, RefKind::Type, range, None);
    }
}

/// Arrow bodies are either a block or a bare expression.
fn walk_body_or_expression(
    builder: &mut ScopeGraphBuilder,
    ctx: &EcmaCtx<'_>,
    body: Node<'_>,
    func_scope: ScopeId,
) {
    if body.kind() == "statement_block" {
        walk_scope(builder, ctx, body, func_scope, false);
    } else {
        dispatch_node(builder, ctx, body, func_scope, false);
    }
}
