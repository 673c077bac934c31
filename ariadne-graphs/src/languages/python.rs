// Python scope graph construction.
//
// Python scoping notes that shape this walker:
// - Only modules, functions/lambdas, and class bodies open scopes; control
//   flow (if/for/while/with/try) does not.
// - Module and class-level names are late-bound, so function and class
//   definitions are treated as hoisted; assignment bindings are positional.
// - The first assignment to a name in a scope creates the binding; later
//   assignments in the same scope are writes.
// - Type annotations are matched by field name (`left`/`right` of a
//   `binary_operator`, `value` of a `subscript`), never by operator text,
//   so `X | None` is captured in both positions.

use std::path::Path;

use tree_sitter::Node;

use crate::scope_graph::{BoundValue, ImportKind, RefKind, ReturnedValue, ScopeId, ScopeKind};
use crate::{Access, Result, SymbolKind};
use crate::scope_graph::ScopeGraph;

use super::LanguageSupport;
use super::helpers::{ScopeGraphBuilder, child_by_field, find_child_by_kind, node_range, node_text};

#[derive(Debug)]
pub struct PythonSupport;

impl LanguageSupport for PythonSupport {
    fn id(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn build_scope_graph(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<ScopeGraph> {
        let ctx = PyCtx {
            source,
            is_test_file: is_test_path(path),
        };
        let mut builder =
            ScopeGraphBuilder::new(path, self.id(), tree.root_node().range().into());
        let root = builder.root();
        walk_scope(&mut builder, &ctx, tree.root_node(), root, true);
        let mut graph = builder.build();

        // Python exports every module-level binding by convention.
        for def in &mut graph.definitions {
            if def.scope == ScopeId::ROOT && !def.name.starts_with('<') {
                def.exported = true;
            }
        }
        Ok(graph)
    }
}

struct PyCtx<'a> {
    source: &'a str,
    is_test_file: bool,
}

fn is_test_path(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.starts_with("test_") || name.ends_with("_test.py")
}

fn walk_scope(
    builder: &mut ScopeGraphBuilder,
    ctx: &PyCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
    module_level: bool,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        dispatch_node(builder, ctx, child, scope, module_level, &[]);
    }
}

fn dispatch_node(
    builder: &mut ScopeGraphBuilder,
    ctx: &PyCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
    module_level: bool,
    decorators: &[String],
) {
    match node.kind() {
        "function_definition" => {
            scope_function_def(builder, ctx, node, scope, decorators, None);
        }
        "class_definition" => {
            scope_class_def(builder, ctx, node, scope, decorators);
        }
        "decorated_definition" => {
            let decs: Vec<String> = {
                let mut cursor = node.walk();
                node.children(&mut cursor)
                    .filter(|c| c.kind() == "decorator")
                    .map(|c| node_text(c, ctx.source).trim_start_matches('@').to_string())
                    .collect()
            };
            if let Some(def) = child_by_field(node, "definition") {
                dispatch_node(builder, ctx, def, scope, module_level, &decs);
            }
        }
        "import_statement" => {
            scope_import(builder, ctx, node, scope);
        }
        "import_from_statement" => {
            scope_from_import(builder, ctx, node, scope);
        }
        "expression_statement" | "block" | "module" => {
            walk_scope(builder, ctx, node, scope, module_level);
        }
        "assignment" => {
            scope_assignment(builder, ctx, node, scope);
        }
        "augmented_assignment" => {
            if let Some(left) = child_by_field(node, "left") {
                if left.kind() == "identifier" {
                    builder.add_reference(
                        scope,
                        node_text(left, ctx.source),
                        RefKind::Write,
                        node_range(left),
                        None,
                    );
                }
            }
            if let Some(right) = child_by_field(node, "right") {
                dispatch_node(builder, ctx, right, scope, false, &[]);
            }
        }
        "call" => {
            scope_call(builder, ctx, node, scope);
        }
        "lambda" => {
            let lambda_scope = builder.open_scope(scope, ScopeKind::Function, node_range(node));
            if let Some(params) = child_by_field(node, "parameters") {
                scope_params(builder, ctx, params, lambda_scope);
            }
            if let Some(body) = child_by_field(node, "body") {
                dispatch_node(builder, ctx, body, lambda_scope, false, &[]);
            }
        }
        "return_statement" => {
            scope_return(builder, ctx, node, scope);
        }
        "for_statement" => {
            // No new scope: loop variables land in the enclosing scope.
            if let Some(left) = child_by_field(node, "left") {
                bind_targets(builder, ctx, left, scope);
            }
            if let Some(right) = child_by_field(node, "right") {
                dispatch_node(builder, ctx, right, scope, false, &[]);
            }
            if let Some(body) = child_by_field(node, "body") {
                walk_scope(builder, ctx, body, scope, module_level);
            }
        }
        "with_statement" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "with_clause" {
                    let mut inner = child.walk();
                    for item in child.children(&mut inner) {
                        if item.kind() == "with_item" {
                            if let Some(as_pattern) =
                                find_child_by_kind(item, "as_pattern")
                            {
                                if let Some(alias) = child_by_field(as_pattern, "alias") {
                                    bind_targets(builder, ctx, alias, scope);
                                }
                            }
                            dispatch_node(builder, ctx, item, scope, false, &[]);
                        }
                    }
                } else {
                    dispatch_node(builder, ctx, child, scope, module_level, &[]);
                }
            }
        }
        "except_clause" => {
            // `except E as e:` binds e in the enclosing scope.
            if let Some(as_pattern) = find_child_by_kind(node, "as_pattern") {
                if let Some(alias) = child_by_field(as_pattern, "alias") {
                    bind_targets(builder, ctx, alias, scope);
                }
            }
            walk_scope(builder, ctx, node, scope, module_level);
        }
        "if_statement" => {
            if module_level && is_main_guard(node, ctx.source) {
                builder.set_main_guard();
            }
            walk_scope(builder, ctx, node, scope, module_level);
        }
        _ => {
            walk_scope(builder, ctx, node, scope, module_level);
        }
    }
}

fn is_main_guard(node: Node<'_>, source: &str) -> bool {
    child_by_field(node, "condition").is_some_and(|cond| {
        cond.kind() == "comparison_operator" && node_text(cond, source).contains("__name__")
    })
}

// ── Definitions ───────────────────────────────────────────────────────

fn access_by_convention(name: &str) -> Option<Access> {
    if name.starts_with("__") && !name.ends_with("__") {
        Some(Access::Private)
    } else if name.starts_with('_') {
        Some(Access::Protected)
    } else {
        None
    }
}

fn scope_function_def(
    builder: &mut ScopeGraphBuilder,
    ctx: &PyCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
    decorators: &[String],
    container: Option<&str>,
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, ctx.source).to_string();
    let is_ctor = container.is_some() && name == "__init__";
    let kind = if is_ctor {
        SymbolKind::Constructor
    } else if container.is_some() {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };

    let doc = docstring_of(node, ctx.source);
    let def = builder.add_definition(scope, &name, kind, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.is_test = ctx.is_test_file || name.starts_with("test_");
    def.access = access_by_convention(&name);
    def.container = container.map(str::to_string);
    def.docstring = doc;
    def.decorators = decorators.to_vec();

    if let Some(ret) = child_by_field(node, "return_type") {
        def.return_type = simple_type_name(ret, ctx.source);
    }

    let func_scope = builder.open_scope(scope, ScopeKind::Function, node_range(node));
    if let Some(ret) = child_by_field(node, "return_type") {
        emit_type_refs(builder, ctx, ret, func_scope);
    }
    if let Some(params) = child_by_field(node, "parameters") {
        scope_params(builder, ctx, params, func_scope);
    }
    if let Some(body) = child_by_field(node, "body") {
        walk_scope(builder, ctx, body, func_scope, false);
    }
}

fn scope_class_def(
    builder: &mut ScopeGraphBuilder,
    ctx: &PyCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
    decorators: &[String],
) {
    let Some(name_node) = child_by_field(node, "name") else {
        return;
    };
    let name = node_text(name_node, ctx.source).to_string();

    let mut supers = Vec::new();
    if let Some(args) = child_by_field(node, "superclasses") {
        let mut cursor = args.walk();
        for arg in args.children(&mut cursor) {
            if arg.kind() == "identifier" {
                supers.push(node_text(arg, ctx.source).to_string());
            }
        }
    }

    let doc = docstring_of(node, ctx.source);
    let def = builder.add_definition(scope, &name, SymbolKind::Class, node_range(name_node));
    def.enclosing_range = Some(node_range(node));
    def.hoisted = true;
    def.is_test = ctx.is_test_file;
    def.superclasses = supers;
    def.docstring = doc;
    def.decorators = decorators.to_vec();

    let class_scope = builder.open_scope(scope, ScopeKind::ClassBody, node_range(node));
    let mut has_constructor = false;
    if let Some(body) = child_by_field(node, "body") {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            match member.kind() {
                "function_definition" => {
                    has_constructor |= child_by_field(member, "name")
                        .is_some_and(|n| node_text(n, ctx.source) == "__init__");
                    scope_function_def(builder, ctx, member, class_scope, &[], Some(&name));
                }
                "decorated_definition" => {
                    let decs: Vec<String> = {
                        let mut c = member.walk();
                        member
                            .children(&mut c)
                            .filter(|c| c.kind() == "decorator")
                            .map(|c| {
                                node_text(c, ctx.source).trim_start_matches('@').to_string()
                            })
                            .collect()
                    };
                    if let Some(inner) = child_by_field(member, "definition") {
                        if inner.kind() == "function_definition" {
                            scope_function_def(builder, ctx, inner, class_scope, &decs, Some(&name));
                        } else {
                            dispatch_node(builder, ctx, inner, class_scope, false, &decs);
                        }
                    }
                }
                _ => dispatch_node(builder, ctx, member, class_scope, false, &[]),
            }
        }
    }

    if !has_constructor {
        let def = builder.add_definition(
            class_scope,
            "__init__",
            SymbolKind::Constructor,
            node_range(name_node),
        );
        def.enclosing_range = Some(node_range(name_node));
        def.hoisted = true;
        def.container = Some(name);
    }
}

/// Extract the docstring from the first statement of a function/class body.
fn docstring_of(node: Node<'_>, source: &str) -> Option<String> {
    let body = child_by_field(node, "body")?;
    let mut cursor = body.walk();
    let first_stmt = body.children(&mut cursor).next()?;

    if first_stmt.kind() != "expression_statement" {
        return None;
    }

    let mut inner_cursor = first_stmt.walk();
    let expr = first_stmt.children(&mut inner_cursor).next()?;

    if expr.kind() != "string" {
        return None;
    }

    let text = node_text(expr, source);
    let content = text
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
        .or_else(|| text.strip_prefix("'''").and_then(|s| s.strip_suffix("'''")))
        .unwrap_or(text)
        .trim()
        .to_string();

    if content.is_empty() { None } else { Some(content) }
}

// ── Imports ───────────────────────────────────────────────────────────

fn scope_import(builder: &mut ScopeGraphBuilder, ctx: &PyCtx<'_>, node: Node<'_>, scope: ScopeId) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let full = node_text(child, ctx.source);
                // `import os.path` binds local name "os" (first component)
                let local = full.split('.').next().unwrap_or(full);
                builder.add_import(
                    scope,
                    local,
                    None,
                    full,
                    ImportKind::Namespace,
                    node_range(child),
                );
            }
            "aliased_import" => {
                let name = child_by_field(child, "name").map_or("", |n| node_text(n, ctx.source));
                let alias =
                    child_by_field(child, "alias").map_or(name, |n| node_text(n, ctx.source));
                builder.add_import(
                    scope,
                    alias,
                    Some(name),
                    name,
                    ImportKind::Namespace,
                    node_range(child),
                );
            }
            _ => {}
        }
    }
}

fn scope_from_import(
    builder: &mut ScopeGraphBuilder,
    ctx: &PyCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
) {
    let Some(module_node) = child_by_field(node, "module_name") else {
        return;
    };
    let module = node_text(module_node, ctx.source).to_string();
    let module_id = module_node.id();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.id() == module_id {
            continue;
        }
        match child.kind() {
            "dotted_name" => {
                let name = node_text(child, ctx.source);
                builder.add_import(
                    scope,
                    name,
                    None,
                    &module,
                    ImportKind::Named,
                    node_range(child),
                );
            }
            "aliased_import" => {
                let name = child_by_field(child, "name").map_or("", |n| node_text(n, ctx.source));
                let alias =
                    child_by_field(child, "alias").map_or(name, |n| node_text(n, ctx.source));
                builder.add_import(
                    scope,
                    alias,
                    Some(name),
                    &module,
                    ImportKind::Named,
                    node_range(child),
                );
            }
            "wildcard_import" => {
                builder.add_import(
                    scope,
                    "*",
                    None,
                    &module,
                    ImportKind::Named,
                    node_range(child),
                );
            }
            _ => {}
        }
    }
}

// ── Assignments ───────────────────────────────────────────────────────

fn is_constant_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit())
}

/// First assignment in a scope defines; later ones write.
fn bind_targets(builder: &mut ScopeGraphBuilder, ctx: &PyCtx<'_>, node: Node<'_>, scope: ScopeId) {
    match node.kind() {
        "identifier" => {
            let name = node_text(node, ctx.source);
            if builder.defines(scope, name) {
                builder.add_reference(scope, name, RefKind::Write, node_range(node), None);
            } else {
                let kind = if is_constant_name(name) {
                    SymbolKind::Constant
                } else {
                    SymbolKind::Variable
                };
                let def = builder.add_definition(scope, name, kind, node_range(node));
                def.access = access_by_convention(name);
            }
        }
        "pattern_list" | "tuple_pattern" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                bind_targets(builder, ctx, child, scope);
            }
        }
        "attribute" => {
            if let Some(attr) = child_by_field(node, "attribute") {
                let receiver = child_by_field(node, "object")
                    .filter(|o| o.kind() == "identifier")
                    .map(|o| node_text(o, ctx.source).to_string());
                builder.add_reference(
                    scope,
                    node_text(attr, ctx.source),
                    RefKind::Write,
                    node_range(attr),
                    receiver,
                );
            }
        }
        "subscript" => {
            if let Some(value) = child_by_field(node, "value") {
                if value.kind() == "identifier" {
                    builder.add_reference(
                        scope,
                        node_text(value, ctx.source),
                        RefKind::Write,
                        node_range(value),
                        None,
                    );
                }
            }
        }
        _ => {}
    }
}

fn scope_assignment(
    builder: &mut ScopeGraphBuilder,
    ctx: &PyCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
) {
    let Some(left) = child_by_field(node, "left") else {
        return;
    };
    bind_targets(builder, ctx, left, scope);

    if let Some(type_node) = child_by_field(node, "type") {
        emit_type_refs(builder, ctx, type_node, scope);
        if left.kind() == "identifier" {
            let type_names = annotation_type_names(type_node, ctx.source);
            let name = node_text(left, ctx.source);
            if let Some(def) = builder.last_definition_named(name) {
                def.type_names = type_names;
            }
        }
    }

    let Some(right) = child_by_field(node, "right") else {
        return;
    };

    if left.kind() == "identifier" {
        let target = node_text(left, ctx.source).to_string();
        let bound = match right.kind() {
            "call" => child_by_field(right, "function")
                .filter(|f| f.kind() == "identifier")
                .map(|f| BoundValue::CallResult {
                    callee: node_text(f, ctx.source).to_string(),
                }),
            "identifier" => Some(BoundValue::Copied {
                source: node_text(right, ctx.source).to_string(),
            }),
            "dictionary" | "list" | "set" => {
                let (members, spreads) = collection_members(right, ctx.source);
                if members.is_empty() && spreads.is_empty() {
                    None
                } else {
                    Some(BoundValue::Collection { members, spreads })
                }
            }
            _ => None,
        };
        if let Some(bound) = bound {
            builder.add_binding(scope, &target, node_range(node), bound);
        }
    }

    dispatch_node(builder, ctx, right, scope, false, &[]);
}

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
            "identifier" => members.push(node_text(child, source).to_string()),
            "dictionary_splat" => {
                if let Some(inner) = find_child_by_kind(child, "identifier") {
                    spreads.push(node_text(inner, source).to_string());
                }
            }
            "list_splat" => {
                if let Some(inner) = find_child_by_kind(child, "identifier") {
                    spreads.push(node_text(inner, source).to_string());
                }
            }
            _ => {}
        }
    }
    (members, spreads)
}

// ── Calls and returns ─────────────────────────────────────────────────

fn scope_call(builder: &mut ScopeGraphBuilder, ctx: &PyCtx<'_>, node: Node<'_>, scope: ScopeId) {
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
            "attribute" => {
                if let Some(attr) = child_by_field(func, "attribute") {
                    let receiver = child_by_field(func, "object")
                        .filter(|o| o.kind() == "identifier")
                        .map(|o| node_text(o, ctx.source).to_string());
                    builder.add_reference(
                        scope,
                        node_text(attr, ctx.source),
                        RefKind::MethodCall,
                        node_range(attr),
                        receiver,
                    );
                }
                if let Some(obj) = child_by_field(func, "object") {
                    dispatch_node(builder, ctx, obj, scope, false, &[]);
                }
            }
            // d[name]() — dynamic, deliberately unresolved.
            _ => {
                dispatch_node(builder, ctx, func, scope, false, &[]);
            }
        }
    }

    if let Some(args) = child_by_field(node, "arguments") {
        let call_range = node_range(node);
        let mut cursor = args.walk();
        for arg in args.children(&mut cursor) {
            match arg.kind() {
                "identifier" => {
                    let name = node_text(arg, ctx.source);
                    builder.add_reference(scope, name, RefKind::Read, node_range(arg), None);
                    builder.add_value_use(scope, name, call_range);
                }
                "keyword_argument" => {
                    if let Some(value) = child_by_field(arg, "value") {
                        if value.kind() == "identifier" {
                            let name = node_text(value, ctx.source);
                            builder.add_reference(
                                scope,
                                name,
                                RefKind::Read,
                                node_range(value),
                                None,
                            );
                            builder.add_value_use(scope, name, call_range);
                        } else {
                            dispatch_node(builder, ctx, value, scope, false, &[]);
                        }
                    }
                }
                "dictionary" | "list" => {
                    let (members, spreads) = collection_members(arg, ctx.source);
                    for member in members {
                        builder.add_value_use(scope, &member, call_range);
                    }
                    for spread in spreads {
                        builder.add_reference(scope, &spread, RefKind::Read, node_range(arg), None);
                    }
                    walk_scope(builder, ctx, arg, scope, false);
                }
                _ => dispatch_node(builder, ctx, arg, scope, false, &[]),
            }
        }
    }
}

fn scope_return(builder: &mut ScopeGraphBuilder, ctx: &PyCtx<'_>, node: Node<'_>, scope: ScopeId) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "call" => {
                // `return C()` is a constructor call when C names a class;
                // the resolver validates that.
                if let Some(func) = child_by_field(child, "function") {
                    if func.kind() == "identifier" {
                        builder.add_return(
                            scope,
                            node_range(node),
                            ReturnedValue::Constructed {
                                class_name: node_text(func, ctx.source).to_string(),
                            },
                        );
                    }
                }
                dispatch_node(builder, ctx, child, scope, false, &[]);
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
            "return" => {}
            _ => dispatch_node(builder, ctx, child, scope, false, &[]),
        }
    }
}

// ── Parameters and type annotations ───────────────────────────────────

fn scope_params(
    builder: &mut ScopeGraphBuilder,
    ctx: &PyCtx<'_>,
    params_node: Node<'_>,
    func_scope: ScopeId,
) {
    let mut cursor = params_node.walk();
    for child in params_node.children(&mut cursor) {
        let (name_node, type_node) = match child.kind() {
            "identifier" => (Some(child), None),
            "typed_parameter" => (
                find_child_by_kind(child, "identifier"),
                child_by_field(child, "type"),
            ),
            "default_parameter" => (child_by_field(child, "name"), None),
            "typed_default_parameter" => {
                (child_by_field(child, "name"), child_by_field(child, "type"))
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                (find_child_by_kind(child, "identifier"), None)
            }
            _ => (None, None),
        };
        let Some(name_node) = name_node else {
            continue;
        };
        let name = node_text(name_node, ctx.source).to_string();
        let type_names = type_node.map_or_else(Vec::new, |t| annotation_type_names(t, ctx.source));
        if let Some(t) = type_node {
            emit_type_refs(builder, ctx, t, func_scope);
        }
        let def = builder.add_definition(
            func_scope,
            &name,
            SymbolKind::Parameter,
            node_range(name_node),
        );
        def.type_names = type_names;
    }
}

/// Emit type references for every name inside an annotation. Union arms are
/// reached through the `left`/`right` fields of `binary_operator`, subscript
/// generics through `value`/`subscript` — never by operator text. `None` in
/// type position is captured too (and stays unresolved).
fn emit_type_refs(
    builder: &mut ScopeGraphBuilder,
    ctx: &PyCtx<'_>,
    node: Node<'_>,
    scope: ScopeId,
) {
    match node.kind() {
        "identifier" => {
            builder.add_reference(
                scope,
                node_text(node, ctx.source),
                RefKind::Type,
                node_range(node),
                None,
            );
        }
        "none" => {
            builder.add_reference(scope, "None", RefKind::Type, node_range(node), None);
        }
        "binary_operator" => {
            if let Some(left) = child_by_field(node, "left") {
                emit_type_refs(builder, ctx, left, scope);
            }
            if let Some(right) = child_by_field(node, "right") {
                emit_type_refs(builder, ctx, right, scope);
            }
        }
        "subscript" => {
            if let Some(value) = child_by_field(node, "value") {
                emit_type_refs(builder, ctx, value, scope);
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() != "[" && child.kind() != "]" && Some(child) != child_by_field(node, "value") {
                    emit_type_refs(builder, ctx, child, scope);
                }
            }
        }
        "type" | "parenthesized_expression" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                emit_type_refs(builder, ctx, child, scope);
            }
        }
        _ => {}
    }
}

/// Every named type in an annotation, declaration order. Union arms are
/// reached through the `left`/`right` fields of `binary_operator`, so
/// `Foo | Bar` contributes both and `User | None` contributes `User`
/// (`None` has no binding to offer dispatch).
fn annotation_type_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    collect_annotation_names(node, source, &mut names);
    names
}

fn collect_annotation_names(node: Node<'_>, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        "identifier" => out.push(node_text(node, source).to_string()),
        "binary_operator" => {
            if let Some(left) = child_by_field(node, "left") {
                collect_annotation_names(left, source, out);
            }
            if let Some(right) = child_by_field(node, "right") {
                collect_annotation_names(right, source, out);
            }
        }
        "subscript" => {
            // list[User] — the generic's own name is the binding
            if let Some(value) = child_by_field(node, "value") {
                collect_annotation_names(value, source, out);
            }
        }
        "type" | "parenthesized_expression" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_annotation_names(child, source, out);
            }
        }
        _ => {}
    }
}

/// The primary name of an annotation, for declared return types.
fn simple_type_name(node: Node<'_>, source: &str) -> Option<String> {
    annotation_type_names(node, source).into_iter().next()
}

// ── Tests ─────────────────────────────────────────────────────────────
