use std::path::{Path, PathBuf};

use tree_sitter::Node;

use crate::scope_graph::{
    BoundValue, Definition, ExportAlias, Import, ImportKind, Reference, ReferenceId, RefKind,
    ReturnSite, ReturnedValue, Scope, ScopeGraph, ScopeId, ScopeKind, SymbolId, ValueUse,
    VarBinding,
};
use crate::{SymbolKind, TextRange};

/// Extract the source text for a tree-sitter node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Find the first child with a specific kind.
pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|child| child.kind() == kind)
}

/// Find a child by field name.
pub fn child_by_field<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    node.child_by_field_name(field)
}

/// Convert a tree-sitter node to a `TextRange`.
pub fn node_range(node: Node<'_>) -> TextRange {
    node.range().into()
}

/// Extract a doc comment from `//`-style comment lines immediately preceding
/// a definition (Rust `///`).
pub fn doc_comment_above(node: Node<'_>, source: &str, prefix: &str) -> Option<String> {
    let mut comments = Vec::new();
    let mut current = node;

    // Walk backwards through siblings collecting comment lines
    while let Some(prev) = current.prev_sibling() {
        if prev.kind() == "line_comment" || prev.kind() == "comment" {
            let text = node_text(prev, source);
            if text.starts_with(prefix) {
                let stripped = text.strip_prefix(prefix).unwrap_or(text).trim();
                comments.push(stripped.to_string());
                current = prev;
                continue;
            }
        }
        break;
    }

    if comments.is_empty() {
        return None;
    }

    // Reverse since we collected bottom-to-top
    comments.reverse();
    Some(comments.join("\n"))
}

/// Extract a block doc comment (`/** ... */`) from the preceding sibling.
pub fn block_doc_comment(node: Node<'_>, source: &str) -> Option<String> {
    let prev = node.prev_sibling()?;
    if prev.kind() != "comment" && prev.kind() != "block_comment" {
        return None;
    }

    let text = node_text(prev, source);
    if !text.starts_with("/**") {
        return None;
    }

    // Strip /** prefix and */ suffix, clean up * at start of lines
    let inner = text
        .strip_prefix("/**")
        .unwrap_or(text)
        .strip_suffix("*/")
        .unwrap_or(text)
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            trimmed
                .strip_prefix("* ")
                .or(trimmed.strip_prefix('*'))
                .unwrap_or(trimmed)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    if inner.is_empty() { None } else { Some(inner) }
}

// ── Scope Graph Builder ──────────────────────────────────────────────

/// Builder for constructing [`ScopeGraph`] instances from tree-sitter ASTs.
///
/// Manages scope allocation and definition/reference/import creation, and
/// finalizes the file-level invariants at [`build`](Self::build): pending
/// export names are flagged on their definitions, recorded trait impls are
/// attached to their type definitions, and the implicit `<module>` callable
/// is synthesized.
#[derive(Debug)]
pub struct ScopeGraphBuilder {
    graph: ScopeGraph,
    /// Names exported via a bare `export { name }` clause; flagged on the
    /// matching root-scope definitions at build time (the declaration may
    /// follow the export statement).
    pending_exports: Vec<String>,
    /// Rust `(type, trait)` pairs from `impl Trait for Type`; folded into
    /// the type definition's superclass list at build time.
    trait_impls: Vec<(String, String)>,
}

impl ScopeGraphBuilder {
    /// Create a builder whose root scope spans the parsed file.
    pub fn new(file_path: &Path, language: &str, root_range: TextRange) -> Self {
        let mut graph = ScopeGraph::empty(file_path, language);
        graph.scopes[0].range = root_range;
        Self {
            graph,
            pending_exports: Vec::new(),
            trait_impls: Vec::new(),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId::ROOT
    }

    pub fn file_path(&self) -> &PathBuf {
        &self.graph.file_path
    }

    /// Open a child scope.
    pub fn open_scope(&mut self, parent: ScopeId, kind: ScopeKind, range: TextRange) -> ScopeId {
        let id = ScopeId(self.graph.scopes.len() as u32);
        self.graph.scopes.push(Scope {
            id,
            parent: Some(parent),
            kind,
            range,
        });
        id
    }

    /// Add a definition with default attributes; callers adjust the returned
    /// definition in place (hoisting, export, docstring, container, ...).
    pub fn add_definition(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        range: TextRange,
    ) -> &mut Definition {
        let id = SymbolId::new(kind, &self.graph.file_path, &range, name);
        self.graph.definitions.push(Definition {
            id,
            name: name.to_string(),
            kind,
            range,
            enclosing_range: None,
            scope,
            exported: false,
            hoisted: false,
            is_test: false,
            access: None,
            container: None,
            superclasses: Vec::new(),
            type_names: Vec::new(),
            return_type: None,
            docstring: None,
            decorators: Vec::new(),
        });
        self.graph.definitions.last_mut().unwrap()
    }

    /// Most recent definition with the given name, for attaching facts that
    /// arrive after creation (an annotated assignment's declared type).
    pub fn last_definition_named(&mut self, name: &str) -> Option<&mut Definition> {
        self.graph
            .definitions
            .iter_mut()
            .rev()
            .find(|d| d.name == name)
    }

    /// True if `scope` already defines `name` (used to distinguish a fresh
    /// binding from a rebinding write).
    pub fn defines(&self, scope: ScopeId, name: &str) -> bool {
        self.graph
            .definitions
            .iter()
            .any(|d| d.scope == scope && d.name == name)
    }

    pub fn add_reference(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: RefKind,
        range: TextRange,
        receiver: Option<String>,
    ) {
        let id = ReferenceId::new(&self.graph.file_path, &range, name);
        self.graph.references.push(Reference {
            id,
            name: name.to_string(),
            range,
            kind,
            scope,
            receiver,
        });
    }

    pub fn add_import(
        &mut self,
        scope: ScopeId,
        local_name: &str,
        source_name: Option<&str>,
        module_path: &str,
        kind: ImportKind,
        range: TextRange,
    ) {
        self.graph.imports.push(Import {
            local_name: local_name.to_string(),
            source_name: source_name.map(str::to_string),
            module_path: module_path.to_string(),
            kind,
            range,
            scope,
        });
    }

    pub fn add_binding(&mut self, scope: ScopeId, target: &str, range: TextRange, value: BoundValue) {
        self.graph.bindings.push(VarBinding {
            target: target.to_string(),
            range,
            scope,
            value,
        });
    }

    pub fn add_return(&mut self, scope: ScopeId, range: TextRange, value: ReturnedValue) {
        self.graph.returns.push(ReturnSite { range, scope, value });
    }

    pub fn add_value_use(&mut self, scope: ScopeId, name: &str, call_range: TextRange) {
        self.graph.value_uses.push(ValueUse {
            name: name.to_string(),
            call_range,
            scope,
        });
    }

    pub fn add_export_alias(&mut self, exported: &str, local: &str, range: TextRange) {
        self.graph.export_aliases.push(ExportAlias {
            exported: exported.to_string(),
            local: local.to_string(),
            range,
        });
    }

    /// Flag `name` for export at build time (`export { name }` may precede
    /// the declaration it names).
    pub fn flag_export(&mut self, name: &str) {
        self.pending_exports.push(name.to_string());
    }

    pub fn note_trait_impl(&mut self, type_name: &str, trait_name: &str) {
        self.trait_impls
            .push((type_name.to_string(), trait_name.to_string()));
    }

    pub fn set_main_guard(&mut self) {
        self.graph.has_main_guard = true;
    }

    /// Finalize the graph: apply pending exports and trait impls, and
    /// synthesize the implicit module-level callable spanning the file.
    pub fn build(mut self) -> ScopeGraph {
        for name in &self.pending_exports {
            let mut matched = false;
            for def in self
                .graph
                .definitions
                .iter_mut()
                .filter(|d| d.scope == ScopeId::ROOT && d.name == *name)
            {
                def.exported = true;
                matched = true;
            }
            // `export { x }` where x is itself an import: the export
            // behaves as a re-export of the imported name.
            if !matched {
                for import in self
                    .graph
                    .imports
                    .iter_mut()
                    .filter(|i| i.local_name == *name)
                {
                    import.kind = ImportKind::ReExport;
                }
            }
        }

        for (type_name, trait_name) in &self.trait_impls {
            for def in self
                .graph
                .definitions
                .iter_mut()
                .filter(|d| d.kind == SymbolKind::Class && d.name == *type_name)
            {
                if !def.superclasses.contains(trait_name) {
                    def.superclasses.push(trait_name.clone());
                }
            }
        }

        let root_range = self.graph.scopes[0].range;
        let module_id =
            SymbolId::new(SymbolKind::Module, &self.graph.file_path, &root_range, "<module>");
        self.graph.definitions.push(Definition {
            id: module_id,
            name: "<module>".to_string(),
            kind: SymbolKind::Module,
            range: root_range,
            enclosing_range: Some(root_range),
            scope: ScopeId::ROOT,
            exported: false,
            hoisted: true,
            is_test: false,
            access: None,
            container: None,
            superclasses: Vec::new(),
            type_names: Vec::new(),
            return_type: None,
            docstring: None,
            decorators: Vec::new(),
        });

        self.graph
    }
}
