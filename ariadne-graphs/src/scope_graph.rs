// Per-file scope graph: a tree of lexical scopes annotated with the
// definitions, references, and imports found in one source file.
//
// Name binding is resolved by walking scopes outward (current → enclosing →
// file). Hoisted definitions are visible from scope start; everything else
// only after its declaration. A same-named local always shadows an import.
//
// The graph also carries the binding facts (assignments, return sites,
// values passed as arguments) that feed the file-local type tracker.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Access, SymbolKind, TextRange};

// ── Identifiers ───────────────────────────────────────────────────────

/// Project-wide unique token for a definition.
///
/// Canonical format: `kind:path:startLine:startCol:endLine:endCol:name`.
/// Collisions are impossible within a project because the span and path are
/// part of the token. Equality and ordering are structural (string-wise).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(String);

impl SymbolId {
    pub fn new(kind: SymbolKind, path: &Path, range: &TextRange, name: &str) -> Self {
        Self(format!(
            "{}:{}:{}:{}:{}:{}:{}",
            kind.tag(),
            path.display(),
            range.start_row,
            range.start_col,
            range.end_row,
            range.end_col,
            name,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique token for a reference site. Never confused with a [`SymbolId`]
/// thanks to the `ref:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(String);

impl ReferenceId {
    pub fn new(path: &Path, range: &TextRange, name: &str) -> Self {
        Self(format!(
            "ref:{}:{}:{}:{}:{}:{}",
            path.display(),
            range.start_row,
            range.start_col,
            range.end_row,
            range.end_col,
            name,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque ID for a scope. Unique within a single [`ScopeGraph`]; also the
/// index of the scope in the graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

// ── Scopes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeKind {
    /// The file-level root scope.
    File,
    /// Function, method, or arrow-function body (parameters included).
    Function,
    /// Free-standing or control-flow block.
    Block,
    /// Class or interface body.
    ClassBody,
    /// `for`-loop header plus body.
    For,
    /// `catch`/`except` clause.
    Catch,
}

/// One lexical scope. Scopes form a tree rooted at the file scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    /// Enclosing scope. `None` only for the file root.
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub range: TextRange,
}

// ── Definitions ───────────────────────────────────────────────────────

/// The declaring occurrence of a named entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    /// Span of the declaring identifier.
    pub range: TextRange,
    /// Full span of the declaration body, when the definition opens one
    /// (functions, classes, modules). Always contains `range`.
    pub enclosing_range: Option<TextRange>,
    /// Scope the definition lives in.
    pub scope: ScopeId,
    /// Visible to other files (explicit export, `pub`, or module level
    /// where the language exports by convention).
    pub exported: bool,
    /// Placed as if declared at scope start (function/class declarations in
    /// languages with hoisting, Rust items).
    pub hoisted: bool,
    /// Tagged as test code. Never excluded from entry points by default.
    pub is_test: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
    /// Name of the enclosing class/interface for members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// For classes: extended and implemented type names, declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub superclasses: Vec<String>,
    /// Declared types, for parameters and annotated variables. Union
    /// annotations contribute one entry per named member (`Foo | Bar` →
    /// both), so dispatch can consider every arm.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub type_names: Vec<String>,
    /// Declared return type, for functions and methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub decorators: Vec<String>,
}

impl Definition {
    /// Whether this definition is visible at `at` from within its own scope.
    fn visible_at(&self, at: &TextRange) -> bool {
        self.hoisted || self.range.start_byte <= at.start_byte
    }
}

// ── References ────────────────────────────────────────────────────────

/// What a reference does with the name it mentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefKind {
    Read,
    Write,
    Type,
    Call,
    MethodCall,
    ConstructorCall,
    NamespaceMember,
    CallbackInvocation,
}

/// An occurrence of an identifier that must resolve to a definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub id: ReferenceId,
    pub name: String,
    pub range: TextRange,
    pub kind: RefKind,
    /// The single enclosing scope of the reference.
    pub scope: ScopeId,
    /// Receiver identifier for method calls and namespace member accesses
    /// (`u.greet()` → `u`; `ns.helper` → `ns`). `this`/`self` included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

// ── Imports ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    /// `import { x } from 'm'`, `from m import x`, `use m::x`.
    Named,
    /// `import x from 'm'` (binds the module's default export).
    Default,
    /// `import * as ns from 'm'`, `import m` (binds the module object).
    Namespace,
    /// Re-exported without a local use site (`export { x } from 'm'`,
    /// `pub use m::x`). Wildcard re-exports use local name `*`.
    ReExport,
}

/// An unresolved import recorded during indexing. The module path stays
/// textual until the module resolver maps it to a project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    /// Name bound in this file (the alias, when aliased).
    pub local_name: String,
    /// Name in the source module, when it differs from `local_name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    /// Textual module specifier as written (`./utils`, `..pkg.mod`,
    /// `crate::codec`).
    pub module_path: String,
    pub kind: ImportKind,
    pub range: TextRange,
    pub scope: ScopeId,
}

// ── Type-tracker feed ─────────────────────────────────────────────────

/// What a variable was bound to at an assignment site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum BoundValue {
    /// `x = new C()` / `x = C {..}`.
    Constructed { class_name: String },
    /// `x = f(...)` — a factory candidate.
    CallResult { callee: String },
    /// `y = x` — copies `x`'s binding.
    Copied { source: String },
    /// `x = { a: f, ...base }` / `x = [f, g]`.
    Collection {
        members: Vec<String>,
        spreads: Vec<String>,
    },
}

/// One assignment the type tracker can learn from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarBinding {
    /// Variable being bound.
    pub target: String,
    pub range: TextRange,
    pub scope: ScopeId,
    pub value: BoundValue,
}

/// Value flowing out of a `return` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ReturnedValue {
    /// `return new C()`.
    Constructed { class_name: String },
    /// `return x` — resolved against the function's local bindings.
    Named { name: String },
}

/// A `return` site inside some function body, located by range containment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSite {
    pub range: TextRange,
    pub scope: ScopeId,
    pub value: ReturnedValue,
}

/// A named value passed as a call argument without call parentheses
/// (`register(handleAdd)`), making it indirectly reachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueUse {
    pub name: String,
    /// Span of the call expression the value was passed to.
    pub call_range: TextRange,
    pub scope: ScopeId,
}

/// `export { local as exported }` without a source module: the definition
/// stays local but is visible to other files under the exported name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportAlias {
    pub exported: String,
    pub local: String,
    pub range: TextRange,
}

// ── Scope graph ───────────────────────────────────────────────────────

/// Complete semantic index of one source file. Owned by the file's cache
/// entry and replaced atomically whenever the file changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeGraph {
    pub file_path: PathBuf,
    /// Language identifier (`typescript`, `python`, ...).
    pub language: String,
    /// Scope arena; index == `ScopeId`. Entry 0 is the file root.
    pub scopes: Vec<Scope>,
    pub definitions: Vec<Definition>,
    pub references: Vec<Reference>,
    pub imports: Vec<Import>,
    /// Assignment facts for the type tracker.
    #[serde(default)]
    pub bindings: Vec<VarBinding>,
    /// Return-site facts for factory detection.
    #[serde(default)]
    pub returns: Vec<ReturnSite>,
    /// Function-as-value argument facts for indirect reachability.
    #[serde(default)]
    pub value_uses: Vec<ValueUse>,
    /// Local-alias exports (`export { a as b }` without a source).
    #[serde(default)]
    pub export_aliases: Vec<ExportAlias>,
    /// Python: the file contains an `if __name__ == "__main__":` guard.
    #[serde(default)]
    pub has_main_guard: bool,
}

/// Outcome of an intra-file name lookup.
#[derive(Debug)]
pub enum NameLookup<'a> {
    /// One or more local definitions (several when a scope redeclares).
    Definitions(Vec<&'a Definition>),
    /// The name is bound by an import; resolution must follow it.
    Import(&'a Import),
    /// Nothing in this file binds the name.
    Unresolved,
}

impl ScopeGraph {
    /// An empty graph for a file that failed to parse. The file stays
    /// tracked so references into it fail cleanly as unresolved.
    pub fn empty(file_path: &Path, language: &str) -> Self {
        let root = Scope {
            id: ScopeId::ROOT,
            parent: None,
            kind: ScopeKind::File,
            range: TextRange {
                start_byte: 0,
                end_byte: 0,
                start_row: 0,
                start_col: 0,
                end_row: 0,
                end_col: 0,
            },
        };
        Self {
            file_path: file_path.to_path_buf(),
            language: language.to_string(),
            scopes: vec![root],
            definitions: Vec::new(),
            references: Vec::new(),
            imports: Vec::new(),
            bindings: Vec::new(),
            returns: Vec::new(),
            value_uses: Vec::new(),
            export_aliases: Vec::new(),
            has_main_guard: false,
        }
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn root(&self) -> &Scope {
        &self.scopes[0]
    }

    /// Resolve a name from a scope, walking outward. Implements hoisting
    /// (hoisted definitions visible from scope start, others only after
    /// their declaration) and shadowing (locals beat imports, inner scopes
    /// beat outer ones).
    pub fn lookup(&self, name: &str, from: ScopeId, at: &TextRange) -> NameLookup<'_> {
        let mut current = Some(from);
        while let Some(scope_id) = current {
            let defs: Vec<&Definition> = self
                .definitions
                .iter()
                .filter(|d| d.scope == scope_id && d.name == name && d.visible_at(at))
                .collect();
            if !defs.is_empty() {
                return NameLookup::Definitions(defs);
            }

            if let Some(import) = self
                .imports
                .iter()
                .find(|i| i.scope == scope_id && i.local_name == name)
            {
                return NameLookup::Import(import);
            }

            current = self.scope(scope_id).parent;
        }
        NameLookup::Unresolved
    }

    /// All definitions with a given name, anywhere in the file.
    pub fn defs_named(&self, name: &str) -> impl Iterator<Item = &Definition> {
        self.definitions.iter().filter(move |d| d.name == name)
    }

    /// Definitions this file makes visible under `name`: exported
    /// definitions plus local-alias exports remapped to their local target.
    pub fn exported_defs(&self, name: &str) -> Vec<&Definition> {
        let mut out: Vec<&Definition> = self
            .definitions
            .iter()
            .filter(|d| d.exported && d.name == name)
            .collect();
        for alias in self.export_aliases.iter().filter(|a| a.exported == name) {
            out.extend(
                self.definitions
                    .iter()
                    .filter(|d| d.scope == ScopeId::ROOT && d.name == alias.local),
            );
        }
        out
    }

    /// Re-export imports (`export { x } from 'm'`, `pub use`), including
    /// wildcards (local name `*`).
    pub fn re_exports(&self) -> impl Iterator<Item = &Import> {
        self.imports
            .iter()
            .filter(|i| i.kind == ImportKind::ReExport)
    }

    /// The definition a (row, col) position points at, if any.
    pub fn definition_at(&self, row: usize, col: usize) -> Option<&Definition> {
        self.definitions
            .iter()
            .filter(|d| d.range.contains_point(row, col))
            .min_by_key(|d| d.range.len())
    }

    /// The reference a (row, col) position points at, if any.
    pub fn reference_at(&self, row: usize, col: usize) -> Option<&Reference> {
        self.references
            .iter()
            .filter(|r| r.range.contains_point(row, col))
            .min_by_key(|r| r.range.len())
    }

    /// Smallest callable definition whose enclosing range contains `range`.
    /// This attributes a call site to its caller.
    pub fn enclosing_callable(&self, range: &TextRange) -> Option<&Definition> {
        self.definitions
            .iter()
            .filter(|d| d.kind.is_callable())
            .filter(|d| {
                d.enclosing_range
                    .as_ref()
                    .is_some_and(|enc| enc.contains(range))
            })
            .min_by_key(|d| d.enclosing_range.as_ref().map_or(usize::MAX, TextRange::len))
    }

    // ── Virtual-chunk surgery ─────────────────────────────────────────
    //
    // Oversize files are split at top-level declaration boundaries, indexed
    // as virtual sub-files, then stitched back together. `shift` rebases a
    // chunk graph to its position in the original file (recomputing ids,
    // which embed spans); `absorb_chunk` merges a shifted chunk into the
    // accumulated graph.

    /// Rebase all spans by a byte/row offset and recompute symbol and
    /// reference ids. Chunks start at column 0 of a line, so columns are
    /// unaffected.
    pub fn shift(&mut self, byte_offset: usize, row_offset: usize) {
        let shift_range = |r: &mut TextRange| {
            r.start_byte += byte_offset;
            r.end_byte += byte_offset;
            r.start_row += row_offset;
            r.end_row += row_offset;
        };

        for scope in &mut self.scopes {
            shift_range(&mut scope.range);
        }
        for def in &mut self.definitions {
            shift_range(&mut def.range);
            if let Some(enc) = def.enclosing_range.as_mut() {
                shift_range(enc);
            }
            def.id = SymbolId::new(def.kind, &self.file_path, &def.range, &def.name);
        }
        for r in &mut self.references {
            shift_range(&mut r.range);
            r.id = ReferenceId::new(&self.file_path, &r.range, &r.name);
        }
        for i in &mut self.imports {
            shift_range(&mut i.range);
        }
        for b in &mut self.bindings {
            shift_range(&mut b.range);
        }
        for r in &mut self.returns {
            shift_range(&mut r.range);
        }
        for v in &mut self.value_uses {
            shift_range(&mut v.call_range);
        }
        for a in &mut self.export_aliases {
            shift_range(&mut a.range);
        }
    }

    /// Merge a shifted chunk graph into `self`. The chunk's root scope is
    /// identified with `self`'s root; all other scopes are re-numbered.
    pub fn absorb_chunk(&mut self, chunk: ScopeGraph) {
        let chunk_root_range = chunk.scopes.first().map(|s| s.range);
        let base = self.scopes.len() as u32;
        let remap = |id: ScopeId| -> ScopeId {
            if id == ScopeId::ROOT {
                ScopeId::ROOT
            } else {
                ScopeId(base + id.0 - 1)
            }
        };

        for scope in chunk.scopes.into_iter().skip(1) {
            self.scopes.push(Scope {
                id: remap(scope.id),
                parent: scope.parent.map(remap),
                kind: scope.kind,
                range: scope.range,
            });
        }
        self.definitions.extend(chunk.definitions.into_iter().map(|mut d| {
            d.scope = remap(d.scope);
            d
        }));
        self.references.extend(chunk.references.into_iter().map(|mut r| {
            r.scope = remap(r.scope);
            r
        }));
        self.imports.extend(chunk.imports.into_iter().map(|mut i| {
            i.scope = remap(i.scope);
            i
        }));
        self.bindings.extend(chunk.bindings.into_iter().map(|mut b| {
            b.scope = remap(b.scope);
            b
        }));
        self.returns.extend(chunk.returns.into_iter().map(|mut r| {
            r.scope = remap(r.scope);
            r
        }));
        self.value_uses.extend(chunk.value_uses.into_iter().map(|mut v| {
            v.scope = remap(v.scope);
            v
        }));
        self.export_aliases.extend(chunk.export_aliases);
        self.has_main_guard |= chunk.has_main_guard;

        // Root spans the whole stitched file.
        if let Some(end) = chunk_root_range {
            let root = &mut self.scopes[0];
            if end.end_byte > root.range.end_byte {
                root.range.end_byte = end.end_byte;
                root.range.end_row = end.end_row;
                root.range.end_col = end.end_col;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
