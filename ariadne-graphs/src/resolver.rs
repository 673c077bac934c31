// Cross-file reference resolution.
//
// For every reference in every file, compute zero or more candidate
// definitions. The pipeline per reference:
//
// 1. Intra-file lookup via the scope walk (locals shadow imports).
// 2. Imports are followed to the exporting file; barrel/re-export chains
//    are walked transitively with a (file, name) visited set, so cyclic
//    re-exports terminate. Aliased exports remap the looked-up name.
// 3. `import * as ns` member references consult the target module's
//    exported-definition table.
// 4. Method calls dispatch through the receiver's tracked type and its
//    inheritance chain (depth-first, left-to-right); interface receivers
//    fan out to implementing classes; unknown receivers fan out to every
//    method of that name, bounded by `polymorphic_expansion_limit`.
// 5. Constructor calls resolve to the class's (possibly synthesized)
//    constructor and seed the type tracker.
// 6. Factory calls bind through a declared return type or a single
//    `new`-returning site, one hop deep.
//
// Unresolved names produce empty candidate sets, never errors.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::module_resolver::{FileSet, ModuleResolver};
use crate::scope_graph::{
    BoundValue, Definition, Import, ImportKind, NameLookup, Reference, ReferenceId, RefKind,
    ReturnedValue, ScopeGraph, ScopeId, SymbolId,
};
use crate::type_tracker::{IndirectReachability, TypeTracker, collect_indirect_reachability};
use crate::{SymbolKind, TextRange};

// ── Configuration ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Cap on candidates collected when a method call's receiver type is
    /// unknown and every same-named method in the project qualifies.
    pub polymorphic_expansion_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            polymorphic_expansion_limit: 12,
        }
    }
}

// ── Resolution output ─────────────────────────────────────────────────

/// How certain the resolver is about a candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Direct scope or export table hit.
    Exact,
    /// Reached through tracked types or factory returns.
    Inferred,
    /// More than one surviving candidate.
    Ambiguous,
}

/// The candidate definitions one reference may point at, in tie-break
/// order: same file beats same package beats alphabetical `SymbolId`
/// (candidates found through an inferred receiver type already beat
/// everything else by construction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub reference: ReferenceId,
    pub candidates: Vec<SymbolId>,
    pub confidence: Confidence,
    /// The callee is a parameter — a callback being invoked.
    #[serde(default)]
    pub is_callback_invocation: bool,
}

/// Project-wide resolver output: per-file resolutions plus the aggregate
/// indirect-reachability set.
#[derive(Debug, Clone, Default)]
pub struct ProjectResolution {
    pub resolutions: BTreeMap<PathBuf, Vec<Resolution>>,
    pub reachability: IndirectReachability,
}

impl ProjectResolution {
    /// Flattened view keyed by reference id.
    pub fn by_reference(&self) -> HashMap<&ReferenceId, &Resolution> {
        self.resolutions
            .values()
            .flatten()
            .map(|r| (&r.reference, r))
            .collect()
    }
}

// ── Resolver ──────────────────────────────────────────────────────────

type DefRef<'a> = (&'a PathBuf, &'a Definition);

/// Cross-file resolver over a set of per-file scope graphs.
pub struct Resolver<'a> {
    graphs: &'a BTreeMap<PathBuf, ScopeGraph>,
    files: FileSet,
    modules: ModuleResolver,
    config: ResolverConfig,
    /// Class-like definitions (class/interface/enum) in file order.
    classes: Vec<DefRef<'a>>,
    classes_by_name: HashMap<&'a str, Vec<DefRef<'a>>>,
    methods_by_name: HashMap<&'a str, Vec<DefRef<'a>>>,
    defs_by_id: HashMap<&'a SymbolId, DefRef<'a>>,
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("files", &self.graphs.len())
            .field("classes", &self.classes.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Resolver<'a> {
    pub fn new(
        graphs: &'a BTreeMap<PathBuf, ScopeGraph>,
        project_root: &Path,
        config: ResolverConfig,
    ) -> Self {
        let files = FileSet::from_paths(graphs.keys().cloned());
        let mut classes = Vec::new();
        let mut classes_by_name: HashMap<&str, Vec<DefRef<'_>>> = HashMap::new();
        let mut methods_by_name: HashMap<&str, Vec<DefRef<'_>>> = HashMap::new();
        let mut defs_by_id: HashMap<&SymbolId, DefRef<'_>> = HashMap::new();

        for (path, graph) in graphs {
            for def in &graph.definitions {
                defs_by_id.insert(&def.id, (path, def));
                match def.kind {
                    SymbolKind::Class | SymbolKind::Interface | SymbolKind::Enum => {
                        classes.push((path, def));
                        classes_by_name.entry(&def.name).or_default().push((path, def));
                    }
                    SymbolKind::Method => {
                        methods_by_name.entry(&def.name).or_default().push((path, def));
                    }
                    _ => {}
                }
            }
        }

        Self {
            graphs,
            files,
            modules: ModuleResolver::new(project_root),
            config,
            classes,
            classes_by_name,
            methods_by_name,
            defs_by_id,
        }
    }

    pub fn definition(&self, id: &SymbolId) -> Option<&'a Definition> {
        self.defs_by_id.get(id).map(|(_, d)| *d)
    }

    /// Resolve every reference in every file, in deterministic file order.
    pub fn resolve_project(&self) -> ProjectResolution {
        let mut out = ProjectResolution::default();
        for path in self.graphs.keys() {
            let (resolutions, reachability) = self.resolve_file(path);
            out.resolutions.insert(path.clone(), resolutions);
            out.reachability.merge(reachability);
        }
        out
    }

    /// Resolve one file's references and compute its reachability facts.
    pub fn resolve_file(&self, path: &Path) -> (Vec<Resolution>, IndirectReachability) {
        let Some((path, graph)) = self.graphs.get_key_value(path) else {
            return (Vec::new(), IndirectReachability::default());
        };

        let tracker = self.build_tracker(path, graph);
        let resolutions = graph
            .references
            .iter()
            .map(|r| self.resolve_reference(path, graph, r, &tracker))
            .collect();

        let reachability = collect_indirect_reachability(graph, |name, scope, range| {
            self.callable_targets(path, graph, name, scope, range)
        });

        (resolutions, reachability)
    }

    // ── Type tracker construction (§ factory/constructor binding) ─────

    fn build_tracker(&self, path: &'a PathBuf, graph: &'a ScopeGraph) -> TypeTracker {
        let mut tracker = TypeTracker::new();

        // Declared parameter/variable types; a union annotation binds every
        // named member.
        for def in &graph.definitions {
            if def.type_names.is_empty() {
                continue;
            }
            let classes: Vec<SymbolId> = def
                .type_names
                .iter()
                .filter_map(|t| self.class_by_name_at(path, graph, t, def.scope, &def.range))
                .map(|(_, class)| class.id.clone())
                .collect();
            tracker.bind(def.scope, &def.name, classes);
        }

        // Assignment facts, in source order so copies see earlier bindings
        for binding in &graph.bindings {
            match &binding.value {
                BoundValue::Constructed { class_name } => {
                    if let Some((_, class)) = self.class_by_name_at(
                        path,
                        graph,
                        class_name,
                        binding.scope,
                        &binding.range,
                    ) {
                        tracker.bind(binding.scope, &binding.target, vec![class.id.clone()]);
                    }
                }
                BoundValue::Copied { source } => {
                    let classes = tracker.types_of(graph, binding.scope, source).to_vec();
                    tracker.bind(binding.scope, &binding.target, classes);
                }
                BoundValue::CallResult { callee } => {
                    if let Some(class) = self.call_result_class(
                        path,
                        graph,
                        callee,
                        binding.scope,
                        &binding.range,
                        &tracker,
                    ) {
                        tracker.bind(binding.scope, &binding.target, vec![class]);
                    }
                }
                BoundValue::Collection { .. } => {}
            }
        }

        tracker
    }

    /// The class produced by `callee(...)`: the class itself when `callee`
    /// names one (Python-style construction), or the factory's return class.
    fn call_result_class(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        callee: &str,
        scope: ScopeId,
        at: &TextRange,
        tracker: &TypeTracker,
    ) -> Option<SymbolId> {
        let targets = self.plain_targets(path, graph, callee, scope, at);
        let &(def_file, def) = targets.first()?;
        match def.kind {
            SymbolKind::Class => Some(def.id.clone()),
            SymbolKind::Function | SymbolKind::Method => {
                self.factory_class(def_file, def, path, graph, tracker)
            }
            _ => None,
        }
    }

    /// The class a factory returns: its declared return type, or the class
    /// constructed at its single `new`-returning site (one hop).
    fn factory_class(
        &self,
        def_file: &'a PathBuf,
        def: &'a Definition,
        caller_file: &'a PathBuf,
        caller_graph: &'a ScopeGraph,
        caller_tracker: &TypeTracker,
    ) -> Option<SymbolId> {
        let def_graph = self.graphs.get(def_file.as_path())?;

        if let Some(return_type) = &def.return_type {
            if let Some((_, class)) =
                self.class_by_name_at(def_file, def_graph, return_type, def.scope, &def.range)
            {
                return Some(class.id.clone());
            }
        }

        let body = def.enclosing_range.as_ref()?;
        let sites: Vec<_> = def_graph
            .returns
            .iter()
            .filter(|r| body.contains(&r.range))
            .collect();
        if sites.len() != 1 {
            return None; // Only a single return site is trusted
        }
        match &sites[0].value {
            ReturnedValue::Constructed { class_name } => self
                .class_by_name_at(def_file, def_graph, class_name, sites[0].scope, &sites[0].range)
                .map(|(_, c)| c.id.clone()),
            ReturnedValue::Named { name } => {
                // `return x` where x was bound in the same body
                if def_file == caller_file {
                    caller_tracker
                        .types_of(caller_graph, sites[0].scope, name)
                        .first()
                        .cloned()
                } else {
                    def_graph
                        .bindings
                        .iter()
                        .filter(|b| b.target == *name && body.contains(&b.range))
                        .find_map(|b| match &b.value {
                            BoundValue::Constructed { class_name } => self
                                .class_by_name_at(
                                    def_file, def_graph, class_name, b.scope, &b.range,
                                )
                                .map(|(_, c)| c.id.clone()),
                            _ => None,
                        })
                }
            }
        }
    }

    // ── Per-reference resolution ──────────────────────────────────────

    pub fn resolve_reference(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        reference: &Reference,
        tracker: &TypeTracker,
    ) -> Resolution {
        match reference.kind {
            RefKind::ConstructorCall => self.resolve_constructor(path, graph, reference),
            RefKind::MethodCall | RefKind::NamespaceMember => {
                self.resolve_method(path, graph, reference, tracker)
            }
            _ => self.resolve_plain(path, graph, reference),
        }
    }

    fn resolve_plain(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        reference: &Reference,
    ) -> Resolution {
        let mut is_callback = false;
        let mut candidates =
            self.plain_targets(path, graph, &reference.name, reference.scope, &reference.range);

        // Calling a parameter is a callback invocation; the real targets
        // flow in as values elsewhere.
        if reference.kind == RefKind::Call {
            if let Some((_, def)) = candidates.first() {
                if def.kind == SymbolKind::Parameter {
                    is_callback = true;
                    candidates.clear();
                }
            }
        }

        // Calling a class constructs it (Python `User()`).
        if reference.kind == RefKind::Call {
            candidates = candidates
                .into_iter()
                .flat_map(|(file, def)| {
                    if def.kind == SymbolKind::Class {
                        self.constructor_of((file, def)).into_iter().collect()
                    } else {
                        vec![(file, def)]
                    }
                })
                .collect();
        }

        self.finish(path, reference, candidates, Confidence::Exact, is_callback)
    }

    fn resolve_constructor(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        reference: &Reference,
    ) -> Resolution {
        let candidates = self
            .class_by_name_at(path, graph, &reference.name, reference.scope, &reference.range)
            .and_then(|class| self.constructor_of(class))
            .into_iter()
            .collect();
        self.finish(path, reference, candidates, Confidence::Exact, false)
    }

    fn resolve_method(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        reference: &Reference,
        tracker: &TypeTracker,
    ) -> Resolution {
        let name = reference.name.as_str();

        let Some(receiver) = reference.receiver.as_deref() else {
            return self.fan_out(path, graph, reference);
        };

        // `this.method()` / `self.method()` dispatches on the enclosing class
        if receiver == "this" || receiver == "self" {
            if let Some(class) = self.enclosing_class(path, graph, &reference.range) {
                let methods = self.dispatch(class, name);
                let confidence = if methods.len() > 1 {
                    Confidence::Ambiguous
                } else {
                    Confidence::Exact
                };
                if !methods.is_empty() {
                    return self.finish(path, reference, methods, confidence, false);
                }
            }
            return self.fan_out(path, graph, reference);
        }

        match graph.lookup(receiver, reference.scope, &reference.range) {
            NameLookup::Definitions(defs) => {
                let def = defs[0];
                // Receiver is a type name: static/associated dispatch
                if matches!(
                    def.kind,
                    SymbolKind::Class | SymbolKind::Interface | SymbolKind::Enum
                ) {
                    let methods = self.dispatch((path, def), name);
                    let confidence = if methods.len() > 1 {
                        Confidence::Ambiguous
                    } else {
                        Confidence::Exact
                    };
                    if !methods.is_empty() {
                        return self.finish(path, reference, methods, confidence, false);
                    }
                    return self.fan_out(path, graph, reference);
                }

                // Receiver is a value: consult the tracker, then the
                // declared types. A union-typed receiver contributes every
                // named member and the resolution is tagged ambiguous.
                let mut classes: Vec<DefRef<'a>> = tracker
                    .types_of(graph, reference.scope, receiver)
                    .iter()
                    .filter_map(|id| self.defs_by_id.get(id).copied())
                    .collect();
                if classes.is_empty() {
                    classes = def
                        .type_names
                        .iter()
                        .filter_map(|t| {
                            self.class_by_name_at(path, graph, t, def.scope, &def.range)
                        })
                        .collect();
                }

                if !classes.is_empty() {
                    let union = classes.len() > 1;
                    let mut methods = Vec::new();
                    for class in &classes {
                        methods.extend(self.dispatch(*class, name));
                    }
                    let methods = dedup_defs(methods);
                    if !methods.is_empty() {
                        let confidence = if union {
                            Confidence::Ambiguous
                        } else {
                            Confidence::Inferred
                        };
                        // finish() upgrades to ambiguous when several
                        // candidates survive
                        return self.finish(path, reference, methods, confidence, false);
                    }
                }
                self.fan_out(path, graph, reference)
            }
            NameLookup::Import(import) => {
                let mut visited = HashSet::new();
                if import.kind == ImportKind::Namespace {
                    // ns.member consults the module's export table
                    let targets = self.namespace_member(path, graph, import, name, &mut visited);
                    let confidence = if targets.len() > 1 {
                        Confidence::Ambiguous
                    } else {
                        Confidence::Exact
                    };
                    return self.finish(path, reference, targets, confidence, false);
                }
                // Imported class as receiver
                let imported = self.import_targets(path, graph, import, &mut visited);
                if let Some(class) = imported.iter().find(|(_, d)| {
                    matches!(
                        d.kind,
                        SymbolKind::Class | SymbolKind::Interface | SymbolKind::Enum
                    )
                }) {
                    let methods = self.dispatch(*class, name);
                    if !methods.is_empty() {
                        let confidence = if methods.len() > 1 {
                            Confidence::Ambiguous
                        } else {
                            Confidence::Exact
                        };
                        return self.finish(path, reference, methods, confidence, false);
                    }
                }
                self.fan_out(path, graph, reference)
            }
            NameLookup::Unresolved => self.fan_out(path, graph, reference),
        }
    }

    /// Polymorphic fan-out: every method in the project with this name,
    /// bounded by the configured expansion limit.
    fn fan_out(&self, path: &'a PathBuf, _graph: &ScopeGraph, reference: &Reference) -> Resolution {
        let mut methods = self
            .methods_by_name
            .get(reference.name.as_str())
            .cloned()
            .unwrap_or_default();
        methods = self.sorted(path, methods);

        let limit = self.config.polymorphic_expansion_limit;
        if methods.len() > limit {
            debug!(
                name = %reference.name,
                dropped = methods.len() - limit,
                "polymorphic expansion limit reached"
            );
            methods.truncate(limit);
        }

        let confidence = if methods.len() > 1 {
            Confidence::Ambiguous
        } else {
            Confidence::Inferred
        };
        Resolution {
            reference: reference.id.clone(),
            candidates: methods.into_iter().map(|(_, d)| d.id.clone()).collect(),
            confidence,
            is_callback_invocation: false,
        }
    }

    // ── Name lookup machinery ─────────────────────────────────────────

    /// Candidates for a plain name: scope walk, then import following,
    /// then wildcard imports.
    fn plain_targets(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        name: &str,
        scope: ScopeId,
        at: &TextRange,
    ) -> Vec<DefRef<'a>> {
        match graph.lookup(name, scope, at) {
            NameLookup::Definitions(defs) => defs.into_iter().map(|d| (path, d)).collect(),
            NameLookup::Import(import) => {
                let mut visited = HashSet::new();
                self.import_targets(path, graph, import, &mut visited)
            }
            NameLookup::Unresolved => {
                // `from m import *` / `use m::*` can still bind the name
                let mut out = Vec::new();
                let mut visited = HashSet::new();
                for import in graph
                    .imports
                    .iter()
                    .filter(|i| i.local_name == "*" && i.kind != ImportKind::ReExport)
                {
                    if let Some(target) =
                        self.modules
                            .resolve(&self.files, path, &import.module_path, &graph.language)
                    {
                        out.extend(self.exported_lookup(&target, name, &mut visited));
                    }
                }
                out
            }
        }
    }

    /// Follow one import to its target definitions.
    fn import_targets(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        import: &Import,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> Vec<DefRef<'a>> {
        let Some(target) =
            self.modules
                .resolve(&self.files, path, &import.module_path, &graph.language)
        else {
            return Vec::new(); // External module — silently unresolved
        };

        match import.kind {
            ImportKind::Namespace => self.module_def(&target).into_iter().collect(),
            ImportKind::Default => self.exported_lookup(&target, "default", visited),
            ImportKind::Named | ImportKind::ReExport => {
                let wanted = import.source_name.as_deref().unwrap_or(&import.local_name);
                if wanted == "*" {
                    // `export * as ns from` — the namespace is the module
                    self.module_def(&target).into_iter().collect()
                } else {
                    self.exported_lookup(&target, wanted, visited)
                }
            }
        }
    }

    fn namespace_member(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        import: &Import,
        member: &str,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> Vec<DefRef<'a>> {
        let Some(target) =
            self.modules
                .resolve(&self.files, path, &import.module_path, &graph.language)
        else {
            return Vec::new();
        };
        self.exported_lookup(&target, member, visited)
    }

    /// What `file` exposes under `name`: exported definitions, aliased
    /// exports, and re-export chains. Revisiting a (file, name) pair ends
    /// the walk, which keeps cyclic barrels terminating.
    fn exported_lookup(
        &self,
        file: &Path,
        name: &str,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> Vec<DefRef<'a>> {
        if !visited.insert((file.to_path_buf(), name.to_string())) {
            return Vec::new();
        }
        let Some((path, graph)) = self.graphs.get_key_value(file) else {
            return Vec::new();
        };

        let mut out: Vec<DefRef<'a>> = graph
            .exported_defs(name)
            .into_iter()
            .map(|d| (path, d))
            .collect();

        // `export { foo as bar }` where foo is itself an import
        for alias in graph.export_aliases.iter().filter(|a| a.exported == name) {
            if let Some(import) = graph
                .imports
                .iter()
                .find(|i| i.local_name == alias.local)
            {
                out.extend(self.import_targets(path, graph, import, visited));
            }
        }

        // Named re-exports of this exact name
        for import in graph.re_exports().filter(|i| i.local_name == name) {
            out.extend(self.import_targets(path, graph, import, visited));
        }

        // Wildcard re-exports walk through transitively
        for import in graph.re_exports().filter(|i| i.local_name == "*") {
            if let Some(target) =
                self.modules
                    .resolve(&self.files, path, &import.module_path, &graph.language)
            {
                out.extend(self.exported_lookup(&target, name, visited));
            }
        }

        dedup_defs(out)
    }

    fn module_def(&self, file: &Path) -> Option<DefRef<'a>> {
        let (path, graph) = self.graphs.get_key_value(file)?;
        graph
            .definitions
            .iter()
            .find(|d| d.kind == SymbolKind::Module && d.name == "<module>")
            .map(|d| (path, d))
    }

    /// Resolve `name` to a class-like definition visible at a site.
    fn class_by_name_at(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        name: &str,
        scope: ScopeId,
        at: &TextRange,
    ) -> Option<DefRef<'a>> {
        self.plain_targets(path, graph, name, scope, at)
            .into_iter()
            .find(|(_, d)| {
                matches!(
                    d.kind,
                    SymbolKind::Class | SymbolKind::Interface | SymbolKind::Enum
                )
            })
    }

    // ── Method dispatch ───────────────────────────────────────────────

    /// Methods named `method` on `class`, searching the class itself, its
    /// inheritance chain (depth-first, left-to-right), and — for
    /// interfaces or when nothing matched — its implementing classes.
    fn dispatch(&self, class: DefRef<'a>, method: &str) -> Vec<DefRef<'a>> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect_methods(class, method, &mut out, &mut visited);

        if out.is_empty() || class.1.kind == SymbolKind::Interface {
            for implementor in self.implementors_of(&class.1.name) {
                self.collect_methods(implementor, method, &mut out, &mut visited);
            }
        }
        dedup_defs(out)
    }

    fn collect_methods(
        &self,
        class: DefRef<'a>,
        method: &str,
        out: &mut Vec<DefRef<'a>>,
        visited: &mut HashSet<&'a SymbolId>,
    ) {
        let (path, def) = class;
        if !visited.insert(&def.id) {
            return; // Cyclic hierarchy
        }

        let graph = &self.graphs[path.as_path()];
        out.extend(
            graph
                .definitions
                .iter()
                .filter(|d| {
                    matches!(d.kind, SymbolKind::Method | SymbolKind::Constructor)
                        && d.name == method
                        && d.container.as_deref() == Some(&def.name)
                })
                .map(|d| (path, d)),
        );

        // Inheritance chain, depth-first, left-to-right
        for super_name in &def.superclasses {
            if let Some(super_class) =
                self.class_by_name_at(path, graph, super_name, def.scope, &def.range)
            {
                self.collect_methods(super_class, method, out, visited);
            }
        }
    }

    /// Classes that (transitively) list `type_name` among their supertypes.
    fn implementors_of(&self, type_name: &str) -> Vec<DefRef<'a>> {
        let mut out = Vec::new();
        let mut wanted: Vec<&str> = vec![type_name];
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(type_name);

        let mut i = 0;
        while i < wanted.len() {
            let current = wanted[i];
            i += 1;
            for &(path, def) in &self.classes {
                if def.kind == SymbolKind::Class
                    && def.superclasses.iter().any(|s| s == current)
                {
                    out.push((path, def));
                    if seen.insert(&def.name) {
                        wanted.push(&def.name);
                    }
                }
            }
        }
        out
    }

    fn constructor_of(&self, class: DefRef<'a>) -> Option<DefRef<'a>> {
        let (path, def) = class;
        let graph = &self.graphs[path.as_path()];
        graph
            .definitions
            .iter()
            .find(|d| d.kind == SymbolKind::Constructor && d.container.as_deref() == Some(&def.name))
            .map(|d| (path, d))
    }

    /// The class a `this`/`self` reference belongs to: the smallest class
    /// body containing the site, or — for Rust, where impl blocks sit
    /// outside the struct's span — the enclosing method's container.
    fn enclosing_class(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        range: &TextRange,
    ) -> Option<DefRef<'a>> {
        let by_span = graph
            .definitions
            .iter()
            .filter(|d| matches!(d.kind, SymbolKind::Class | SymbolKind::Interface))
            .filter(|d| {
                d.enclosing_range
                    .as_ref()
                    .is_some_and(|enc| enc.contains(range))
            })
            .min_by_key(|d| d.enclosing_range.as_ref().map_or(usize::MAX, TextRange::len))
            .map(|d| (path, d));
        if by_span.is_some() {
            return by_span;
        }

        let container = graph.enclosing_callable(range)?.container.as_deref()?;
        graph
            .definitions
            .iter()
            .find(|d| {
                matches!(d.kind, SymbolKind::Class | SymbolKind::Interface) && d.name == container
            })
            .map(|d| (path, d))
    }

    /// Callable definitions a name denotes, for reachability facts.
    fn callable_targets(
        &self,
        path: &'a PathBuf,
        graph: &'a ScopeGraph,
        name: &str,
        scope: ScopeId,
        at: &TextRange,
    ) -> Vec<SymbolId> {
        self.plain_targets(path, graph, name, scope, at)
            .into_iter()
            .filter(|(_, d)| d.kind.is_callable() && d.kind != SymbolKind::Module)
            .map(|(_, d)| d.id.clone())
            .collect()
    }

    // ── Tie-breaking ──────────────────────────────────────────────────

    fn sorted(&self, from: &Path, mut defs: Vec<DefRef<'a>>) -> Vec<DefRef<'a>> {
        let from_package = from.parent().map(Path::to_path_buf);
        defs.sort_by(|a, b| {
            let key = |(path, def): &DefRef<'a>| {
                (
                    path.as_path() != from,
                    from_package.as_deref() != path.parent(),
                    def.id.clone(),
                )
            };
            key(a).cmp(&key(b))
        });
        defs
    }

    fn finish(
        &self,
        path: &'a PathBuf,
        reference: &Reference,
        candidates: Vec<DefRef<'a>>,
        base_confidence: Confidence,
        is_callback: bool,
    ) -> Resolution {
        let sorted = self.sorted(path, dedup_defs(candidates));
        let confidence = if sorted.len() > 1 {
            Confidence::Ambiguous
        } else {
            base_confidence
        };
        Resolution {
            reference: reference.id.clone(),
            candidates: sorted.into_iter().map(|(_, d)| d.id.clone()).collect(),
            confidence,
            is_callback_invocation: is_callback,
        }
    }
}

fn dedup_defs<'a>(defs: Vec<DefRef<'a>>) -> Vec<DefRef<'a>> {
    let mut seen = HashSet::new();
    defs.into_iter()
        .filter(|(_, d)| seen.insert(d.id.clone()))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────
