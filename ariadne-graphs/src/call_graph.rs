// Call graph construction and entry-point detection.
//
// A single pass over the resolved references builds one CallableNode per
// function/method/constructor definition (plus the implicit module-level
// callable of each file), copies the call references whose type is a call,
// reverse-indexes callers, and detects entry points: callables with no
// incoming edges that are not indirectly reachable through a collection or
// value argument. Language filter: a Python module that other files import
// and that carries no `if __name__ == "__main__":` guard is a library, so
// its implicit module callable is not reported as an entry point; guarded
// files are scripts and always are.
//
// Two runs over identical inputs produce byte-identical serialized graphs:
// nodes live in a BTreeMap, callers in BTreeSets, and entry points are
// ordered by (file, line).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::resolver::Resolution;
use crate::scope_graph::{Definition, NameLookup, ReferenceId, RefKind, ScopeGraph, ScopeId, SymbolId};
use crate::type_tracker::IndirectReachability;
use crate::{SymbolKind, TextRange};

// ── Options ───────────────────────────────────────────────────────────

/// Options accepted by `get_call_graph`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallGraphOptions {
    /// Keep call references whose callee is an import of a module outside
    /// the project. Defaults to false: external calls are pruned.
    #[serde(default)]
    pub include_external: bool,
    /// Restrict the graph to nodes within this many call edges of an entry
    /// point.
    #[serde(default)]
    pub max_depth: Option<usize>,
    /// Glob over file paths; nodes in non-matching files are dropped.
    #[serde(default)]
    pub file_filter: Option<String>,
}

// ── Graph entities ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallType {
    Function,
    Method,
    Constructor,
    CallbackInvocation,
}

/// One call site inside a callable, with its resolved targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallReference {
    pub location: TextRange,
    pub name: String,
    /// Enclosing scope of the call site.
    pub scope: ScopeId,
    pub call_type: CallType,
    /// Callable definitions this call may land on; empty when unresolved.
    pub resolved_to: Vec<SymbolId>,
    pub is_callback_invocation: bool,
}

/// A callable definition with its outgoing calls and incoming callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallableNode {
    pub symbol_id: SymbolId,
    pub file: PathBuf,
    pub definition: Definition,
    pub calls: Vec<CallReference>,
    pub callers: BTreeSet<SymbolId>,
}

/// The project-wide call graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallGraph {
    pub nodes: BTreeMap<SymbolId, CallableNode>,
    /// Callables with no callers and no indirect reachability, ordered by
    /// (file, line).
    pub entry_points: Vec<SymbolId>,
    pub reachability: IndirectReachability,
}

impl CallGraph {
    /// Canonical serialized form: `{nodes: [...], entry_points: [...]}`
    /// with nodes ordered by symbol id. Field names are stable.
    pub fn to_json(&self) -> serde_json::Value {
        let nodes: Vec<serde_json::Value> = self
            .nodes
            .values()
            .map(|node| {
                serde_json::json!({
                    "symbol_id": node.symbol_id,
                    "file": node.file,
                    "definition": node.definition,
                    "calls": node.calls,
                    "callers": node.callers,
                })
            })
            .collect();
        serde_json::json!({
            "nodes": nodes,
            "entry_points": self.entry_points,
        })
    }

    pub fn node(&self, id: &SymbolId) -> Option<&CallableNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ── Builder ───────────────────────────────────────────────────────────

/// Build the call graph from per-file scope graphs and resolver output.
pub fn build_call_graph(
    graphs: &BTreeMap<PathBuf, ScopeGraph>,
    resolutions: &BTreeMap<PathBuf, Vec<Resolution>>,
    reachability: &IndirectReachability,
    options: &CallGraphOptions,
) -> CallGraph {
    let filter = options.file_filter.as_deref().and_then(|f| {
        glob::Pattern::new(f)
            .inspect_err(|e| warn!(pattern = f, error = %e, "invalid file filter, ignoring"))
            .ok()
    });
    let included = |path: &PathBuf| filter.as_ref().is_none_or(|p| p.matches_path(path));

    // Every definition's kind, project-wide, for target filtering.
    let kind_of: HashMap<&SymbolId, SymbolKind> = graphs
        .values()
        .flat_map(|g| g.definitions.iter().map(|d| (&d.id, d.kind)))
        .collect();

    let mut graph = CallGraph {
        reachability: reachability.clone(),
        ..CallGraph::default()
    };

    // Pass 1: one node per callable definition in included files.
    for (path, file_graph) in graphs {
        if !included(path) {
            continue;
        }
        for def in &file_graph.definitions {
            if def.kind.is_callable() {
                graph.nodes.insert(
                    def.id.clone(),
                    CallableNode {
                        symbol_id: def.id.clone(),
                        file: path.clone(),
                        definition: def.clone(),
                        calls: Vec::new(),
                        callers: BTreeSet::new(),
                    },
                );
            }
        }
    }

    // Pass 2: attach call references to their enclosing callables.
    let by_reference: HashMap<&ReferenceId, &Resolution> = resolutions
        .values()
        .flatten()
        .map(|r| (&r.reference, r))
        .collect();
    let mut edges: Vec<(SymbolId, SymbolId)> = Vec::new();

    for (path, file_graph) in graphs {
        if !included(path) {
            continue;
        }
        let mut seen: HashSet<(TextRange, String, CallType)> = HashSet::new();

        for reference in &file_graph.references {
            if !matches!(
                reference.kind,
                RefKind::Call | RefKind::MethodCall | RefKind::ConstructorCall
            ) {
                continue;
            }
            let Some(caller) = file_graph.enclosing_callable(&reference.range) else {
                continue;
            };

            let resolution = by_reference.get(&reference.id).copied();
            let call = make_call_reference(reference, resolution, &kind_of, &graph.nodes);

            // External callees (imports of modules outside the project) are
            // pruned unless asked for.
            if call.resolved_to.is_empty() && !options.include_external {
                let bound_by_import = matches!(
                    file_graph.lookup(&reference.name, reference.scope, &reference.range),
                    NameLookup::Import(_)
                );
                if bound_by_import {
                    continue;
                }
            }

            // Duplicate captures collapse by (range, name, call_type).
            if !seen.insert((call.location, call.name.clone(), call.call_type)) {
                continue;
            }

            for target in &call.resolved_to {
                edges.push((caller.id.clone(), target.clone()));
            }
            if let Some(node) = graph.nodes.get_mut(&caller.id) {
                node.calls.push(call);
            }
        }
    }

    // Pass 3: reverse caller index.
    for (caller, callee) in edges {
        if let Some(node) = graph.nodes.get_mut(&callee) {
            node.callers.insert(caller);
        }
    }

    // Pass 4: entry points, ordered by (file, line).
    //
    // Files whose definitions are resolved to from other files are
    // imported somewhere; a guard-less Python module among them is a
    // library, and its implicit module callable is not an entry point.
    let file_of_def: HashMap<&SymbolId, &PathBuf> = graphs
        .iter()
        .flat_map(|(p, g)| g.definitions.iter().map(move |d| (&d.id, p)))
        .collect();
    let mut imported_files: HashSet<&PathBuf> = HashSet::new();
    for (path, file_resolutions) in resolutions {
        for resolution in file_resolutions {
            for candidate in &resolution.candidates {
                if let Some(&def_file) = file_of_def.get(candidate) {
                    if def_file != path {
                        imported_files.insert(def_file);
                    }
                }
            }
        }
    }
    let is_library_module = |node: &CallableNode| {
        node.definition.kind == SymbolKind::Module
            && imported_files.contains(&node.file)
            && graphs
                .get(&node.file)
                .is_some_and(|g| g.language == "python" && !g.has_main_guard)
    };

    let mut entries: Vec<&CallableNode> = graph
        .nodes
        .values()
        .filter(|n| n.callers.is_empty())
        .filter(|n| !graph.reachability.is_reachable(&n.symbol_id))
        .filter(|n| !is_library_module(n))
        .collect();
    entries.sort_by(|a, b| {
        (a.file.as_path(), a.definition.range.start_row, &a.symbol_id).cmp(&(
            b.file.as_path(),
            b.definition.range.start_row,
            &b.symbol_id,
        ))
    });
    graph.entry_points = entries.into_iter().map(|n| n.symbol_id.clone()).collect();

    if let Some(depth) = options.max_depth {
        restrict_to_depth(&mut graph, depth);
    }

    graph
}

fn make_call_reference(
    reference: &crate::scope_graph::Reference,
    resolution: Option<&Resolution>,
    kind_of: &HashMap<&SymbolId, SymbolKind>,
    nodes: &BTreeMap<SymbolId, CallableNode>,
) -> CallReference {
    let is_callback = resolution.is_some_and(|r| r.is_callback_invocation);

    // Only callable targets that survived file filtering count.
    let resolved_to: Vec<SymbolId> = resolution
        .map(|r| {
            r.candidates
                .iter()
                .filter(|id| {
                    kind_of
                        .get(*id)
                        .is_some_and(|k| k.is_callable() && *k != SymbolKind::Module)
                })
                .filter(|id| nodes.contains_key(*id))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let call_type = match reference.kind {
        RefKind::ConstructorCall => CallType::Constructor,
        RefKind::MethodCall => CallType::Method,
        _ if is_callback => CallType::CallbackInvocation,
        // A plain call that lands on constructors is a construction
        // (Python `User()`).
        _ if !resolved_to.is_empty()
            && resolved_to
                .iter()
                .all(|id| kind_of.get(id) == Some(&SymbolKind::Constructor)) =>
        {
            CallType::Constructor
        }
        _ => CallType::Function,
    };

    CallReference {
        location: reference.range,
        name: reference.name.clone(),
        scope: reference.scope,
        call_type,
        resolved_to,
        is_callback_invocation: is_callback,
    }
}

/// Keep only nodes within `depth` call edges of an entry point.
fn restrict_to_depth(graph: &mut CallGraph, depth: usize) {
    let ids: Vec<SymbolId> = graph.nodes.keys().cloned().collect();
    let mut dg: DiGraph<&SymbolId, ()> = DiGraph::new();
    let mut index_of: HashMap<&SymbolId, NodeIndex> = HashMap::new();
    for id in &ids {
        index_of.insert(id, dg.add_node(id));
    }
    for node in graph.nodes.values() {
        for call in &node.calls {
            for target in &call.resolved_to {
                if let (Some(&a), Some(&b)) =
                    (index_of.get(&node.symbol_id), index_of.get(target))
                {
                    dg.add_edge(a, b, ());
                }
            }
        }
    }

    // Level-bounded BFS from all entry points.
    let mut kept: HashSet<NodeIndex> = HashSet::new();
    let mut frontier: Vec<NodeIndex> = graph
        .entry_points
        .iter()
        .filter_map(|id| index_of.get(id).copied())
        .collect();
    kept.extend(&frontier);
    for _ in 0..depth {
        let mut next = Vec::new();
        for &idx in &frontier {
            for neighbor in dg.neighbors(idx) {
                if kept.insert(neighbor) {
                    next.push(neighbor);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    let kept_ids: BTreeSet<SymbolId> = kept.iter().map(|&i| SymbolId::clone(dg[i])).collect();
    graph.nodes.retain(|id, _| kept_ids.contains(id));
    for node in graph.nodes.values_mut() {
        node.callers.retain(|id| kept_ids.contains(id));
        for call in &mut node.calls {
            call.resolved_to.retain(|id| kept_ids.contains(id));
        }
    }
    graph.entry_points.retain(|id| kept_ids.contains(id));
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::LanguageRegistry;
    use crate::resolver::{Resolver, ResolverConfig};
    use std::path::Path;

    fn analyze(files: &[(&str, &str)]) -> (BTreeMap<PathBuf, ScopeGraph>, CallGraph) {
        analyze_with(files, &CallGraphOptions::default())
    }

    fn analyze_with(
        files: &[(&str, &str)],
        options: &CallGraphOptions,
    ) -> (BTreeMap<PathBuf, ScopeGraph>, CallGraph) {
        let registry = LanguageRegistry::new();
        let mut graphs = BTreeMap::new();
        for (path, source) in files {
            let path = Path::new(path);
            let lang = registry.for_file(path).expect("supported language");
            let mut parser = tree_sitter::Parser::new();
            parser.set_language(&lang.tree_sitter_language()).unwrap();
            let tree = parser.parse(source, None).unwrap();
            graphs.insert(
                path.to_path_buf(),
                lang.build_scope_graph(&tree, source, path).unwrap(),
            );
        }
        let project =
            Resolver::new(&graphs, Path::new(""), ResolverConfig::default()).resolve_project();
        let cg = build_call_graph(&graphs, &project.resolutions, &project.reachability, options);
        (graphs, cg)
    }

    fn node_named<'g>(cg: &'g CallGraph, name: &str) -> &'g CallableNode {
        cg.nodes
            .values()
            .find(|n| n.definition.name == name)
            .unwrap_or_else(|| panic!("no node named {name}"))
    }

    fn entry_names(cg: &CallGraph) -> Vec<String> {
        cg.entry_points
            .iter()
            .map(|id| cg.nodes[id].definition.name.clone())
            .collect()
    }

    #[test]
    fn same_file_constructor_then_method() {
        let (_, cg) = analyze(&[(
            "main.ts",
            "class User { greet() { return \"hi\"; } }\nconst u = new User();\nu.greet();\n",
        )]);

        let greet = node_named(&cg, "greet");
        assert_eq!(greet.callers.len(), 1, "greet is called from module level");
        let caller = &cg.nodes[greet.callers.iter().next().unwrap()];
        assert_eq!(caller.definition.name, "<module>");

        let ctor = node_named(&cg, "constructor");
        assert_eq!(ctor.callers.len(), 1);

        let entries = entry_names(&cg);
        assert!(entries.contains(&"<module>".to_string()));
        assert!(!entries.contains(&"greet".to_string()));
    }

    #[test]
    fn cross_file_import_call() {
        let (_, cg) = analyze(&[
            ("utils.ts", "export function helper(): void {}\n"),
            ("main.ts", "import { helper } from './utils';\nhelper();\n"),
        ]);

        let helper = node_named(&cg, "helper");
        assert_eq!(helper.callers.len(), 1);
        assert!(!entry_names(&cg).contains(&"helper".to_string()));
    }

    #[test]
    fn shadowed_import_leaves_export_uncalled() {
        let (_, cg) = analyze(&[
            ("utils.ts", "export function helper(): void {}\n"),
            (
                "main.ts",
                "import { helper } from './utils';\nfunction helper(): void {}\nhelper();\n",
            ),
        ]);

        let exported = cg
            .nodes
            .values()
            .find(|n| n.definition.name == "helper" && n.file == Path::new("utils.ts"))
            .unwrap();
        assert!(exported.callers.is_empty(), "shadowed import gets no calls");
        assert!(
            cg.entry_points.contains(&exported.symbol_id),
            "the uncalled export is an entry point"
        );

        let local = cg
            .nodes
            .values()
            .find(|n| n.definition.name == "helper" && n.file == Path::new("main.ts"))
            .unwrap();
        assert_eq!(local.callers.len(), 1);
    }

    #[test]
    fn polymorphic_handlers_all_have_caller() {
        let (_, cg) = analyze(&[(
            "handlers.ts",
            "interface Handler { process(): void; }\n\
             class CsvHandler implements Handler { process() {} }\n\
             class JsonHandler implements Handler { process() {} }\n\
             class XmlHandler implements Handler { process() {} }\n\
             function execute(h: Handler) { h.process(); }\n",
        )]);

        let processes: Vec<&CallableNode> = cg
            .nodes
            .values()
            .filter(|n| n.definition.name == "process")
            .collect();
        assert_eq!(processes.len(), 3);
        for process in processes {
            let caller_names: Vec<_> = process
                .callers
                .iter()
                .map(|id| cg.nodes[id].definition.name.as_str())
                .collect();
            assert_eq!(caller_names, vec!["execute"], "execute calls every implementation");
        }
    }

    #[test]
    fn collection_members_are_not_entry_points() {
        let (_, cg) = analyze(&[(
            "ops.ts",
            "function handleAdd() {}\n\
             function handleSubtract() {}\n\
             function processOperations(ops, handlers) {}\n\
             const HANDLERS = { add: handleAdd, subtract: handleSubtract };\n\
             processOperations([\"add\"], HANDLERS);\n",
        )]);

        let entries = entry_names(&cg);
        assert!(!entries.contains(&"handleAdd".to_string()));
        assert!(!entries.contains(&"handleSubtract".to_string()));
        assert!(entries.contains(&"<module>".to_string()));
    }

    #[test]
    fn spread_merged_collection_reaches_base() {
        let (_, cg) = analyze(&[(
            "ops.ts",
            "function baseHandler() {}\n\
             function extendedHandler() {}\n\
             function register(handlers) {}\n\
             const BASE = { base: baseHandler };\n\
             const EXTENDED = { ...BASE, extended: extendedHandler };\n\
             register(EXTENDED);\n",
        )]);

        let entries = entry_names(&cg);
        assert!(!entries.contains(&"baseHandler".to_string()));
        assert!(!entries.contains(&"extendedHandler".to_string()));
    }

    #[test]
    fn unresolved_local_call_is_retained() {
        let (_, cg) = analyze(&[("main.ts", "function run() {\n  mystery();\n}\n")]);
        let run = node_named(&cg, "run");
        assert_eq!(run.calls.len(), 1);
        assert!(run.calls[0].resolved_to.is_empty());
    }

    #[test]
    fn external_import_call_pruned_by_default() {
        let (_, cg) = analyze(&[(
            "main.ts",
            "import { fetch } from 'node-fetch';\nfunction run() {\n  fetch();\n}\n",
        )]);
        let run = node_named(&cg, "run");
        assert!(run.calls.is_empty(), "external callee pruned by default");

        let (_, cg) = analyze_with(
            &[(
                "main.ts",
                "import { fetch } from 'node-fetch';\nfunction run() {\n  fetch();\n}\n",
            )],
            &CallGraphOptions {
                include_external: true,
                ..CallGraphOptions::default()
            },
        );
        let run = node_named(&cg, "run");
        assert_eq!(run.calls.len(), 1);
        assert!(run.calls[0].resolved_to.is_empty());
    }

    #[test]
    fn duplicate_call_sites_dedup_by_range_name_type() {
        let (_, cg) = analyze(&[(
            "main.ts",
            "function f() {}\nfunction g() {\n  f();\n  f();\n}\n",
        )]);
        let g = node_named(&cg, "g");
        assert_eq!(g.calls.len(), 2, "distinct ranges are distinct calls");

        let f = node_named(&cg, "f");
        assert_eq!(f.callers.len(), 1);
    }

    #[test]
    fn entry_points_ordered_by_file_then_line() {
        let (_, cg) = analyze(&[
            ("a.ts", "export function alpha() {}\nexport function beta() {}\n"),
            ("b.ts", "export function gamma() {}\n"),
        ]);
        let entries = entry_names(&cg);
        let alpha = entries.iter().position(|n| n == "alpha").unwrap();
        let beta = entries.iter().position(|n| n == "beta").unwrap();
        let gamma = entries.iter().position(|n| n == "gamma").unwrap();
        assert!(alpha < beta && beta < gamma);
    }

    #[test]
    fn file_filter_restricts_nodes() {
        let (_, cg) = analyze_with(
            &[
                ("src/app.ts", "export function app() {}\n"),
                ("test/app.test.ts", "export function checkApp() {}\n"),
            ],
            &CallGraphOptions {
                file_filter: Some("src/**".to_string()),
                ..CallGraphOptions::default()
            },
        );
        assert!(cg.nodes.values().all(|n| n.file.starts_with("src")));
    }

    #[test]
    fn max_depth_limits_reach() {
        let (_, cg) = analyze_with(
            &[(
                "main.ts",
                "function a() { b(); }\nfunction b() { c(); }\nfunction c() {}\na();\n",
            )],
            &CallGraphOptions {
                max_depth: Some(1),
                ..CallGraphOptions::default()
            },
        );
        // Depth 0: <module> (entry). Depth 1: a. b and c are beyond.
        let names: Vec<&str> = cg
            .nodes
            .values()
            .map(|n| n.definition.name.as_str())
            .collect();
        assert!(names.contains(&"<module>"));
        assert!(names.contains(&"a"));
        assert!(!names.contains(&"c"));
    }

    #[test]
    fn python_library_module_is_not_an_entry_point() {
        let (_, cg) = analyze(&[
            ("utils.py", "def helper():\n    pass\n"),
            (
                "main.py",
                "from utils import helper\n\nif __name__ == \"__main__\":\n    helper()\n",
            ),
        ]);

        let module_of = |file: &str| {
            cg.nodes
                .values()
                .find(|n| n.definition.name == "<module>" && n.file == Path::new(file))
                .unwrap()
        };
        assert!(
            !cg.entry_points.contains(&module_of("utils.py").symbol_id),
            "an imported, guard-less module is a library"
        );
        assert!(
            cg.entry_points.contains(&module_of("main.py").symbol_id),
            "the guarded script stays an entry point"
        );

        // The guarded call gives helper a caller, so it is no orphan
        let helper = node_named(&cg, "helper");
        assert_eq!(helper.callers.len(), 1);
        assert!(!cg.entry_points.contains(&helper.symbol_id));
    }

    #[test]
    fn unimported_python_module_without_guard_is_kept() {
        let (_, cg) = analyze(&[("scratch.py", "def probe():\n    pass\nprobe()\n")]);
        let module = cg
            .nodes
            .values()
            .find(|n| n.definition.name == "<module>")
            .unwrap();
        assert!(
            cg.entry_points.contains(&module.symbol_id),
            "nothing imports the file, so it stays an entry point"
        );
    }

    #[test]
    fn python_test_functions_tagged_but_retained() {
        let (_, cg) = analyze(&[(
            "test_math.py",
            "def test_addition():\n    assert 1 + 1 == 2\n",
        )]);
        let test_fn = node_named(&cg, "test_addition");
        assert!(test_fn.definition.is_test);
        assert!(cg.entry_points.contains(&test_fn.symbol_id));
    }

    #[test]
    fn serialization_is_deterministic() {
        let files = [
            ("b.ts", "export function beta() {}\n"),
            (
                "a.ts",
                "import { beta } from './b';\nexport function alpha() { beta(); }\n",
            ),
        ];
        let (_, first) = analyze(&files);
        let (_, second) = analyze(&files);
        assert_eq!(
            first.to_json().to_string(),
            second.to_json().to_string(),
            "identical inputs must serialize identically"
        );
    }

    #[test]
    fn canonical_json_shape() {
        let (_, cg) = analyze(&[("main.ts", "export function solo() {}\n")]);
        let json = cg.to_json();
        assert!(json.get("nodes").is_some_and(serde_json::Value::is_array));
        assert!(
            json.get("entry_points")
                .is_some_and(serde_json::Value::is_array)
        );
        let node = &json["nodes"][0];
        for field in ["symbol_id", "definition", "calls", "callers"] {
            assert!(node.get(field).is_some(), "missing field {field}");
        }
    }
}
