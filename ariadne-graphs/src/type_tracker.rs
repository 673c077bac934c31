// File-local type tracking and indirect reachability.
//
// The tracker maps variables to the class they were bound to (constructor
// calls, typed parameters, one assignment hop, one factory hop) so the
// resolver can dispatch method calls on known receivers. It is strictly
// file-local and bounded; cross-file type flow stays unresolved.
//
// Indirect reachability records functions that become callable without a
// syntactic call edge: stored in a collection that is later read, or passed
// as a value at a call site. Entry-point detection subtracts these.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::TextRange;
use crate::scope_graph::{BoundValue, RefKind, ScopeGraph, ScopeId, SymbolId};

// ── Type tracker ──────────────────────────────────────────────────────

/// Variable → class bindings for one file, keyed by (scope, name).
/// A binding may carry several classes: a union-typed receiver tracks every
/// named member, and dispatch considers them all.
#[derive(Debug, Clone, Default)]
pub struct TypeTracker {
    bindings: HashMap<(ScopeId, String), Vec<SymbolId>>,
}

impl TypeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `name` in `scope` holds an instance of the given classes
    /// (one for constructor/factory bindings, several for union types).
    pub fn bind(&mut self, scope: ScopeId, name: &str, classes: Vec<SymbolId>) {
        if !classes.is_empty() {
            self.bindings.insert((scope, name.to_string()), classes);
        }
    }

    /// The tracked classes of `name` as seen from `scope`, walking outward.
    /// Empty when nothing is known.
    pub fn types_of(&self, graph: &ScopeGraph, scope: ScopeId, name: &str) -> &[SymbolId] {
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            if let Some(classes) = self.bindings.get(&(scope_id, name.to_string())) {
                return classes;
            }
            current = graph.scope(scope_id).parent;
        }
        &[]
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ── Indirect reachability ─────────────────────────────────────────────

/// How a function became reachable without a call edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ReachabilityVia {
    /// Stored in a collection that was later read or passed.
    Collection { name: String, file: PathBuf },
    /// Passed as a value at a call site.
    Argument { file: PathBuf, call: TextRange },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilityEntry {
    pub function: SymbolId,
    pub via: ReachabilityVia,
}

/// The project-wide set of indirectly reachable callables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndirectReachability {
    pub entries: Vec<ReachabilityEntry>,
    reachable: BTreeSet<SymbolId>,
}

impl IndirectReachability {
    pub fn is_reachable(&self, id: &SymbolId) -> bool {
        self.reachable.contains(id)
    }

    pub fn reachable(&self) -> &BTreeSet<SymbolId> {
        &self.reachable
    }

    fn record(&mut self, function: SymbolId, via: ReachabilityVia) {
        self.reachable.insert(function.clone());
        let entry = ReachabilityEntry { function, via };
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    pub fn merge(&mut self, other: IndirectReachability) {
        for entry in other.entries {
            self.record(entry.function, entry.via);
        }
    }
}

/// Compute one file's contribution to indirect reachability.
///
/// `resolve_callable` maps a name (at a scope and site) to the callable
/// definitions it denotes, following imports; non-callable names resolve to
/// nothing and drop out.
pub fn collect_indirect_reachability(
    graph: &ScopeGraph,
    mut resolve_callable: impl FnMut(&str, ScopeId, &TextRange) -> Vec<SymbolId>,
) -> IndirectReachability {
    let mut out = IndirectReachability::default();

    // Collections by variable name, with their member and spread lists.
    struct Collection<'a> {
        scope: ScopeId,
        range: &'a TextRange,
        members: &'a [String],
        spreads: &'a [String],
    }
    let mut collections: HashMap<&str, Collection<'_>> = HashMap::new();
    for binding in &graph.bindings {
        if let BoundValue::Collection { members, spreads } = &binding.value {
            collections.insert(
                binding.target.as_str(),
                Collection {
                    scope: binding.scope,
                    range: &binding.range,
                    members,
                    spreads,
                },
            );
        }
    }

    // Names observed being read, iterated, or passed along.
    let mut read_names: HashSet<&str> = HashSet::new();
    for r in &graph.references {
        if r.kind == RefKind::Read {
            read_names.insert(r.name.as_str());
        }
        if let Some(receiver) = &r.receiver {
            read_names.insert(receiver.as_str());
        }
    }
    for v in &graph.value_uses {
        read_names.insert(v.name.as_str());
    }

    // A read collection exposes its members, and — through spread merges —
    // the members of every collection folded into it.
    let mut live: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for name in collections.keys() {
        if read_names.contains(name) && seen.insert(name) {
            live.push(name);
        }
    }
    let mut i = 0;
    while i < live.len() {
        let name = live[i];
        i += 1;
        if let Some(collection) = collections.get(name) {
            for spread in collection.spreads {
                if collections.contains_key(spread.as_str()) && seen.insert(spread) {
                    live.push(spread);
                }
            }
        }
    }

    for name in &live {
        let Some(collection) = collections.get(*name) else {
            continue;
        };
        for member in collection.members {
            for id in resolve_callable(member, collection.scope, collection.range) {
                out.record(
                    id,
                    ReachabilityVia::Collection {
                        name: (*name).to_string(),
                        file: graph.file_path.clone(),
                    },
                );
            }
        }
    }

    // Functions passed directly as values are reachable regardless.
    for v in &graph.value_uses {
        for id in resolve_callable(&v.name, v.scope, &v.call_range) {
            out.record(
                id,
                ReachabilityVia::Argument {
                    file: graph.file_path.clone(),
                    call: v.call_range,
                },
            );
        }
    }

    out
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SymbolKind;
    use crate::scope_graph::{Reference, ReferenceId, ValueUse, VarBinding};
    use std::path::Path;

    fn span(start: usize, end: usize) -> TextRange {
        TextRange {
            start_byte: start,
            end_byte: end,
            start_row: 0,
            start_col: start,
            end_row: 0,
            end_col: end,
        }
    }

    fn sym(name: &str) -> SymbolId {
        SymbolId::new(SymbolKind::Function, Path::new("f.ts"), &span(0, 1), name)
    }

    fn graph() -> ScopeGraph {
        let mut g = ScopeGraph::empty(Path::new("f.ts"), "typescript");
        g.scopes[0].range = span(0, 1000);
        g
    }

    fn read_ref(g: &ScopeGraph, name: &str, at: usize) -> Reference {
        Reference {
            id: ReferenceId::new(&g.file_path, &span(at, at + name.len()), name),
            name: name.to_string(),
            range: span(at, at + name.len()),
            kind: RefKind::Read,
            scope: ScopeId::ROOT,
            receiver: None,
        }
    }

    #[test]
    fn tracker_walks_scopes_outward() {
        let mut g = graph();
        g.scopes.push(crate::scope_graph::Scope {
            id: ScopeId(1),
            parent: Some(ScopeId::ROOT),
            kind: crate::scope_graph::ScopeKind::Function,
            range: span(10, 500),
        });

        let mut tracker = TypeTracker::new();
        tracker.bind(ScopeId::ROOT, "u", vec![sym("User")]);

        assert_eq!(tracker.types_of(&g, ScopeId(1), "u"), &[sym("User")]);
        assert!(tracker.types_of(&g, ScopeId(1), "v").is_empty());
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let mut g = graph();
        g.scopes.push(crate::scope_graph::Scope {
            id: ScopeId(1),
            parent: Some(ScopeId::ROOT),
            kind: crate::scope_graph::ScopeKind::Function,
            range: span(10, 500),
        });

        let mut tracker = TypeTracker::new();
        tracker.bind(ScopeId::ROOT, "x", vec![sym("Outer")]);
        tracker.bind(ScopeId(1), "x", vec![sym("Inner")]);

        assert_eq!(tracker.types_of(&g, ScopeId(1), "x"), &[sym("Inner")]);
        assert_eq!(tracker.types_of(&g, ScopeId::ROOT, "x"), &[sym("Outer")]);
    }

    #[test]
    fn union_binding_tracks_every_member() {
        let g = graph();
        let mut tracker = TypeTracker::new();
        tracker.bind(ScopeId::ROOT, "h", vec![sym("CsvHandler"), sym("JsonHandler")]);

        assert_eq!(
            tracker.types_of(&g, ScopeId::ROOT, "h"),
            &[sym("CsvHandler"), sym("JsonHandler")]
        );
    }

    #[test]
    fn read_collection_exposes_members() {
        let mut g = graph();
        g.bindings.push(VarBinding {
            target: "HANDLERS".to_string(),
            range: span(0, 50),
            scope: ScopeId::ROOT,
            value: BoundValue::Collection {
                members: vec!["handleAdd".to_string(), "handleSubtract".to_string()],
                spreads: vec![],
            },
        });
        let r = read_ref(&g, "HANDLERS", 60);
        g.references.push(r);

        let reach = collect_indirect_reachability(&g, |name, _, _| vec![sym(name)]);
        assert!(reach.is_reachable(&sym("handleAdd")));
        assert!(reach.is_reachable(&sym("handleSubtract")));
    }

    #[test]
    fn unread_collection_exposes_nothing() {
        let mut g = graph();
        g.bindings.push(VarBinding {
            target: "HANDLERS".to_string(),
            range: span(0, 50),
            scope: ScopeId::ROOT,
            value: BoundValue::Collection {
                members: vec!["handleAdd".to_string()],
                spreads: vec![],
            },
        });

        let reach = collect_indirect_reachability(&g, |name, _, _| vec![sym(name)]);
        assert!(!reach.is_reachable(&sym("handleAdd")));
        assert!(reach.entries.is_empty());
    }

    #[test]
    fn spread_merge_reaches_base_members() {
        let mut g = graph();
        g.bindings.push(VarBinding {
            target: "BASE".to_string(),
            range: span(0, 30),
            scope: ScopeId::ROOT,
            value: BoundValue::Collection {
                members: vec!["baseHandler".to_string()],
                spreads: vec![],
            },
        });
        g.bindings.push(VarBinding {
            target: "EXTENDED".to_string(),
            range: span(40, 90),
            scope: ScopeId::ROOT,
            value: BoundValue::Collection {
                members: vec!["extendedHandler".to_string()],
                spreads: vec!["BASE".to_string()],
            },
        });
        // Only EXTENDED is passed along
        g.value_uses.push(ValueUse {
            name: "EXTENDED".to_string(),
            call_range: span(100, 130),
            scope: ScopeId::ROOT,
        });

        let reach = collect_indirect_reachability(&g, |name, _, _| vec![sym(name)]);
        assert!(reach.is_reachable(&sym("extendedHandler")));
        assert!(
            reach.is_reachable(&sym("baseHandler")),
            "spread-merged members must be reachable through the merged collection"
        );
    }

    #[test]
    fn named_function_argument_is_reachable() {
        let mut g = graph();
        g.value_uses.push(ValueUse {
            name: "onTick".to_string(),
            call_range: span(0, 25),
            scope: ScopeId::ROOT,
        });

        let reach = collect_indirect_reachability(&g, |name, _, _| vec![sym(name)]);
        assert!(reach.is_reachable(&sym("onTick")));
        assert!(matches!(
            reach.entries[0].via,
            ReachabilityVia::Argument { .. }
        ));
    }

    #[test]
    fn non_callable_names_drop_out() {
        let mut g = graph();
        g.value_uses.push(ValueUse {
            name: "CONFIG".to_string(),
            call_range: span(0, 25),
            scope: ScopeId::ROOT,
        });

        let reach = collect_indirect_reachability(&g, |_, _, _| vec![]);
        assert!(reach.entries.is_empty());
    }

    #[test]
    fn merge_accumulates_across_files() {
        let mut a = IndirectReachability::default();
        a.record(
            sym("f"),
            ReachabilityVia::Argument {
                file: PathBuf::from("a.ts"),
                call: span(0, 5),
            },
        );
        let mut b = IndirectReachability::default();
        b.record(
            sym("g"),
            ReachabilityVia::Argument {
                file: PathBuf::from("b.ts"),
                call: span(0, 5),
            },
        );

        a.merge(b);
        assert!(a.is_reachable(&sym("f")));
        assert!(a.is_reachable(&sym("g")));
    }
}
