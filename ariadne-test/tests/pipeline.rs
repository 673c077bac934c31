// End-to-end pipeline tests: source files in, resolved call graph out.

use std::path::{Path, PathBuf};

use ariadne_core::Project;
use ariadne_core::config::AnalyzerConfig;
use ariadne_graphs::{Edit, Point};
use ariadne_test::{build_project, call_graph_json, handler_suite, multi_language_suite};

fn entry_names(project: &Project) -> Vec<String> {
    let cg = project.get_call_graph(None).unwrap();
    cg.entry_points
        .iter()
        .map(|id| cg.nodes[id].definition.name.clone())
        .collect()
}

// ── Literal scenarios ─────────────────────────────────────────────────

#[test]
fn same_file_constructor_then_method() {
    ariadne_test::init_test_logging();
    let project = build_project(&[(
        "main.ts",
        "class User { greet() { return \"hi\"; } }\nconst u = new User(); u.greet();\n",
    )])
    .unwrap();

    let cg = project.get_call_graph(None).unwrap();
    let greet = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "greet")
        .expect("greet node");
    assert_eq!(greet.callers.len(), 1);
    assert_eq!(
        cg.nodes[greet.callers.iter().next().unwrap()].definition.name,
        "<module>"
    );

    let ctor = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "constructor")
        .expect("synthesized constructor node");
    assert_eq!(ctor.callers.len(), 1);

    let entries = entry_names(&project);
    assert!(entries.contains(&"<module>".to_string()));
    assert!(!entries.contains(&"greet".to_string()));
}

#[test]
fn cross_file_import_call() {
    let project = build_project(&[
        ("utils.ts", "export function helper() {}\n"),
        ("main.ts", "import { helper } from './utils';\nhelper();\n"),
    ])
    .unwrap();

    let cg = project.get_call_graph(None).unwrap();
    let helper = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "helper")
        .unwrap();
    let caller = &cg.nodes[helper.callers.iter().next().unwrap()];
    assert_eq!(caller.definition.name, "<module>");
    assert_eq!(caller.file, Path::new("main.ts"));
    assert!(!entry_names(&project).contains(&"helper".to_string()));
}

#[test]
fn shadowed_import_resolves_to_local() {
    let project = build_project(&[
        ("utils.ts", "export function helper() {}\n"),
        (
            "main.ts",
            "import { helper } from './utils';\nfunction helper() {}\nhelper();\n",
        ),
    ])
    .unwrap();

    let cg = project.get_call_graph(None).unwrap();
    let local = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "helper" && n.file == Path::new("main.ts"))
        .unwrap();
    assert_eq!(local.callers.len(), 1, "the call lands on the local function");

    let imported = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "helper" && n.file == Path::new("utils.ts"))
        .unwrap();
    assert!(imported.callers.is_empty());
    assert!(
        cg.entry_points.contains(&imported.symbol_id),
        "the shadowed export has no callers anywhere"
    );
}

#[test]
fn polymorphic_handlers_have_execute_as_caller() {
    let project = build_project(&handler_suite()).unwrap();
    let cg = project.get_call_graph(None).unwrap();

    let processes: Vec<_> = cg
        .nodes
        .values()
        .filter(|n| n.definition.name == "process")
        .collect();
    assert_eq!(processes.len(), 3, "one per implementation");
    for node in processes {
        let callers: Vec<_> = node
            .callers
            .iter()
            .map(|id| cg.nodes[id].definition.name.as_str())
            .collect();
        assert_eq!(callers, vec!["execute"], "{}", node.file.display());
    }
}

#[test]
fn collection_of_handlers_excluded_from_entry_points() {
    let project = build_project(&[(
        "ops.ts",
        "function handleAdd() {}\n\
         function handleSubtract() {}\n\
         function processOperations(ops, handlers) {}\n\
         const HANDLERS = { add: handleAdd, subtract: handleSubtract };\n\
         processOperations([\"add\"], HANDLERS);\n",
    )])
    .unwrap();

    let entries = entry_names(&project);
    assert!(!entries.contains(&"handleAdd".to_string()));
    assert!(!entries.contains(&"handleSubtract".to_string()));
}

#[test]
fn spread_merged_collection_reaches_both_sides() {
    let project = build_project(&[(
        "ops.ts",
        "function baseHandler() {}\n\
         function extendedHandler() {}\n\
         function register(handlers) {}\n\
         const BASE = { base: baseHandler };\n\
         const EXTENDED = { ...BASE, extended: extendedHandler };\n\
         register(EXTENDED);\n",
    )])
    .unwrap();

    let entries = entry_names(&project);
    assert!(!entries.contains(&"baseHandler".to_string()));
    assert!(!entries.contains(&"extendedHandler".to_string()));
}

// ── Boundary behaviors ────────────────────────────────────────────────

#[test]
fn empty_file_yields_empty_graph() {
    let project = build_project(&[("empty.ts", "")]).unwrap();
    let graph = project.get_scope_graph(Path::new("empty.ts")).unwrap();
    assert!(graph.references.is_empty());
    assert!(graph.imports.is_empty());
    // Only the implicit module definition
    assert_eq!(graph.definitions.len(), 1);
    assert_eq!(graph.definitions[0].name, "<module>");
}

#[test]
fn byte_limit_edge() {
    let mut source = String::new();
    for i in 0..64 {
        source.push_str(&format!("function fn{i:02}() {{}}\n"));
    }

    // At exactly the limit: indexed whole
    let mut config = AnalyzerConfig::default();
    config.parser.max_file_bytes = source.len();
    let mut at_limit = Project::with_config(Path::new(""), config);
    at_limit
        .add_or_update_file(Path::new("edge.ts"), &source, None)
        .unwrap();
    assert_eq!(
        at_limit
            .get_scope_graph(Path::new("edge.ts"))
            .unwrap()
            .defs_named("fn00")
            .count(),
        1
    );

    // One byte over: split into virtual sub-files, nothing lost
    let mut config = AnalyzerConfig::default();
    config.parser.max_file_bytes = source.len() - 1;
    let mut over = Project::with_config(Path::new(""), config);
    over.add_or_update_file(Path::new("edge.ts"), &source, None)
        .unwrap();
    let graph = over.get_scope_graph(Path::new("edge.ts")).unwrap();
    for i in 0..64 {
        assert_eq!(
            graph.defs_named(&format!("fn{i:02}")).count(),
            1,
            "definition fn{i:02} must survive the split"
        );
    }
}

#[test]
fn cyclic_reexport_chain_terminates() {
    let project = build_project(&[
        ("a.ts", "export * from './b';\nexport function foo() {}\n"),
        ("b.ts", "export * from './a';\n"),
        ("main.ts", "import { foo } from './b';\nfoo();\n"),
    ])
    .unwrap();

    let cg = project.get_call_graph(None).unwrap();
    let foo = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "foo")
        .unwrap();
    assert_eq!(foo.file, Path::new("a.ts"));
    assert_eq!(foo.callers.len(), 1);
}

// ── Determinism, idempotence, incrementality ──────────────────────────

#[test]
fn identical_inputs_serialize_identically() {
    let files = handler_suite();
    let first = build_project(&files).unwrap();
    let second = build_project(&files).unwrap();
    assert_eq!(
        call_graph_json(&first).unwrap(),
        call_graph_json(&second).unwrap()
    );
}

#[test]
fn re_adding_a_file_is_idempotent() {
    let mut project = build_project(&[
        ("utils.ts", "export function helper() {}\n"),
        ("main.ts", "import { helper } from './utils';\nhelper();\n"),
    ])
    .unwrap();
    let before = call_graph_json(&project).unwrap();

    project
        .add_or_update_file(
            Path::new("main.ts"),
            "import { helper } from './utils';\nhelper();\n",
            None,
        )
        .unwrap();
    assert_eq!(call_graph_json(&project).unwrap(), before);
}

#[test]
fn incremental_edit_round_trips() {
    let v1 = "function a() {}\nfunction b() { a(); }\n";
    let v2 = "function a() {}\nfunction b() { a(); }\nfunction c() { b(); }\n";

    let mut edited = Project::new(Path::new(""));
    edited
        .add_or_update_file(Path::new("m.ts"), v1, None)
        .unwrap();
    let edit = Edit {
        start_byte: v1.len(),
        old_end_byte: v1.len(),
        new_end_byte: v2.len(),
        start_position: Point { row: 2, column: 0 },
        old_end_position: Point { row: 2, column: 0 },
        new_end_position: Point { row: 3, column: 0 },
    };
    edited
        .add_or_update_file(Path::new("m.ts"), v2, Some(&edit))
        .unwrap();

    let fresh = build_project(&[("m.ts", v2)]).unwrap();
    assert_eq!(
        call_graph_json(&edited).unwrap(),
        call_graph_json(&fresh).unwrap(),
        "incremental result must equal indexing from scratch"
    );
}

// ── Multi-language project ────────────────────────────────────────────

#[test]
fn multi_language_project_resolves_each_language() {
    let project = build_project(&multi_language_suite()).unwrap();
    let cg = project.get_call_graph(None).unwrap();

    // TS: formatResponse called from web/index.ts
    let format = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "formatResponse")
        .unwrap();
    assert_eq!(format.callers.len(), 1);

    // Rust: decode called from svc/src/lib.rs via `use crate::codec::decode`
    let decode = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "decode")
        .unwrap();
    let caller_names: Vec<_> = decode
        .callers
        .iter()
        .map(|id| cg.nodes[id].definition.name.as_str())
        .collect();
    assert_eq!(caller_names, vec!["handle"]);

    // Python: the main guard is recorded, build_report has a caller
    let report_graph = project
        .get_scope_graph(Path::new("scripts/report.py"))
        .unwrap();
    assert!(report_graph.has_main_guard);
    let build_report = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "build_report")
        .unwrap();
    assert_eq!(build_report.callers.len(), 1);
}

#[test]
fn python_guard_separates_scripts_from_libraries() {
    let project = build_project(&[
        ("lib/util.py", "def helper():\n    pass\n"),
        (
            "tool.py",
            "from lib.util import helper\n\ndef main():\n    helper()\n\nif __name__ == \"__main__\":\n    main()\n",
        ),
    ])
    .unwrap();
    let cg = project.get_call_graph(None).unwrap();

    let module_of = |file: &str| {
        cg.nodes
            .values()
            .find(|n| n.definition.name == "<module>" && n.file == Path::new(file))
            .unwrap()
    };
    assert!(
        cg.entry_points.contains(&module_of("tool.py").symbol_id),
        "the guarded script is an entry point"
    );
    assert!(
        !cg.entry_points.contains(&module_of("lib/util.py").symbol_id),
        "the imported, guard-less module is a library, not an entry point"
    );

    // main is dispatched from the guard; neither it nor helper is an orphan
    let main_fn = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "main")
        .unwrap();
    assert!(!cg.entry_points.contains(&main_fn.symbol_id));
    let helper = cg
        .nodes
        .values()
        .find(|n| n.definition.name == "helper")
        .unwrap();
    assert!(!cg.entry_points.contains(&helper.symbol_id));
}

#[test]
fn union_typed_receiver_reaches_every_member() {
    let project = build_project(&[(
        "readers.ts",
        "class CsvReader { read() {} }\n\
         class JsonReader { read() {} }\n\
         function load(r: CsvReader | JsonReader) { r.read(); }\n",
    )])
    .unwrap();
    let cg = project.get_call_graph(None).unwrap();

    let reads: Vec<_> = cg
        .nodes
        .values()
        .filter(|n| n.definition.name == "read")
        .collect();
    assert_eq!(reads.len(), 2);
    for read in reads {
        let callers: Vec<_> = read
            .callers
            .iter()
            .map(|id| cg.nodes[id].definition.name.as_str())
            .collect();
        assert_eq!(callers, vec!["load"], "load calls both union members");
    }
}

#[test]
fn canonical_json_shape_is_stable() {
    let project = build_project(&[("main.ts", "export function solo() {}\n")]).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&call_graph_json(&project).unwrap()).unwrap();
    assert!(json["nodes"].is_array());
    assert!(json["entry_points"].is_array());
    let node = &json["nodes"][0];
    for field in ["symbol_id", "definition", "calls", "callers"] {
        assert!(node.get(field).is_some(), "canonical field {field} missing");
    }
}

#[test]
fn find_references_and_go_to_definition_round_trip() {
    let project = build_project(&[
        ("utils.ts", "export function helper() {}\n"),
        ("main.ts", "import { helper } from './utils';\nhelper();\n"),
    ])
    .unwrap();

    let helper_id = project
        .get_scope_graph(Path::new("utils.ts"))
        .unwrap()
        .defs_named("helper")
        .next()
        .unwrap()
        .id
        .clone();

    let references = project.find_references(&helper_id);
    assert!(
        references
            .iter()
            .any(|l| l.file == PathBuf::from("main.ts")),
        "call site found from the definition"
    );

    let site = references
        .iter()
        .find(|l| l.file == PathBuf::from("main.ts"))
        .unwrap();
    let defs = project.go_to_definition(&site.file, site.range.start_row, site.range.start_col);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].id, helper_id);
}

// ── Property-based invariants ─────────────────────────────────────────

mod properties {
    use super::*;
    use ariadne_graphs::SymbolKind;
    use proptest::prelude::*;

    /// A chain of uniquely named functions where each calls the previous,
    /// plus a module-level call to the last one.
    fn chain_source(names: &[String]) -> String {
        let mut source = String::new();
        for (i, name) in names.iter().enumerate() {
            if i == 0 {
                source.push_str(&format!("function fn_{name}() {{}}\n"));
            } else {
                let prev = &names[i - 1];
                source.push_str(&format!("function fn_{name}() {{ fn_{prev}(); }}\n"));
            }
        }
        if let Some(last) = names.last() {
            source.push_str(&format!("fn_{last}();\n"));
        }
        source
    }

    proptest! {
        #[test]
        fn every_reference_sits_inside_its_scope(
            names in proptest::collection::btree_set("[a-z]{4,10}", 1..8)
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let source = chain_source(&names);
            let project = build_project(&[("gen.ts", &source)]).unwrap();
            let graph = project.get_scope_graph(Path::new("gen.ts")).unwrap();

            for reference in &graph.references {
                let scope = graph.scope(reference.scope);
                prop_assert!(
                    scope.range.contains(&reference.range),
                    "scope {:?} must contain reference {} at {:?}",
                    scope.id, reference.name, reference.range
                );
            }
        }

        #[test]
        fn call_targets_are_always_callable(
            names in proptest::collection::btree_set("[a-z]{4,10}", 1..8)
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let source = chain_source(&names);
            let project = build_project(&[("gen.ts", &source)]).unwrap();
            let cg = project.get_call_graph(None).unwrap();

            for node in cg.nodes.values() {
                for call in &node.calls {
                    for target in &call.resolved_to {
                        let target_node = cg.nodes.get(target);
                        prop_assert!(target_node.is_some());
                        let kind = target_node.unwrap().definition.kind;
                        prop_assert!(
                            matches!(
                                kind,
                                SymbolKind::Function
                                    | SymbolKind::Method
                                    | SymbolKind::Constructor
                                    | SymbolKind::Module
                            ),
                            "call target {target} has non-callable kind {kind:?}"
                        );
                    }
                }
            }
        }

        #[test]
        fn serialization_is_deterministic_for_generated_projects(
            names in proptest::collection::btree_set("[a-z]{4,10}", 1..6)
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let source = chain_source(&names);
            let first = build_project(&[("gen.ts", &source)]).unwrap();
            let second = build_project(&[("gen.ts", &source)]).unwrap();
            prop_assert_eq!(
                call_graph_json(&first).unwrap(),
                call_graph_json(&second).unwrap()
            );
        }

        #[test]
        fn entry_points_are_ordered_by_file_then_line(
            names in proptest::collection::btree_set("[a-z]{4,10}", 1..6)
        ) {
            let names: Vec<String> = names.into_iter().collect();
            // Every function uncalled: all are entry points
            let source: String = names
                .iter()
                .map(|n| format!("function fn_{n}() {{}}\n"))
                .collect();
            let project = build_project(&[("gen.ts", &source)]).unwrap();
            let cg = project.get_call_graph(None).unwrap();

            let rows: Vec<usize> = cg
                .entry_points
                .iter()
                .map(|id| cg.nodes[id].definition.range.start_row)
                .collect();
            let mut sorted = rows.clone();
            sorted.sort_unstable();
            prop_assert_eq!(rows, sorted);
        }
    }
}
