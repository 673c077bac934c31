use std::path::Path;

use crate::Result;
use crate::scope_graph::ScopeGraph;

use super::LanguageSupport;
use super::ecma_scope::{EcmaCtx, walk_scope};
use super::helpers::ScopeGraphBuilder;

#[derive(Debug)]
pub struct TypeScriptSupport;

impl LanguageSupport for TypeScriptSupport {
    fn id(&self) -> &'static str {
        "typescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    }

    fn build_scope_graph(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<ScopeGraph> {
        let ctx = EcmaCtx {
            source,
            is_test_file: is_test_path(path),
        };
        let mut builder =
            ScopeGraphBuilder::new(path, self.id(), tree.root_node().range().into());
        let root = builder.root();
        walk_scope(&mut builder, &ctx, tree.root_node(), root, true);
        Ok(builder.build())
    }
}

pub(crate) fn is_test_path(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.contains(".test.") || name.contains(".spec.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SymbolKind;
    use crate::scope_graph::{ImportKind, NameLookup, RefKind, ScopeId};

    fn parse_ts(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    fn build(source: &str) -> ScopeGraph {
        let tree = parse_ts(source);
        TypeScriptSupport
            .build_scope_graph(&tree, source, Path::new("test.ts"))
            .unwrap()
    }

    fn def_names(graph: &ScopeGraph, kind: SymbolKind) -> Vec<&str> {
        graph
            .definitions
            .iter()
            .filter(|d| d.kind == kind)
            .map(|d| d.name.as_str())
            .collect()
    }

    #[test]
    fn function_and_class_definitions() {
        let sg = build("function greet(name: string): void {}\nclass Greeter { greet() {} }\n");
        assert_eq!(def_names(&sg, SymbolKind::Function), vec!["greet"]);
        assert_eq!(def_names(&sg, SymbolKind::Class), vec!["Greeter"]);
        assert_eq!(def_names(&sg, SymbolKind::Method), vec!["greet"]);
        assert!(
            def_names(&sg, SymbolKind::Parameter).contains(&"name"),
            "param should be defined in the function scope"
        );
    }

    #[test]
    fn functions_are_hoisted_variables_are_not() {
        let sg = build("const x = 1;\nfunction f() {}\n");
        let f = sg.defs_named("f").next().unwrap();
        let x = sg.defs_named("x").next().unwrap();
        assert!(f.hoisted);
        assert!(!x.hoisted);
        assert_eq!(x.kind, SymbolKind::Constant);
    }

    #[test]
    fn class_without_constructor_gets_synthesized_one() {
        let sg = build("class User { greet() { return \"hi\"; } }\n");
        let ctor: Vec<_> = sg
            .definitions
            .iter()
            .filter(|d| d.kind == SymbolKind::Constructor)
            .collect();
        assert_eq!(ctor.len(), 1);
        assert_eq!(ctor[0].container.as_deref(), Some("User"));
    }

    #[test]
    fn explicit_constructor_is_not_duplicated() {
        let sg = build("class User { constructor(name: string) {} }\n");
        let ctors: Vec<_> = sg
            .definitions
            .iter()
            .filter(|d| d.kind == SymbolKind::Constructor)
            .collect();
        assert_eq!(ctors.len(), 1);
    }

    #[test]
    fn named_import_with_alias() {
        let sg = build("import { foo, bar as baz } from './module';\n");
        assert_eq!(sg.imports.len(), 2);
        let foo = &sg.imports[0];
        assert_eq!(foo.local_name, "foo");
        assert_eq!(foo.source_name, None);
        assert_eq!(foo.module_path, "./module");
        let baz = &sg.imports[1];
        assert_eq!(baz.local_name, "baz");
        assert_eq!(baz.source_name.as_deref(), Some("bar"));
        assert_eq!(baz.kind, ImportKind::Named);
    }

    #[test]
    fn default_and_namespace_imports() {
        let sg = build("import React from 'react';\nimport * as utils from './utils';\n");
        assert_eq!(sg.imports[0].kind, ImportKind::Default);
        assert_eq!(sg.imports[0].local_name, "React");
        assert_eq!(sg.imports[1].kind, ImportKind::Namespace);
        assert_eq!(sg.imports[1].local_name, "utils");
    }

    #[test]
    fn export_function_is_flagged() {
        let sg = build("export function compute(): number { return 0; }\n");
        let compute = sg.defs_named("compute").next().unwrap();
        assert!(compute.exported);
        assert_eq!(compute.return_type.as_deref(), Some("number"));
    }

    #[test]
    fn aliased_reexport_is_import_plus_export() {
        let sg = build("export { foo as bar } from './m';\n");
        let re = &sg.imports[0];
        assert_eq!(re.kind, ImportKind::ReExport);
        assert_eq!(re.local_name, "bar");
        assert_eq!(re.source_name.as_deref(), Some("foo"));
    }

    #[test]
    fn wildcard_reexport() {
        let sg = build("export * from './barrel';\n");
        let re = sg.re_exports().next().unwrap();
        assert_eq!(re.local_name, "*");
        assert_eq!(re.module_path, "./barrel");
    }

    #[test]
    fn local_alias_export() {
        let sg = build("function helper() {}\nexport { helper as assist };\n");
        assert_eq!(sg.export_aliases.len(), 1);
        assert_eq!(sg.export_aliases[0].exported, "assist");
        assert_eq!(sg.export_aliases[0].local, "helper");
        assert_eq!(sg.exported_defs("assist").len(), 1);
    }

    #[test]
    fn call_and_method_call_references() {
        let sg = build("function foo() {}\nfoo();\nconst u = new User();\nu.greet();\n");
        let call = sg.references.iter().find(|r| r.name == "foo").unwrap();
        assert_eq!(call.kind, RefKind::Call);
        let ctor = sg.references.iter().find(|r| r.name == "User").unwrap();
        assert_eq!(ctor.kind, RefKind::ConstructorCall);
        let method = sg.references.iter().find(|r| r.name == "greet").unwrap();
        assert_eq!(method.kind, RefKind::MethodCall);
        assert_eq!(method.receiver.as_deref(), Some("u"));
    }

    #[test]
    fn constructor_binding_recorded() {
        let sg = build("const u = new User();\n");
        assert_eq!(sg.bindings.len(), 1);
        assert_eq!(sg.bindings[0].target, "u");
        assert_eq!(
            sg.bindings[0].value,
            crate::scope_graph::BoundValue::Constructed {
                class_name: "User".to_string()
            }
        );
    }

    #[test]
    fn collection_literal_with_spread() {
        let sg = build(
            "const EXTENDED = { ...BASE, extended: extendedHandler };\n",
        );
        let binding = &sg.bindings[0];
        match &binding.value {
            crate::scope_graph::BoundValue::Collection { members, spreads } => {
                assert_eq!(members, &["extendedHandler"]);
                assert_eq!(spreads, &["BASE"]);
            }
            other => panic!("expected collection binding, got {other:?}"),
        }
    }

    #[test]
    fn identifier_argument_is_read_and_value_use() {
        let sg = build("processOperations([\"add\"], HANDLERS);\n");
        let read = sg
            .references
            .iter()
            .find(|r| r.name == "HANDLERS")
            .expect("argument should produce a read reference");
        assert_eq!(read.kind, RefKind::Read);
        assert!(sg.value_uses.iter().any(|v| v.name == "HANDLERS"));
    }

    #[test]
    fn interface_members_are_properties() {
        let sg = build("interface Handler { process(): void; }\n");
        let handler = sg.defs_named("Handler").next().unwrap();
        assert_eq!(handler.kind, SymbolKind::Interface);
        let process = sg.defs_named("process").next().unwrap();
        assert_eq!(process.kind, SymbolKind::Property);
        assert_eq!(process.container.as_deref(), Some("Handler"));
    }

    #[test]
    fn class_heritage_captured() {
        let sg = build("class CsvHandler implements Handler { process() {} }\n");
        let class = sg.defs_named("CsvHandler").next().unwrap();
        assert_eq!(class.superclasses, vec!["Handler"]);
        let process = sg.defs_named("process").next().unwrap();
        assert_eq!(process.kind, SymbolKind::Method);
    }

    #[test]
    fn typed_parameter_records_type() {
        let sg = build("function execute(h: Handler) { h.process(); }\n");
        let h = sg.defs_named("h").next().unwrap();
        assert_eq!(h.type_names, vec!["Handler"]);
        assert!(
            sg.references
                .iter()
                .any(|r| r.name == "Handler" && r.kind == RefKind::Type),
            "type annotation should produce a type reference"
        );
    }

    #[test]
    fn union_parameter_keeps_every_named_arm() {
        let sg = build("function execute(h: CsvHandler | JsonHandler) { h.process(); }\n");
        let h = sg.defs_named("h").next().unwrap();
        assert_eq!(h.type_names, vec!["CsvHandler", "JsonHandler"]);
        let type_refs: Vec<_> = sg
            .references
            .iter()
            .filter(|r| r.kind == RefKind::Type)
            .map(|r| r.name.as_str())
            .collect();
        assert!(type_refs.contains(&"CsvHandler"));
        assert!(type_refs.contains(&"JsonHandler"));
    }

    #[test]
    fn nullable_union_drops_unnamed_arm() {
        let sg = build("function find(id: string): User | null { return null; }\nconst u = find(\"1\");\n");
        let find = sg.defs_named("find").next().unwrap();
        assert_eq!(find.return_type.as_deref(), Some("User"));
    }

    #[test]
    fn arrow_function_binding() {
        let sg = build("const greet = (name: string) => { console.log(name); };\n");
        let greet = sg.defs_named("greet").next().unwrap();
        assert_eq!(greet.kind, SymbolKind::Function);
        assert!(def_names(&sg, SymbolKind::Parameter).contains(&"name"));
    }

    #[test]
    fn local_shadows_import_in_lookup() {
        let sg = build(
            "import { helper } from './utils';\nfunction helper() {}\nhelper();\n",
        );
        let call = sg
            .references
            .iter()
            .find(|r| r.kind == RefKind::Call && r.name == "helper")
            .unwrap();
        match sg.lookup("helper", call.scope, &call.range) {
            NameLookup::Definitions(defs) => {
                assert_eq!(defs[0].kind, SymbolKind::Function);
            }
            other => panic!("local function must shadow the import, got {other:?}"),
        }
    }

    #[test]
    fn return_site_facts() {
        let sg = build("function make(): User { return new User(); }\n");
        assert_eq!(sg.returns.len(), 1);
        assert_eq!(
            sg.returns[0].value,
            crate::scope_graph::ReturnedValue::Constructed {
                class_name: "User".to_string()
            }
        );
        let make = sg.defs_named("make").next().unwrap();
        assert_eq!(make.return_type.as_deref(), Some("User"));
    }

    #[test]
    fn every_file_gets_a_module_definition() {
        let sg = build("const x = 1;\n");
        let module = sg.defs_named("<module>").next().unwrap();
        assert_eq!(module.kind, SymbolKind::Module);
        assert_eq!(module.scope, ScopeId::ROOT);
    }

    #[test]
    fn enum_members_indexed() {
        let sg = build("enum Direction { Up, Down }\n");
        assert_eq!(def_names(&sg, SymbolKind::Enum), vec!["Direction"]);
        let members = def_names(&sg, SymbolKind::EnumMember);
        assert_eq!(members, vec!["Up", "Down"]);
    }

    #[test]
    fn docstring_attached_to_following_definition() {
        let sg = build("/** Adds numbers. */\nfunction add(a: number, b: number) { return a + b; }\n");
        let add = sg.defs_named("add").next().unwrap();
        assert_eq!(add.docstring.as_deref(), Some("Adds numbers."));
    }

    #[test]
    fn test_file_definitions_are_tagged() {
        let source = "function checkThing() {}\n";
        let tree = parse_ts(source);
        let sg = TypeScriptSupport
            .build_scope_graph(&tree, source, Path::new("thing.test.ts"))
            .unwrap();
        assert!(sg.defs_named("checkThing").next().unwrap().is_test);
    }
}
