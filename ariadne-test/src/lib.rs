// Integration test utilities and fixture projects for Ariadne.

use std::path::PathBuf;

use ariadne_core::{Project, SourceFile};

/// Initialize tracing for integration tests (idempotent).
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Build a project from in-memory `(path, content)` sources.
pub fn build_project(files: &[(&str, &str)]) -> anyhow::Result<Project> {
    let mut project = Project::new(std::path::Path::new(""));
    project.add_files(
        files
            .iter()
            .map(|(path, content)| SourceFile {
                path: PathBuf::from(path),
                content: (*content).to_string(),
            })
            .collect(),
    )?;
    Ok(project)
}

/// Canonical call-graph JSON, for byte-equality assertions.
pub fn call_graph_json(project: &Project) -> anyhow::Result<String> {
    Ok(project.get_call_graph(None)?.to_json().to_string())
}

/// A TypeScript service with an interface, three implementations, and a
/// dispatcher — the polymorphic-dispatch fixture.
pub fn handler_suite() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "handlers/handler.ts",
            "export interface Handler {\n  process(): void;\n}\n",
        ),
        (
            "handlers/csv.ts",
            "import { Handler } from './handler';\nexport class CsvHandler implements Handler {\n  process() {}\n}\n",
        ),
        (
            "handlers/json.ts",
            "import { Handler } from './handler';\nexport class JsonHandler implements Handler {\n  process() {}\n}\n",
        ),
        (
            "handlers/xml.ts",
            "import { Handler } from './handler';\nexport class XmlHandler implements Handler {\n  process() {}\n}\n",
        ),
        (
            "main.ts",
            "import { Handler } from './handlers/handler';\nexport function execute(h: Handler) {\n  h.process();\n}\n",
        ),
    ]
}

/// A small multi-language project (TypeScript + Python + Rust).
pub fn multi_language_suite() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "web/api.ts",
            "export function formatResponse(data) {\n  return JSON.stringify(data);\n}\n",
        ),
        (
            "web/index.ts",
            "import { formatResponse } from './api';\nformatResponse({});\n",
        ),
        (
            "scripts/report.py",
            "def build_report(rows):\n    \"\"\"Renders rows into a report.\"\"\"\n    return \"\\n\".join(rows)\n\nif __name__ == \"__main__\":\n    build_report([])\n",
        ),
        (
            "svc/src/lib.rs",
            "pub mod codec;\n\nuse crate::codec::decode;\n\npub fn handle(input: &str) {\n    decode(input);\n}\n",
        ),
        (
            "svc/src/codec.rs",
            "pub fn decode(input: &str) {}\n",
        ),
    ]
}
