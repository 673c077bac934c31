pub mod ecma_scope;
mod helpers;
pub mod javascript;
pub mod python;
pub mod rust;
pub mod typescript;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::Result;
use crate::scope_graph::ScopeGraph;

pub use helpers::ScopeGraphBuilder;

/// Trait implemented by each language's indexing support.
pub trait LanguageSupport: Send + Sync + std::fmt::Debug {
    /// Language identifier (e.g., "typescript", "python").
    fn id(&self) -> &'static str;

    /// File extensions this language handles.
    fn extensions(&self) -> &'static [&'static str];

    /// Tree-sitter grammar for parsing.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Build the complete scope graph for one file: nested lexical scopes,
    /// definitions (with hoisting flags), references, imports, and the
    /// binding facts consumed by the type tracker.
    ///
    /// Malformed subtrees are skipped; indexing proceeds for the remainder
    /// of the file.
    fn build_scope_graph(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<ScopeGraph>;
}

/// Registry of all supported languages, keyed by id and file extension.
#[derive(Debug)]
pub struct LanguageRegistry {
    languages: HashMap<String, Arc<dyn LanguageSupport>>,
    extension_map: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            languages: HashMap::new(),
            extension_map: HashMap::new(),
        };
        reg.register(Arc::new(typescript::TypeScriptSupport));
        reg.register(Arc::new(javascript::JavaScriptSupport));
        reg.register(Arc::new(python::PythonSupport));
        reg.register(Arc::new(rust::RustSupport));
        reg
    }

    /// The process-wide registry. Read-only after first use; every project
    /// instance shares it.
    pub fn global() -> &'static LanguageRegistry {
        static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();
        REGISTRY.get_or_init(LanguageRegistry::new)
    }

    fn register(&mut self, lang: Arc<dyn LanguageSupport>) {
        for ext in lang.extensions() {
            self.extension_map
                .insert((*ext).to_string(), lang.id().to_string());
        }
        self.languages.insert(lang.id().to_string(), lang);
    }

    /// Look up the language support for a file by its extension.
    pub fn for_file(&self, path: &Path) -> Option<Arc<dyn LanguageSupport>> {
        let ext = path.extension()?.to_str()?;
        let lang_id = self.extension_map.get(ext)?;
        self.languages.get(lang_id).cloned()
    }

    /// Get a language by its identifier.
    pub fn get(&self, id: &str) -> Option<Arc<dyn LanguageSupport>> {
        self.languages.get(id).cloned()
    }

    /// List all registered language IDs.
    pub fn language_ids(&self) -> Vec<&str> {
        self.languages.keys().map(String::as_str).collect()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `source` with the given language, or report why it could not be.
pub fn parse_source(lang: &dyn LanguageSupport, source: &str, path: &Path) -> Result<tree_sitter::Tree> {
    parse_with_old_tree(lang, source, path, None)
}

/// Parse, optionally reusing an edited old tree for incremental re-parsing.
pub fn parse_with_old_tree(
    lang: &dyn LanguageSupport,
    source: &str,
    path: &Path,
    old_tree: Option<&tree_sitter::Tree>,
) -> Result<tree_sitter::Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&lang.tree_sitter_language())
        .map_err(|e| crate::GraphError::TreeSitter(e.to_string()))?;
    parser
        .parse(source, old_tree)
        .ok_or_else(|| crate::GraphError::Parse {
            path: path.display().to_string(),
            message: "tree-sitter returned no tree".to_string(),
        })
}
